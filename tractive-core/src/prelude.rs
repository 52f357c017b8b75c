//! Convenience re-exports of the types most callers need.

pub use crate::averaging::{AverageElement, TractiveResult};
pub use crate::error::Error;
pub use crate::schedule::trace_file::{read_trace, write_trace, TraceRecord};
pub use crate::schedule::{
    build_schedule, BidirectionalSchedule, Interleaving, MultiTrackSchedule, Route, Schedule,
    ScheduleConfig, ScheduleParams, TrainPosition, UnidirectionalSchedule,
};
pub use crate::track::{
    Profile, ProfileElement, RealVoltage, SpeedLimit, SpeedLimits, Stop, TractionRate,
    TractionRates, VoltagePoint,
};
pub use crate::traits::{Init, SerdeAPI, Valid};
pub use crate::train::{
    compute_tractive_result, run_tractive_sims, simulate_traction, CurrentType, Element, Load,
    Locomotive, Position, Regime, ThermalCharacteristic, TrackType, TractionInputs,
    TractionPoint, TractivePositions, TractiveSim, Train,
};
