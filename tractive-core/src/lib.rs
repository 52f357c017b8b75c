//! Tractive calculation and train schedule construction for electrified rail sections.
//!
//! The crate has two halves:
//! - [train]: a per-train, time-stepped traction integrator ([train::TractiveSim]) that produces
//!   a step trace of [train::Element]s, reduced by [averaging] into a [averaging::TractiveResult].
//! - [schedule]: replays one or two tractive results over time to build single-direction or
//!   bidirectional (package + flow) timetables, merged into a queryable
//!   [schedule::MultiTrackSchedule].
//!
//! Every entry point is a synchronous, side-effect-free function of its inputs.  Independent
//! runs may be dispatched to worker threads by the caller (see [train::run_tractive_sims]).

#[macro_use]
pub mod macros;

pub mod averaging;
pub mod error;
pub(crate) mod imports;
pub mod lin_search_hint;
pub mod ordered;
pub mod prelude;
pub mod schedule;
pub mod si;
pub mod track;
pub mod traits;
pub mod train;
pub mod uc;
pub mod utils;

pub use error::Error;
