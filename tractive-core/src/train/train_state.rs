use super::Regime;
use crate::imports::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Everything the stepping loop carries from one step to the next.  Coordinates are internal,
/// i.e. mirrored for travel toward decreasing real coordinate.
pub struct SimulationState {
    /// Index of the current time step
    pub i: usize,
    /// km
    pub coordinate: f64,
    /// km/h
    pub speed: f64,
    /// Regime of the previous step
    pub regime: Regime,
    /// Continuous throttle position carried into the next search
    pub throttle: f64,
    /// Selected notch for notched locomotives
    pub notch: usize,
    /// Speed-limit section containing `coordinate`
    pub limit_idx: usize,
    /// Profile element containing `coordinate`
    pub profile_idx: usize,
    /// Traction-rate section containing `coordinate`
    pub rate_idx: usize,
    /// Braking started by overspeed, held until speed falls back into the band
    pub brake_held: bool,
}

impl SimulationState {
    pub fn new(coordinate: f64, speed: f64, throttle: f64, notch: usize) -> Self {
        Self {
            coordinate,
            speed,
            throttle,
            notch,
            ..Self::default()
        }
    }
}

/// Margin above the speed limit that forces braking, km/h
pub const OVERSPEED_MARGIN: f64 = 0.6;
/// Distance between the upper band bound and the speed limit, km/h
pub const BAND_CLEARANCE: f64 = 0.5;

/// Regulation band `(vt, vc)`: traction is applied below `vt` and cut off above `vc`.
///
/// # Arguments
/// - `limit`: speed limit in force, km/h
/// - `grade`: reduced grade, N/kN; steep descents lower the band
/// - `speed_zone`: band width, km/h
pub fn band(limit: f64, grade: f64, speed_zone: f64) -> (f64, f64) {
    let vc = limit - BAND_CLEARANCE - speed_zone.min(0.25 * (-grade).max(0.0));
    let vt = (vc - speed_zone).max(0.0);
    (vt, vc)
}
