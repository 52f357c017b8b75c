use crate::imports::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Scheduled stop at a station
pub struct Stop {
    /// Real coordinate of the stop, km
    pub coordinate: f64,
    /// Standing time
    pub duration: si::Time,
}

impl Stop {
    pub fn new(coordinate: f64, duration: si::Time) -> Self {
        Self {
            coordinate,
            duration,
        }
    }
}

impl Default for Stop {
    fn default() -> Self {
        Self::new(0.0, 60.0 * uc::S)
    }
}

impl Init for Stop {
    fn init(&mut self) -> Result<(), Error> {
        if !self.coordinate.is_finite() {
            return Err(Error::Validation(format!(
                "stop coordinate must be finite, got {}",
                self.coordinate
            )));
        }
        if self.duration < si::Time::ZERO {
            return Err(Error::Validation(format!(
                "stop at {} km has negative duration",
                self.coordinate
            )));
        }
        Ok(())
    }
}
impl SerdeAPI for Stop {}

/// Standing time for the stop at `coordinate`, zero when no stop matches
pub(crate) fn stop_duration(stops: &[Stop], coordinate: f64) -> si::Time {
    stops
        .iter()
        .find(|s| almost_eq(s.coordinate, coordinate, Some(1e-6)))
        .map(|s| s.duration)
        .unwrap_or(si::Time::ZERO)
}
