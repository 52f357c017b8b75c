//! Multi-train schedules replayed from averaged tractive results.
//!
//! A track carries either one direction ([UnidirectionalSchedule]: trains of one tractive result
//! departing at a fixed interval) or two ([BidirectionalSchedule]: a package of closely spaced
//! trains and flow trains of the opposite direction that wait for it at stations).
//! [build_schedule] groups per-track inputs into a [MultiTrackSchedule].

mod bidirectional;
mod multi_track;
mod route;
pub mod trace_file;
mod unidirectional;

pub use bidirectional::*;
pub use multi_track::*;
pub use route::*;
pub use unidirectional::*;

use crate::imports::*;
use crate::train::Load;

/// Number of routes replayed by a schedule without an explicit train count
pub const MAX_ROUTE_QTY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Instantaneous position and load of one scheduled train
pub struct TrainPosition {
    /// Real track coordinate, km
    pub coordinate: f64,
    pub load: Load,
    pub track_number: u32,
    /// Train mass relative to the mass of the simulated train
    pub mass_rate: f64,
    /// 1-based index of the route on its track
    pub route_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// How often a full-mass train appears among the scheduled trains; the rest run at middle mass
pub enum Interleaving {
    /// Every train
    #[default]
    All,
    /// No train
    None,
    /// Every second train
    Double,
    /// Every third train
    Triple,
    /// Every fourth train
    Fourth,
}

impl Interleaving {
    /// One train in every `period` runs at full mass
    pub fn period(&self) -> Option<usize> {
        match self {
            Self::All => Some(1),
            Self::None => None,
            Self::Double => Some(2),
            Self::Triple => Some(3),
            Self::Fourth => Some(4),
        }
    }

    pub fn is_full_mass(&self, route_index: usize) -> bool {
        self.period().is_some_and(|k| route_index % k == 0)
    }
}

/// Mass of route `route_index` relative to `reference_mass`.
///
/// Full-mass routes run at `largest_mass`, doubled for connected trains; other routes run at
/// `middle_mass`.
pub fn mass_rate(
    interleaving: Interleaving,
    connected: bool,
    largest_mass: si::Mass,
    middle_mass: si::Mass,
    reference_mass: si::Mass,
    route_index: usize,
) -> f64 {
    if interleaving.is_full_mass(route_index) {
        let multiplier = if connected { 2.0 } else { 1.0 };
        multiplier * (largest_mass / reference_mass).get::<si::ratio>()
    } else {
        (middle_mass / reference_mass).get::<si::ratio>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Operating parameters of one direction on one track
pub struct ScheduleParams {
    pub track_number: u32,
    /// Number of trains; 0 replays up to [MAX_ROUTE_QTY] trains
    #[serde(default)]
    pub total_count: usize,
    /// Departure interval between consecutive trains
    pub interval: si::Time,
    #[serde(default)]
    pub interleaving: Interleaving,
    pub largest_mass: si::Mass,
    pub middle_mass: si::Mass,
    /// Full-mass trains run as two coupled trains
    #[serde(default)]
    pub connected: bool,
}

impl ScheduleParams {
    pub fn mass_rate(&self, reference_mass: si::Mass, route_index: usize) -> f64 {
        mass_rate(
            self.interleaving,
            self.connected,
            self.largest_mass,
            self.middle_mass,
            reference_mass,
            route_index,
        )
    }

    /// Highest route index replayed
    pub fn route_cap(&self) -> usize {
        if self.total_count == 0 {
            MAX_ROUTE_QTY
        } else {
            self.total_count
        }
    }
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            track_number: 1,
            total_count: 0,
            interval: 10.0 * uc::MIN,
            interleaving: Default::default(),
            largest_mass: 6000.0 * uc::TON,
            middle_mass: 4000.0 * uc::TON,
            connected: false,
        }
    }
}

impl Init for ScheduleParams {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.interval > si::Time::ZERO) {
            return Err(Error::Validation(format!(
                "interval on track {} must be positive",
                self.track_number
            )));
        }
        if !(self.largest_mass > si::Mass::ZERO && self.middle_mass > si::Mass::ZERO) {
            return Err(Error::Validation(format!(
                "train masses on track {} must be positive",
                self.track_number
            )));
        }
        Ok(())
    }
}
impl SerdeAPI for ScheduleParams {}

impl Valid for ScheduleParams {
    fn valid() -> Self {
        Self {
            total_count: 3,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Safety margins and station layout shared by the bidirectional schedules
pub struct ScheduleConfig {
    /// Time a station stays occupied after a train crosses it
    pub crossing_time: si::Time,
    /// Minimal separation of two trains arriving at one station
    pub non_simultaneous_arrival_time: si::Time,
    /// Coordinates of intermediate stations, km, ascending
    #[serde(default)]
    pub stations: Vec<f64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            crossing_time: uc::MIN,
            non_simultaneous_arrival_time: uc::MIN,
            stations: vec![],
        }
    }
}

impl Init for ScheduleConfig {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.crossing_time >= si::Time::ZERO
            && self.non_simultaneous_arrival_time >= si::Time::ZERO)
        {
            return Err(Error::Validation(
                "crossing and non-simultaneous arrival times must not be negative".into(),
            ));
        }
        if self.stations.iter().any(|s| !s.is_finite()) || !is_sorted(&self.stations) {
            return Err(Error::Validation(format!(
                "station coordinates must be finite and ascending, got {:?}",
                self.stations
            )));
        }
        Ok(())
    }
}
impl SerdeAPI for ScheduleConfig {}
impl Valid for ScheduleConfig {}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use crate::averaging::{AverageElement, TractiveResult};

    /// Result sampled once per `period` with the given coordinates and a 100 A DC load
    pub(crate) fn trace_result(coordinates: &[f64], period: si::Time) -> Arc<TractiveResult> {
        let elements = coordinates
            .iter()
            .map(|&coordinate| AverageElement {
                coordinate,
                speed: 60.0,
                load: Load::Dc { active: 100.0 },
                ..Default::default()
            })
            .collect();
        Arc::new(TractiveResult::new(elements, period, 100.0 * uc::TON).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_rate() {
        let largest = 120.0 * uc::TON;
        let middle = 80.0 * uc::TON;
        let reference = 100.0 * uc::TON;
        let rate = |interleaving, connected, idx| {
            mass_rate(interleaving, connected, largest, middle, reference, idx)
        };
        assert!(almost_eq(rate(Interleaving::All, false, 1), 1.2, None));
        assert!(almost_eq(rate(Interleaving::Double, true, 2), 2.4, None));
        assert!(almost_eq(rate(Interleaving::Double, true, 3), 0.8, None));
        assert!(almost_eq(rate(Interleaving::Triple, false, 6), 1.2, None));
        assert!(almost_eq(rate(Interleaving::Fourth, false, 6), 0.8, None));
        for idx in 1..10 {
            assert!(almost_eq(rate(Interleaving::None, true, idx), 0.8, None));
        }
    }

    #[test]
    fn test_params_validation() {
        let mut params = ScheduleParams {
            interval: si::Time::ZERO,
            ..ScheduleParams::valid()
        };
        assert!(matches!(params.init(), Err(Error::Validation(_))));
        params.interval = uc::MIN;
        assert!(params.init().is_ok());
        assert_eq!(params.route_cap(), 3);
        params.total_count = 0;
        assert_eq!(params.route_cap(), MAX_ROUTE_QTY);
    }

    #[test]
    fn test_config_requires_ascending_stations() {
        let mut config = ScheduleConfig {
            stations: vec![5.0, 2.0],
            ..ScheduleConfig::valid()
        };
        assert!(matches!(config.init(), Err(Error::Validation(_))));
        config.stations.reverse();
        assert!(config.init().is_ok());
    }

    #[test]
    fn test_params_yaml() {
        let yaml = "track_number: 2\ninterval: 300.0\nlargest_mass: 6000000.0\nmiddle_mass: 4000000.0\ninterleaving: Double\n";
        let params = ScheduleParams::from_yaml(yaml, false).unwrap();
        assert_eq!(params.track_number, 2);
        assert_eq!(params.interval, 5.0 * uc::MIN);
        assert_eq!(params.interleaving, Interleaving::Double);
        assert_eq!(params.total_count, 0);
        assert!(!params.connected);
    }
}
