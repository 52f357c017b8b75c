use super::TrainPosition;
use crate::averaging::TractiveResult;
use crate::imports::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Interval during which a route stands at a station
pub struct WaitWindow {
    pub start: si::Time,
    pub end: si::Time,
    /// Station coordinate, km
    pub coordinate: f64,
}

impl WaitWindow {
    pub fn length(&self) -> si::Time {
        self.end - self.start
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Timeline of one scheduled train replaying a shared tractive result
pub struct Route {
    pub result: Arc<TractiveResult>,
    /// Absolute departure time
    pub start_time: si::Time,
    pub wait: Option<WaitWindow>,
    pub track_number: u32,
    pub mass_rate: f64,
    pub route_index: usize,
}

impl Route {
    pub fn new(
        result: Arc<TractiveResult>,
        start_time: si::Time,
        wait: Option<WaitWindow>,
        track_number: u32,
        mass_rate: f64,
        route_index: usize,
    ) -> anyhow::Result<Self> {
        if let Some(window) = &wait {
            ensure!(
                window.start < start_time + result.duration() && window.end >= window.start,
                "{}\nwait window [{} s, {} s] of route {} does not fit its run",
                format_dbg!(),
                window.start.get::<si::second>().format_eng(Some(6)),
                window.end.get::<si::second>().format_eng(Some(6)),
                route_index
            );
        }
        Ok(Self {
            result,
            start_time,
            wait,
            track_number,
            mass_rate,
            route_index,
        })
    }

    /// Absolute time at which the route leaves the line
    pub fn end_time(&self) -> si::Time {
        self.start_time
            + self.result.duration()
            + self.wait.map_or(si::Time::ZERO, |w| w.length())
    }

    /// Position at absolute time `time`, `None` while the train is not on the line.
    /// A waiting train reports the station coordinate and draws no current.
    pub fn position_at(&self, time: si::Time) -> Option<TrainPosition> {
        let mut elapsed = time - self.start_time;
        if let Some(window) = self.wait {
            if time >= window.start && time < window.end {
                let arrived = self.result.sample_at(window.start - self.start_time)?;
                return Some(self.position(window.coordinate, arrived.load.zeroed()));
            }
            if time >= window.end {
                elapsed -= window.length();
            }
        }
        let sample = self.result.sample_at(elapsed)?;
        Some(self.position(sample.coordinate, sample.load))
    }

    fn position(&self, coordinate: f64, load: crate::train::Load) -> TrainPosition {
        TrainPosition {
            coordinate,
            load,
            track_number: self.track_number,
            mass_rate: self.mass_rate,
            route_index: self.route_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_utils::trace_result;

    #[test]
    fn test_position_without_wait() {
        let result = trace_result(&[0.0, 1.0, 2.0, 3.0], uc::S * 10.0);
        let route = Route::new(result, 100.0 * uc::S, None, 1, 1.0, 1).unwrap();
        assert!(route.position_at(99.0 * uc::S).is_none());
        assert_eq!(route.position_at(100.0 * uc::S).unwrap().coordinate, 0.0);
        assert_eq!(route.position_at(125.0 * uc::S).unwrap().coordinate, 2.0);
        assert!(route.position_at(140.0 * uc::S).is_none());
        assert_eq!(route.end_time(), 140.0 * uc::S);
    }

    #[test]
    fn test_position_with_wait() {
        let result = trace_result(&[0.0, 1.0, 2.0, 3.0], uc::S * 10.0);
        let window = WaitWindow {
            start: 20.0 * uc::S,
            end: 50.0 * uc::S,
            coordinate: 1.5,
        };
        let route = Route::new(result, si::Time::ZERO, Some(window), 2, 0.8, 4).unwrap();
        assert_eq!(route.position_at(15.0 * uc::S).unwrap().coordinate, 1.0);
        let waiting = route.position_at(30.0 * uc::S).unwrap();
        assert_eq!(waiting.coordinate, 1.5);
        assert_eq!(waiting.load.active(), 0.0);
        assert_eq!(waiting.route_index, 4);
        // the run resumes where it stopped
        let resumed = route.position_at(50.0 * uc::S).unwrap();
        assert_eq!(resumed.coordinate, 2.0);
        assert_eq!(resumed.load.active(), 100.0);
        assert!(route.position_at(70.0 * uc::S).is_none());
        assert_eq!(route.end_time(), 70.0 * uc::S);
    }

    #[test]
    fn test_wait_must_fit_run() {
        let result = trace_result(&[0.0, 1.0], uc::S);
        let window = WaitWindow {
            start: 5.0 * uc::S,
            end: 6.0 * uc::S,
            coordinate: 0.5,
        };
        assert!(Route::new(result, si::Time::ZERO, Some(window), 1, 1.0, 1).is_err());
    }
}
