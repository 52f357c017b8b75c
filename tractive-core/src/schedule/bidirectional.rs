use super::*;
use crate::averaging::{AverageElement, TractiveResult};
use crate::imports::*;

/// Distance within which a sample counts as being at the searched coordinate, km
const ARRIVAL_TOLERANCE: f64 = 1e-3;

#[ext(ArrivalTime)]
pub impl [AverageElement] {
    /// Whether coordinates grow along the trace, judged from the first two samples
    fn is_ascending(&self) -> bool {
        match self {
            [first, second, ..] if second.coordinate != first.coordinate => {
                second.coordinate > first.coordinate
            }
            [first, .., last] => last.coordinate >= first.coordinate,
            _ => true,
        }
    }

    /// Time at which a monotone trace reaches `coordinate`, `None` if it never does.
    ///
    /// # Arguments
    /// - `coordinate`: km
    /// - `period`: time between samples
    /// - `start`: departure time of the trace
    ///
    /// Returns `start + idx * period` for a sample within [ARRIVAL_TOLERANCE] of `coordinate`,
    /// otherwise the midpoint of the bracketing pair of samples.
    fn arrival_time(&self, coordinate: f64, period: si::Time, start: si::Time) -> Option<si::Time> {
        let (first, last) = (self.first()?.coordinate, self.last()?.coordinate);
        let ascending = self.is_ascending();
        let (low, high) = if ascending { (first, last) } else { (last, first) };
        if coordinate < low - ARRIVAL_TOLERANCE || coordinate > high + ARRIVAL_TOLERANCE {
            return None;
        }
        let reached = |c: f64| {
            if ascending {
                c >= coordinate - ARRIVAL_TOLERANCE
            } else {
                c <= coordinate + ARRIVAL_TOLERANCE
            }
        };
        if reached(first) {
            return Some(start);
        }
        // `lo` has not reached the coordinate, `hi` has
        let (mut lo, mut hi) = (0, self.len() - 1);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if reached(self[mid].coordinate) {
                hi = mid;
            } else {
                lo = mid;
            }
        }
        let idx = if (self[hi].coordinate - coordinate).abs() <= ARRIVAL_TOLERANCE {
            hi as f64
        } else {
            (lo + hi) as f64 / 2.0
        };
        Some(start + period * idx)
    }
}

/// Longest time between consecutive passing times, counting departure and arrival at the ends
fn longest_segment(passing: &[si::Time], duration: si::Time) -> si::Time {
    let mut times = vec![si::Time::ZERO];
    times.extend_from_slice(passing);
    times.push(duration);
    times
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(si::Time::ZERO, |a, b| if b > a { b } else { a })
}

#[derive(Debug, Clone, PartialEq)]
/// Package of closely spaced trains in one direction and flow trains in the other.
///
/// The package departs once the flow has had time to cross the whole line.  For every
/// intermediate station one flow train is timed to reach the station just before the first
/// package train and to wait there until the package has passed.  A final flow train follows
/// the last package train.
pub struct BidirectionalSchedule {
    package_params: ScheduleParams,
    flow_params: ScheduleParams,
    package: Arc<TractiveResult>,
    flow: Arc<TractiveResult>,
    config: ScheduleConfig,
    routes: Vec<Route>,
    boundary: (si::Time, si::Time),
}

impl BidirectionalSchedule {
    pub fn new(
        package_params: ScheduleParams,
        package: Arc<TractiveResult>,
        flow_params: ScheduleParams,
        flow: Arc<TractiveResult>,
        config: ScheduleConfig,
    ) -> anyhow::Result<Self> {
        let mut schedule = Self {
            package_params,
            flow_params,
            package,
            flow,
            config,
            routes: vec![],
            boundary: (si::Time::ZERO, si::Time::ZERO),
        };
        schedule.build()?;
        Ok(schedule)
    }

    pub fn track_number(&self) -> u32 {
        self.package_params.track_number
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn package_params(&self) -> &ScheduleParams {
        &self.package_params
    }

    pub fn flow_params(&self) -> &ScheduleParams {
        &self.flow_params
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    pub fn boundary(&self) -> (si::Time, si::Time) {
        self.boundary
    }

    /// Averaging period shared by both directions
    pub fn averaging_period(&self) -> si::Time {
        self.package.averaging_period
    }

    pub fn at(&self, time: si::Time) -> Vec<TrainPosition> {
        self.routes
            .iter()
            .filter_map(|r| r.position_at(time))
            .collect()
    }

    /// Replaces the parameters and rebuilds every route
    pub fn update(
        &mut self,
        package_params: ScheduleParams,
        flow_params: ScheduleParams,
        config: ScheduleConfig,
    ) -> anyhow::Result<()> {
        *self = Self::new(
            package_params,
            self.package.clone(),
            flow_params,
            self.flow.clone(),
            config,
        )?;
        Ok(())
    }

    fn build(&mut self) -> anyhow::Result<()> {
        self.package_params.init()?;
        self.flow_params.init()?;
        self.config.init()?;
        ensure!(
            !self.package.is_empty() && !self.flow.is_empty(),
            Error::Validation(format!(
                "tractive results of track {} must not be empty",
                self.track_number()
            ))
        );
        ensure!(
            self.package.averaging_period == self.flow.averaging_period,
            Error::DataConsistency(format!(
                "package and flow of track {} have different averaging periods",
                self.track_number()
            ))
        );
        ensure!(
            self.package_params.track_number == self.flow_params.track_number,
            Error::Validation(format!(
                "package on track {} paired with flow on track {}",
                self.package_params.track_number, self.flow_params.track_number
            ))
        );
        ensure!(
            self.package_params.total_count > 0,
            Error::Validation(format!(
                "package on track {} needs an explicit train count",
                self.track_number()
            ))
        );

        let track = self.track_number();
        let period = self.package.averaging_period;
        let nsat = self.config.non_simultaneous_arrival_time;
        let crossing = self.config.crossing_time;
        let count = self.package_params.total_count;
        let interval = self.package_params.interval;
        let bandwidth = interval * (count - 1) as f64;
        let first_start = self.flow.duration() + nsat;
        let last_start = first_start + bandwidth;

        let mut routes = Vec::with_capacity(count + self.config.stations.len() + 1);
        for route_index in 1..=count {
            routes.push(Route::new(
                self.package.clone(),
                first_start + interval * (route_index - 1) as f64,
                None,
                track,
                self.package_params
                    .mass_rate(self.package.reference_mass, route_index),
                route_index,
            )?);
        }

        let mut stations = self.config.stations.clone();
        if !self.package.elements.is_ascending() {
            stations.reverse();
        }
        let mut package_passing = vec![];
        let mut flow_passing = vec![];
        let mut flow_index = 0;
        for station in stations {
            // the flow baseline departs at zero and is only used to measure transit times
            let (Some(t_package), Some(t_flow)) = (
                self.package
                    .elements
                    .arrival_time(station, period, si::Time::ZERO),
                self.flow
                    .elements
                    .arrival_time(station, period, si::Time::ZERO),
            ) else {
                #[cfg(feature = "logging")]
                log::debug!(
                    "station at {} km is not crossed by both directions of track {}",
                    station.format_eng(Some(6)),
                    track
                );
                continue;
            };
            package_passing.push(t_package);
            flow_passing.push(t_flow);

            let arrival = first_start + t_package;
            let wait = WaitWindow {
                start: arrival - nsat,
                end: arrival + bandwidth + crossing,
                coordinate: station,
            };
            flow_index += 1;
            routes.push(Route::new(
                self.flow.clone(),
                wait.start - t_flow,
                Some(wait),
                track,
                self.flow_params
                    .mass_rate(self.flow.reference_mass, flow_index),
                count + flow_index,
            )?);
        }
        flow_index += 1;
        routes.push(Route::new(
            self.flow.clone(),
            last_start + self.package.duration() + crossing,
            None,
            track,
            self.flow_params
                .mass_rate(self.flow.reference_mass, flow_index),
            count + flow_index,
        )?);

        flow_passing.sort_by(|a, b| a.value.total_cmp(&b.value));
        let package_segment = longest_segment(&package_passing, self.package.duration());
        let flow_segment = longest_segment(&flow_passing, self.flow.duration());
        self.boundary = (
            first_start - flow_segment - crossing - nsat,
            last_start + self.package.duration() + package_segment + crossing + nsat,
        );
        #[cfg(feature = "logging")]
        log::debug!(
            "track {}: {} package and {} flow routes over [{} s, {} s]",
            track,
            count,
            flow_index,
            self.boundary.0.get::<si::second>().format_eng(Some(6)),
            self.boundary.1.get::<si::second>().format_eng(Some(6))
        );
        self.routes = routes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_utils::trace_result;

    fn schedule() -> BidirectionalSchedule {
        let up: Vec<f64> = (0..=20).map(|k| k as f64).collect();
        let down: Vec<f64> = up.iter().rev().copied().collect();
        BidirectionalSchedule::new(
            ScheduleParams {
                total_count: 2,
                interval: 300.0 * uc::S,
                ..ScheduleParams::valid()
            },
            trace_result(&up, uc::MIN),
            ScheduleParams::valid(),
            trace_result(&down, uc::MIN),
            ScheduleConfig {
                crossing_time: 120.0 * uc::S,
                non_simultaneous_arrival_time: 60.0 * uc::S,
                stations: vec![5.0, 15.0, 40.0],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_arrival_time() {
        let result = trace_result(&[0.0, 10.0, 20.0, 30.0], uc::S);
        let start = 100.0 * uc::S;
        let elements = &result.elements;
        assert!(elements.is_ascending());
        assert_eq!(
            elements.arrival_time(25.0, uc::S, start),
            Some(102.5 * uc::S)
        );
        assert_eq!(elements.arrival_time(20.0, uc::S, start), Some(102.0 * uc::S));
        assert_eq!(elements.arrival_time(0.0, uc::S, start), Some(start));
        assert_eq!(elements.arrival_time(31.0, uc::S, start), None);

        let result = trace_result(&[30.0, 20.0, 10.0, 0.0], uc::S);
        assert!(!result.elements.is_ascending());
        assert_eq!(
            result.elements.arrival_time(15.0, uc::S, si::Time::ZERO),
            Some(1.5 * uc::S)
        );
        assert_eq!(
            result.elements.arrival_time(-5.0, uc::S, si::Time::ZERO),
            None
        );
    }

    #[test]
    fn test_arrival_at_stop_is_first_sample() {
        let result = trace_result(&[0.0, 5.0, 5.0, 5.0, 9.0], uc::S);
        assert_eq!(
            result.elements.arrival_time(5.0, uc::S, si::Time::ZERO),
            Some(uc::S)
        );
    }

    #[test]
    fn test_routes() {
        let schedule = schedule();
        let starts: Vec<f64> = schedule
            .routes()
            .iter()
            .map(|r| r.start_time.get::<si::second>())
            .collect();
        // two package trains, flow trains for stations 5 km and 15 km, the final flow train
        assert_eq!(starts, vec![1320.0, 1620.0, 660.0, 1860.0, 3000.0]);
        let indices: Vec<usize> = schedule.routes().iter().map(|r| r.route_index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);

        let wait = schedule.routes()[2].wait.unwrap();
        assert_eq!(wait.start, 1560.0 * uc::S);
        assert_eq!(wait.end, 2040.0 * uc::S);
        assert_eq!(wait.coordinate, 5.0);
        let wait = schedule.routes()[3].wait.unwrap();
        assert_eq!(wait.start, 2160.0 * uc::S);
        assert_eq!(wait.end, 2640.0 * uc::S);
        assert!(schedule.routes()[4].wait.is_none());

        assert_eq!(schedule.boundary(), (540.0 * uc::S, 3660.0 * uc::S));
    }

    #[test]
    fn test_positions() {
        let schedule = schedule();
        let positions = schedule.at(1700.0 * uc::S);
        let summary: Vec<(usize, f64, f64)> = positions
            .iter()
            .map(|p| (p.route_index, p.coordinate, p.load.active()))
            .collect();
        assert_eq!(
            summary,
            vec![(1, 6.0, 100.0), (2, 1.0, 100.0), (3, 5.0, 0.0)]
        );
        // after the package has passed, the flow train resumes from the station
        let positions = schedule.at(2100.0 * uc::S);
        let flow = positions.iter().find(|p| p.route_index == 3).unwrap();
        assert_eq!(flow.coordinate, 4.0);
        assert_eq!(flow.load.active(), 100.0);
    }

    #[test]
    fn test_validation() {
        let up = trace_result(&[0.0, 1.0], uc::MIN);
        let down = trace_result(&[1.0, 0.0], uc::S);
        let err = BidirectionalSchedule::new(
            ScheduleParams::valid(),
            up.clone(),
            ScheduleParams::valid(),
            down,
            ScheduleConfig::valid(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DataConsistency(_))
        ));

        let down = trace_result(&[1.0, 0.0], uc::MIN);
        let err = BidirectionalSchedule::new(
            ScheduleParams {
                total_count: 0,
                ..ScheduleParams::valid()
            },
            up,
            ScheduleParams::valid(),
            down,
            ScheduleConfig::valid(),
        )
        .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
    }

    #[test]
    fn test_update_rebuilds_routes() {
        let mut schedule = schedule();
        let config = ScheduleConfig {
            stations: vec![5.0],
            ..schedule.config().clone()
        };
        schedule
            .update(
                ScheduleParams {
                    total_count: 3,
                    ..schedule.package_params().clone()
                },
                schedule.flow_params().clone(),
                config,
            )
            .unwrap();
        assert_eq!(schedule.routes().len(), 5);
        assert_eq!(schedule.routes()[4].route_index, 5);
        assert!(schedule.routes()[4].wait.is_none());
    }
}
