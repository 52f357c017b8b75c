use super::*;
use crate::averaging::TractiveResult;
use crate::imports::*;

#[derive(Debug, Clone, PartialEq)]
/// Trains of one direction departing at a fixed interval.  Route `i` departs at
/// `(i - 1) * interval`.
pub struct UnidirectionalSchedule {
    params: ScheduleParams,
    result: Arc<TractiveResult>,
}

impl UnidirectionalSchedule {
    pub fn new(params: ScheduleParams, result: Arc<TractiveResult>) -> anyhow::Result<Self> {
        let mut schedule = Self { params, result };
        schedule.init()?;
        Ok(schedule)
    }

    pub fn params(&self) -> &ScheduleParams {
        &self.params
    }

    pub fn result(&self) -> &Arc<TractiveResult> {
        &self.result
    }

    pub fn track_number(&self) -> u32 {
        self.params.track_number
    }

    /// Departure time of route `route_index`
    pub fn route_start(&self, route_index: usize) -> si::Time {
        self.params.interval * route_index.saturating_sub(1) as f64
    }

    /// Positions of every train on the line at `time`
    pub fn at(&self, time: si::Time) -> Vec<TrainPosition> {
        if time < si::Time::ZERO {
            return vec![];
        }
        let interval = self.params.interval;
        let cap = self.params.route_cap();
        let duration = self.result.duration();
        let periods = (time / interval).get::<si::ratio>().floor();
        let mut shift = time - interval * periods;
        if shift < si::Time::ZERO {
            shift = si::Time::ZERO;
        }
        // latest route to have departed
        let newest = periods as usize + 1;
        let mut positions = vec![];
        for (j, route_index) in (1..=newest).rev().enumerate() {
            let elapsed = shift + interval * j as f64;
            if elapsed >= duration {
                break;
            }
            if route_index > cap {
                continue;
            }
            if let Some(sample) = self.result.sample_at(elapsed) {
                positions.push(TrainPosition {
                    coordinate: sample.coordinate,
                    load: sample.load,
                    track_number: self.params.track_number,
                    mass_rate: self.params.mass_rate(self.result.reference_mass, route_index),
                    route_index,
                });
            }
        }
        positions
    }

    /// Time span over which trains of this schedule are on the line
    pub fn boundary(&self) -> (si::Time, si::Time) {
        let duration = self.result.duration();
        let end = if self.params.total_count == 0 {
            duration + self.params.interval
        } else {
            self.route_start(self.params.total_count) + duration
        };
        (si::Time::ZERO, end)
    }

    /// Replaces the operating parameters
    pub fn update(&mut self, params: ScheduleParams) -> anyhow::Result<()> {
        *self = Self::new(params, self.result.clone())?;
        Ok(())
    }
}

impl Init for UnidirectionalSchedule {
    fn init(&mut self) -> Result<(), Error> {
        self.params.init()?;
        if self.result.is_empty() {
            return Err(Error::Validation(format!(
                "tractive result of track {} is empty",
                self.params.track_number
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::test_utils::trace_result;

    fn schedule(total_count: usize) -> UnidirectionalSchedule {
        let coordinates: Vec<f64> = (0..25).map(|k| k as f64).collect();
        UnidirectionalSchedule::new(
            ScheduleParams {
                total_count,
                interval: 10.0 * uc::S,
                ..ScheduleParams::valid()
            },
            trace_result(&coordinates, uc::S),
        )
        .unwrap()
    }

    fn indices(positions: &[TrainPosition]) -> Vec<usize> {
        positions.iter().map(|p| p.route_index).collect()
    }

    #[test]
    fn test_routes_on_line() {
        let schedule = schedule(3);
        assert!(schedule.at(-1.0 * uc::S).is_empty());
        assert_eq!(indices(&schedule.at(5.0 * uc::S)), vec![1]);
        assert_eq!(indices(&schedule.at(15.0 * uc::S)), vec![2, 1]);

        let positions = schedule.at(22.0 * uc::S);
        assert_eq!(indices(&positions), vec![3, 2, 1]);
        let coordinates: Vec<f64> = positions.iter().map(|p| p.coordinate).collect();
        assert_eq!(coordinates, vec![2.0, 12.0, 22.0]);

        // route 1 has left the line
        assert_eq!(indices(&schedule.at(25.0 * uc::S)), vec![3, 2]);
        // route 4 exceeds the train count
        assert_eq!(indices(&schedule.at(35.0 * uc::S)), vec![3]);
        assert!(schedule.at(45.0 * uc::S).is_empty());
    }

    #[test]
    fn test_never_more_than_count() {
        let schedule = schedule(3);
        for k in 0..500 {
            let positions = schedule.at(0.1 * k as f64 * uc::S);
            assert!(positions.len() <= 3);
            assert!(positions
                .iter()
                .all(|p| p.route_index >= 1 && p.route_index <= 3));
        }
    }

    #[test]
    fn test_unlimited_count() {
        let schedule = schedule(0);
        assert_eq!(indices(&schedule.at(1000.0 * uc::S)), vec![101, 100, 99]);
        assert_eq!(schedule.boundary(), (si::Time::ZERO, 35.0 * uc::S));
    }

    #[test]
    fn test_boundary_and_update() {
        let mut schedule = schedule(3);
        assert_eq!(schedule.boundary(), (si::Time::ZERO, 45.0 * uc::S));
        schedule
            .update(ScheduleParams {
                total_count: 2,
                interval: 5.0 * uc::S,
                ..schedule.params().clone()
            })
            .unwrap();
        assert_eq!(schedule.boundary(), (si::Time::ZERO, 30.0 * uc::S));
        assert_eq!(indices(&schedule.at(7.0 * uc::S)), vec![2, 1]);
        assert!(schedule
            .update(ScheduleParams {
                interval: si::Time::ZERO,
                ..schedule.params().clone()
            })
            .is_err());
    }
}
