use super::*;
use crate::averaging::TractiveResult;
use crate::imports::*;

#[derive(Debug, Clone, PartialEq)]
/// Schedule of one track
pub enum Schedule {
    Unidirectional(UnidirectionalSchedule),
    Bidirectional(BidirectionalSchedule),
}

impl Schedule {
    pub fn track_number(&self) -> u32 {
        match self {
            Self::Unidirectional(s) => s.track_number(),
            Self::Bidirectional(s) => s.track_number(),
        }
    }

    pub fn at(&self, time: si::Time) -> Vec<TrainPosition> {
        match self {
            Self::Unidirectional(s) => s.at(time),
            Self::Bidirectional(s) => s.at(time),
        }
    }

    pub fn boundary(&self) -> (si::Time, si::Time) {
        match self {
            Self::Unidirectional(s) => s.boundary(),
            Self::Bidirectional(s) => s.boundary(),
        }
    }

    pub fn averaging_period(&self) -> si::Time {
        match self {
            Self::Unidirectional(s) => s.result().averaging_period,
            Self::Bidirectional(s) => s.averaging_period(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Schedules of every track, queried together
pub struct MultiTrackSchedule {
    schedules: BTreeMap<u32, Schedule>,
    averaging_period: si::Time,
    boundary: (si::Time, si::Time),
}

impl MultiTrackSchedule {
    /// # Arguments
    /// - `schedules`: one schedule per track
    /// - `t_left`, `t_right`: explicit computation bounds replacing the union of the
    ///   schedules' bounds
    pub fn new(
        schedules: Vec<Schedule>,
        t_left: Option<si::Time>,
        t_right: Option<si::Time>,
    ) -> anyhow::Result<Self> {
        let averaging_period = schedules
            .first()
            .map(|s| s.averaging_period())
            .ok_or_else(|| Error::Validation("at least one track schedule is required".into()))?;
        let mut by_track = BTreeMap::new();
        for schedule in schedules {
            ensure!(
                schedule.averaging_period() == averaging_period,
                Error::DataConsistency(format!(
                    "track {} is averaged over {} s instead of {} s",
                    schedule.track_number(),
                    schedule.averaging_period().get::<si::second>(),
                    averaging_period.get::<si::second>()
                ))
            );
            let track = schedule.track_number();
            ensure!(
                by_track.insert(track, schedule).is_none(),
                Error::Validation(format!("track {track} is scheduled twice"))
            );
        }
        let (mut left, mut right) = (si::Time::ZERO, si::Time::ZERO);
        for (i, (l, r)) in by_track.values().map(|s| s.boundary()).enumerate() {
            if i == 0 || l < left {
                left = l;
            }
            if i == 0 || r > right {
                right = r;
            }
        }
        let boundary = (t_left.unwrap_or(left), t_right.unwrap_or(right));
        ensure!(
            boundary.0 <= boundary.1,
            Error::Validation(format!(
                "computation bounds [{} s, {} s] are reversed",
                boundary.0.get::<si::second>(),
                boundary.1.get::<si::second>()
            ))
        );
        Ok(Self {
            schedules: by_track,
            averaging_period,
            boundary,
        })
    }

    /// Positions of every train of every track at `time`
    pub fn at(&self, time: si::Time) -> Vec<TrainPosition> {
        self.schedules.values().flat_map(|s| s.at(time)).collect()
    }

    /// `(t_left, t_right)` over which the combined schedule is meaningful
    pub fn boundary(&self) -> (si::Time, si::Time) {
        self.boundary
    }

    pub fn averaging_period(&self) -> si::Time {
        self.averaging_period
    }

    pub fn schedules(&self) -> &BTreeMap<u32, Schedule> {
        &self.schedules
    }

    pub fn schedule(&self, track_number: u32) -> Option<&Schedule> {
        self.schedules.get(&track_number)
    }
}

/// Builds the schedules of every track.
///
/// `params[i]` describes the direction simulated in `results[i]`.  A track with one entry gets a
/// [UnidirectionalSchedule]; a track with two gets a [BidirectionalSchedule] whose first entry is
/// the package and whose second is the flow.
///
/// # Arguments
/// - `interval`: overrides the interval of every entry of `params`
/// - `t_left`, `t_right`: explicit computation bounds
pub fn build_schedule(
    params: &[ScheduleParams],
    results: &[Arc<TractiveResult>],
    config: &ScheduleConfig,
    interval: Option<si::Time>,
    t_left: Option<si::Time>,
    t_right: Option<si::Time>,
) -> anyhow::Result<MultiTrackSchedule> {
    ensure!(
        !params.is_empty(),
        Error::Validation("no schedule parameters given".into())
    );
    ensure!(
        params.len() == results.len(),
        Error::Validation(format!(
            "{} schedule parameter sets for {} tractive results",
            params.len(),
            results.len()
        ))
    );
    let period = results[0].averaging_period;
    ensure!(
        results.iter().all(|r| r.averaging_period == period),
        Error::DataConsistency("tractive results have different averaging periods".into())
    );

    let mut by_track: BTreeMap<u32, Vec<(ScheduleParams, Arc<TractiveResult>)>> = BTreeMap::new();
    for (p, r) in params.iter().zip(results) {
        let mut p = p.clone();
        if let Some(interval) = interval {
            p.interval = interval;
        }
        by_track
            .entry(p.track_number)
            .or_default()
            .push((p, r.clone()));
    }

    let mut schedules = Vec::with_capacity(by_track.len());
    for (track, directions) in by_track {
        let schedule = match <[_; 1]>::try_from(directions) {
            Ok([(p, r)]) => Schedule::Unidirectional(
                UnidirectionalSchedule::new(p, r).with_context(|| format_dbg!(track))?,
            ),
            Err(directions) => match <[_; 2]>::try_from(directions) {
                Ok([(package_params, package), (flow_params, flow)]) => {
                    Schedule::Bidirectional(
                        BidirectionalSchedule::new(
                            package_params,
                            package,
                            flow_params,
                            flow,
                            config.clone(),
                        )
                        .with_context(|| format_dbg!(track))?,
                    )
                }
                Err(directions) => bail!(Error::Validation(format!(
                    "more than two directions on track {track}: {}",
                    directions.len()
                ))),
            },
        };
        schedules.push(schedule);
    }
    #[cfg(feature = "logging")]
    log::info!("built schedules for {} tracks", schedules.len());
    MultiTrackSchedule::new(schedules, t_left, t_right)
}
