use super::{mirror_sections, section_idx};
use crate::imports::*;
use crate::ordered::OrderedSeq;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Closing breakpoint of a speed-limit section.  `limit` applies from the previous breakpoint up
/// to and including `coordinate`.
pub struct SpeedLimit {
    /// km
    pub coordinate: f64,
    /// km/h
    pub limit: f64,
}

impl SpeedLimit {
    pub fn new(coordinate: f64, limit: f64) -> Self {
        Self { coordinate, limit }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Ordered speed-limit sections.  Limits supplied by the user are strictly positive; the
/// direction-specific lists derived by [SpeedLimits::for_travel] may additionally contain
/// zero-length, zero-limit sections at scheduled stops.
pub struct SpeedLimits {
    limits: OrderedSeq<SpeedLimit>,
}

impl SpeedLimits {
    pub fn new(limits: Vec<SpeedLimit>) -> anyhow::Result<Self> {
        let mut limits = Self {
            limits: OrderedSeq::new(limits)?,
        };
        limits.init()?;
        Ok(limits)
    }

    pub fn limits(&self) -> &[SpeedLimit] {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&SpeedLimit> {
        self.limits.get(idx)
    }

    /// Builds the list seen by a train in internal (direction-normalized) coordinates.
    ///
    /// # Arguments
    /// * `reverse` - travel toward decreasing real coordinate
    /// * `stops` - stop coordinates already in internal coordinates, ascending
    pub fn for_travel(&self, reverse: bool, stops: &[f64]) -> anyhow::Result<Self> {
        let sections: Vec<(f64, f64)> = collapse(&self.limits)
            .iter()
            .map(|l| (l.coordinate, l.limit))
            .collect();
        let sections = if reverse {
            mirror_sections(&sections)
        } else {
            sections
        };
        let mut limits: Vec<SpeedLimit> = sections
            .into_iter()
            .map(|(coordinate, limit)| SpeedLimit::new(coordinate, limit))
            .collect();
        // the last section is open toward the end of the run
        if let Some(last) = limits.last_mut() {
            last.coordinate = f64::INFINITY;
        }
        let mut prev_stop = f64::NEG_INFINITY;
        for &stop in stops {
            ensure!(
                stop >= prev_stop,
                "{}\nstops must be ordered in travel direction",
                format_dbg!()
            );
            if almost_eq(stop, prev_stop, None) {
                continue;
            }
            prev_stop = stop;
            let idx = limits.partition_point(|l| l.coordinate < stop);
            let prior = limits
                .get(idx)
                .map(|l| l.limit)
                .with_context(|| format_dbg!(stop))?;
            limits.insert(idx, SpeedLimit::new(stop, 0.0));
            limits.insert(idx, SpeedLimit::new(stop, prior));
        }
        Ok(Self {
            limits: OrderedSeq::new(limits)?,
        })
    }

    /// Index of the section containing `coordinate`, walking forward from `hint`
    pub fn section_idx(&self, coordinate: f64, hint: usize) -> usize {
        section_idx(&self.limits, coordinate, hint)
    }

    /// Limit in force at `coordinate`, km/h
    pub fn limit_at(&self, coordinate: f64) -> f64 {
        let idx = self.limits.partition_point(|l| l.coordinate < coordinate);
        self.limits
            .get(idx)
            .or_else(|| self.limits.last())
            .map(|l| l.limit)
            .unwrap_or_default()
    }

    /// Index of the first section past the stop at `coordinate`, used to resume after a stop
    pub fn idx_after(&self, coordinate: f64) -> usize {
        self.limits
            .partition_point(|l| l.coordinate <= coordinate)
            .min(self.limits.len().saturating_sub(1))
    }

    /// Upcoming target for the lookahead while in section `idx`.
    ///
    /// Every section end followed by a limit below the current one is a candidate.  The one
    /// returned is the candidate that bounds the speed most tightly anywhere ahead of it for a
    /// train shedding `reach` (km/h)² of squared speed per km of braking.  Those bounds differ by
    /// a constant, so the choice does not depend on where the train is within the section.
    pub fn target(&self, idx: usize, reach: f64) -> Option<SpeedLimit> {
        let current = self.limits.get(idx)?.limit;
        let bound = |t: &SpeedLimit| t.limit * t.limit + reach * t.coordinate;
        self.limits[idx..]
            .windows(2)
            .filter(|w| w[1].limit < current && w[0].coordinate.is_finite())
            .map(|w| SpeedLimit::new(w[0].coordinate, w[1].limit))
            .min_by(|a, b| bound(a).total_cmp(&bound(b)))
    }
}

/// Merges consecutive sections that carry the same limit, keeping the later breakpoint
fn collapse(limits: &[SpeedLimit]) -> Vec<SpeedLimit> {
    let mut collapsed: Vec<SpeedLimit> = Vec::with_capacity(limits.len());
    for limit in limits {
        match collapsed.last_mut() {
            Some(last) if last.limit == limit.limit => last.coordinate = limit.coordinate,
            _ => collapsed.push(*limit),
        }
    }
    collapsed
}

impl Init for SpeedLimits {
    fn init(&mut self) -> Result<(), Error> {
        self.limits.init()?;
        if self.limits.is_empty() {
            return Err(Error::Validation("speed limits must not be empty".into()));
        }
        if let Some(bad) = self
            .limits
            .iter()
            .find(|l| !(l.limit > 0.0 && l.limit.is_finite()))
        {
            return Err(Error::Validation(format!(
                "speed limit at {} km must be positive and finite, got {}",
                bad.coordinate, bad.limit
            )));
        }
        Ok(())
    }
}
impl SerdeAPI for SpeedLimits {}

impl Valid for SpeedLimits {
    fn valid() -> Self {
        Self::new(vec![
            SpeedLimit::new(3.0, 60.0),
            SpeedLimit::new(7.0, 80.0),
            SpeedLimit::new(10.0, 50.0),
        ])
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Squared speed shed per km by a train braking at 36 N/kN, (km/h)²/km
    const REACH: f64 = 8640.0;

    #[test]
    fn test_collapse_duplicates() {
        let limits = SpeedLimits::new(vec![
            SpeedLimit::new(1.0, 60.0),
            SpeedLimit::new(2.0, 60.0),
            SpeedLimit::new(3.0, 80.0),
        ])
        .unwrap();
        let travel = limits.for_travel(false, &[]).unwrap();
        assert_eq!(travel.len(), 2);
        assert_eq!(travel.limits()[0], SpeedLimit::new(2.0, 60.0));
        assert_eq!(travel.limits()[1].coordinate, f64::INFINITY);
    }

    #[test]
    fn test_reverse() {
        let travel = SpeedLimits::valid().for_travel(true, &[]).unwrap();
        assert_eq!(
            travel.limits(),
            &[
                SpeedLimit::new(-7.0, 50.0),
                SpeedLimit::new(-3.0, 80.0),
                SpeedLimit::new(f64::INFINITY, 60.0),
            ]
        );
        assert_eq!(travel.limit_at(-8.0), 50.0);
        assert_eq!(travel.limit_at(-2.0), 60.0);
    }

    #[test]
    fn test_stop_injection() {
        let travel = SpeedLimits::valid().for_travel(false, &[5.0]).unwrap();
        assert_eq!(
            &travel.limits()[..4],
            &[
                SpeedLimit::new(3.0, 60.0),
                SpeedLimit::new(5.0, 80.0),
                SpeedLimit::new(5.0, 0.0),
                SpeedLimit::new(7.0, 80.0),
            ]
        );
        let idx = travel.section_idx(4.0, 0);
        assert_eq!(idx, 1);
        assert_eq!(travel.target(idx, REACH), Some(SpeedLimit::new(5.0, 0.0)));
        assert_eq!(travel.idx_after(5.0), 3);
    }

    #[test]
    fn test_target_only_for_lower_limit() {
        let travel = SpeedLimits::valid().for_travel(false, &[]).unwrap();
        // the 50 km/h section lies past the 80 km/h one but still caps the 60 km/h section
        assert_eq!(travel.target(0, REACH), Some(SpeedLimit::new(7.0, 50.0)));
        assert_eq!(travel.target(1, REACH), Some(SpeedLimit::new(7.0, 50.0)));
        assert_eq!(travel.target(2, REACH), None);
    }

    #[test]
    fn test_target_picks_most_restrictive() {
        let travel = SpeedLimits::new(vec![
            SpeedLimit::new(3.0, 80.0),
            SpeedLimit::new(6.0, 60.0),
            SpeedLimit::new(10.0, 80.0),
        ])
        .unwrap()
        .for_travel(false, &[3.25])
        .unwrap();
        // a stop a quarter km past the 60 km/h sign is out of reach from 60 km/h
        assert_eq!(travel.target(0, REACH), Some(SpeedLimit::new(3.25, 0.0)));
        assert_eq!(travel.target(1, REACH), Some(SpeedLimit::new(3.25, 0.0)));
        // with much stronger brakes the lower limit comes first
        assert_eq!(travel.target(0, 20_000.0), Some(SpeedLimit::new(3.0, 60.0)));
        assert_eq!(travel.target(2, REACH), None);
    }

    #[test]
    fn test_rejects_nonpositive_limit() {
        assert!(SpeedLimits::new(vec![SpeedLimit::new(1.0, 0.0)]).is_err());
        assert!(SpeedLimits::new(vec![SpeedLimit::new(1.0, f64::NAN)]).is_err());
        assert!(SpeedLimits::new(vec![]).is_err());
    }
}
