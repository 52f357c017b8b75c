//! Coasting and braking curves computed backward from an upcoming lower speed limit.

use super::RunningResistance;
use crate::imports::*;
use crate::track::{Profile, SpeedLimit};

/// Speed gained per second by one N/kN of specific force, (km/h)/s
pub const ZETA: f64 = 120.0 / 3600.0;
/// Simulated time that bounds the length of one curve
const CURVE_HORIZON_SECONDS: f64 = 600.0;
/// Coordinate step of the curve tail, km
const TAIL_STEP: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    /// Coasting with idle resistance
    Idle,
    /// Full service braking with grade and generators, without running resistance
    Brake,
}

/// Retarding forces acting on the train, in N/kN
#[derive(Debug, Clone, Copy)]
pub struct Retardation<'a> {
    pub profile: &'a Profile,
    pub resistance: &'a RunningResistance,
    /// kN
    pub weight: f64,
    /// kW
    pub generator_power: f64,
    pub adhesion: f64,
    /// N/kN
    pub brake_force: f64,
}

impl<'a> Retardation<'a> {
    /// Reduced grade at `coordinate`, N/kN
    pub fn grade(&self, coordinate: f64) -> f64 {
        self.profile
            .element_at(coordinate)
            .map(|e| e.specific_resistance_from_grade)
            .unwrap_or_default()
    }

    pub fn generator(&self, speed: f64) -> f64 {
        super::generator_resistance(self.generator_power, speed, self.weight)
    }

    /// Deceleration-producing specific force for a curve of `kind`.  The brake curve leaves out
    /// running resistance so that a train braking in earnest always has that much in hand.
    fn total(&self, kind: CurveKind, speed: f64, coordinate: f64) -> f64 {
        let external = self.grade(coordinate) + self.generator(speed);
        match kind {
            CurveKind::Idle => external + self.resistance.idle(speed),
            CurveKind::Brake => external + self.adhesion * self.brake_force,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    /// km/h
    pub speed: f64,
    /// km
    pub coordinate: f64,
}

#[derive(Debug, Clone, PartialEq)]
/// Latest `(speed, coordinate)` boundary at which coasting or braking must begin.  Points are
/// stored starting at the target and the cursor moves toward the target as the train advances.
pub struct LookaheadCurve {
    kind: CurveKind,
    target: SpeedLimit,
    points: Vec<CurvePoint>,
    cursor: usize,
}

impl LookaheadCurve {
    /// Integrates backward from `target`.
    ///
    /// # Arguments
    /// - `current_limit`: limit of the section the train is in; the curve ends once it is exceeded
    /// - `from`: current train coordinate; the curve is not extended behind it
    /// - `time_slot`: integration step
    pub fn generate(
        kind: CurveKind,
        target: SpeedLimit,
        current_limit: f64,
        from: f64,
        retardation: &Retardation,
        time_slot: si::Time,
    ) -> Self {
        let dt = time_slot.get::<si::second>();
        let max_steps = (CURVE_HORIZON_SECONDS / dt).ceil() as usize;
        let mut points = vec![CurvePoint {
            speed: target.limit,
            coordinate: target.coordinate,
        }];
        let (mut speed, mut coordinate) = (target.limit, target.coordinate);
        for _ in 0..max_steps {
            let prev_speed = speed + retardation.total(kind, speed, coordinate) * ZETA * dt;
            if prev_speed < 0.0 {
                // the train gains speed toward the target even when retarded
                speed = prev_speed;
                break;
            }
            let prev_coordinate = coordinate - (speed + prev_speed) / 2.0 * dt / 3600.0;
            if prev_coordinate > coordinate {
                break;
            }
            points.push(CurvePoint {
                speed: prev_speed,
                coordinate: prev_coordinate,
            });
            speed = prev_speed;
            coordinate = prev_coordinate;
            if speed > current_limit || coordinate <= from {
                break;
            }
        }
        while speed < 0.0 && coordinate > from {
            coordinate -= TAIL_STEP;
            points.push(CurvePoint { speed, coordinate });
        }
        let cursor = points.len() - 1;
        Self {
            kind,
            target,
            points,
            cursor,
        }
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    pub fn target(&self) -> SpeedLimit {
        self.target
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Curve speed at `coordinate`, or `None` while the train has not reached the curve.
    /// Queries are expected to move forward; the cursor only steps back for small overshoots.
    pub fn speed_at(&mut self, coordinate: f64) -> Option<f64> {
        let last = self.points.len() - 1;
        if coordinate < self.points[last].coordinate {
            return None;
        }
        while self.cursor < last && self.points[self.cursor].coordinate > coordinate {
            self.cursor += 1;
        }
        while self.cursor > 0 && self.points[self.cursor - 1].coordinate <= coordinate {
            self.cursor -= 1;
        }
        let here = self.points[self.cursor];
        if self.cursor == 0 {
            return Some(here.speed);
        }
        let ahead = self.points[self.cursor - 1];
        let span = ahead.coordinate - here.coordinate;
        if span <= 0.0 {
            return Some(ahead.speed);
        }
        Some(here.speed + (ahead.speed - here.speed) * (coordinate - here.coordinate) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::ProfileElement;
    use crate::train::{Locomotive, Train, TrackType};

    fn level_profile() -> Profile {
        Profile::new(vec![ProfileElement::new(0.0, 20.0, 0.0, 0.0)]).unwrap()
    }

    fn steep_downhill() -> Profile {
        Profile::new(vec![ProfileElement::new(0.0, 20.0, -30.0, 0.0)]).unwrap()
    }

    fn resistance() -> RunningResistance {
        RunningResistance::new(&Locomotive::valid(), &Train::valid(), TrackType::Continuous)
            .unwrap()
    }

    fn retardation<'a>(profile: &'a Profile, resistance: &'a RunningResistance) -> Retardation<'a> {
        Retardation {
            profile,
            resistance,
            weight: 2192.0 * 9.81,
            generator_power: 0.0,
            adhesion: 0.9,
            brake_force: 40.0,
        }
    }

    #[test]
    fn test_brake_curve_rises_backward() {
        let profile = level_profile();
        let res = resistance();
        let ret = retardation(&profile, &res);
        let target = SpeedLimit::new(10.0, 40.0);
        let mut curve =
            LookaheadCurve::generate(CurveKind::Brake, target, 80.0, 0.0, &ret, uc::S);
        let points = curve.points();
        assert_eq!(points[0].coordinate, 10.0);
        assert!(points
            .windows(2)
            .all(|w| w[1].speed > w[0].speed && w[1].coordinate < w[0].coordinate));
        let last = *points.last().unwrap();
        assert!(last.speed > 80.0);
        assert_eq!(curve.speed_at(0.0), None);
        let mid = curve.speed_at(9.9).unwrap();
        assert!(mid > 40.0 && mid < 80.0);
        assert_eq!(curve.speed_at(10.5), Some(40.0));
    }

    #[test]
    fn test_idle_curve_is_flatter_than_brake_curve() {
        let profile = level_profile();
        let res = resistance();
        let ret = retardation(&profile, &res);
        let target = SpeedLimit::new(10.0, 40.0);
        let mut idle = LookaheadCurve::generate(CurveKind::Idle, target, 80.0, 0.0, &ret, uc::S);
        let mut brake = LookaheadCurve::generate(CurveKind::Brake, target, 80.0, 0.0, &ret, uc::S);
        let x = 9.8;
        assert!(idle.speed_at(x).unwrap() < brake.speed_at(x).unwrap());
    }

    #[test]
    fn test_brake_curve_excludes_running_resistance() {
        let profile = level_profile();
        let res = resistance();
        let ret = retardation(&profile, &res);
        let target = SpeedLimit::new(10.0, 0.0);
        let curve = LookaheadCurve::generate(CurveKind::Brake, target, 80.0, 0.0, &ret, uc::S);
        // every second of braking sheds the same speed whatever the speed
        for w in curve.points().windows(2).take(100) {
            assert!(almost_eq(w[1].speed - w[0].speed, 36.0 * ZETA, Some(1e-9)));
        }
    }

    #[test]
    fn test_negative_tail_on_steep_downhill() {
        let profile = steep_downhill();
        let res = resistance();
        let mut ret = retardation(&profile, &res);
        ret.brake_force = 10.0;
        let target = SpeedLimit::new(10.0, 0.0);
        let mut curve = LookaheadCurve::generate(CurveKind::Brake, target, 80.0, 9.0, &ret, uc::S);
        assert!(curve.points().last().unwrap().coordinate <= 9.0);
        assert!(curve.speed_at(9.5).unwrap() < 0.0);
    }
}
