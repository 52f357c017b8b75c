//! Specific motion resistance of the locomotive and the train, and the retarding force of the
//! undercarriage generators.

use super::{Locomotive, Train};
use crate::imports::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Rail-joint regime of the track, which selects the resistance coefficients
pub enum TrackType {
    /// Continuous welded rail
    #[default]
    Continuous,
    /// Jointed rail
    Jointed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Polynomial coefficients `[a0, a1, a2, ...]` of specific resistance in N/kN against speed in
/// km/h, one set per [TrackType]
pub struct ResistanceCoefficients {
    pub continuous: Vec<f64>,
    pub jointed: Vec<f64>,
}

impl ResistanceCoefficients {
    pub fn new(continuous: Vec<f64>, jointed: Vec<f64>) -> Self {
        Self {
            continuous,
            jointed,
        }
    }

    pub fn for_track(&self, track_type: TrackType) -> &[f64] {
        match track_type {
            TrackType::Continuous => &self.continuous,
            TrackType::Jointed => &self.jointed,
        }
    }
}

impl Init for ResistanceCoefficients {
    fn init(&mut self) -> Result<(), Error> {
        if self
            .continuous
            .iter()
            .chain(self.jointed.iter())
            .any(|c| c.is_nan())
        {
            return Err(Error::Validation(
                "resistance coefficients must not be NaN".into(),
            ));
        }
        if self.continuous.is_empty() || self.jointed.is_empty() {
            return Err(Error::Validation(
                "resistance coefficients must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Evaluates the polynomial with coefficients in ascending power order
fn polyval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Coefficient-wise weighted mean of two coefficient sets
fn blend(a: &[f64], weight_a: f64, b: &[f64], weight_b: f64) -> Result<Vec<f64>, Error> {
    if a.len() != b.len() {
        return Err(Error::Validation(format!(
            "locomotive and train resistance coefficient arrays differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let total = weight_a + weight_b;
    if !(total > 0.0) {
        return Err(Error::Validation(format!(
            "total mass must be positive, got {total} t"
        )));
    }
    let blended: Vec<f64> = a
        .iter()
        .zip(b)
        .map(|(ca, cb)| (weight_a * ca + weight_b * cb) / total)
        .collect();
    if blended.iter().any(|c| c.is_nan()) {
        return Err(Error::Validation(
            "blended resistance coefficients contain NaN".into(),
        ));
    }
    Ok(blended)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Resistance of the whole train, blended from locomotive and rolling stock by mass
pub struct RunningResistance {
    /// Coefficients while the motors draw current
    motion: Vec<f64>,
    /// Coefficients while coasting or braking
    idle: Vec<f64>,
}

impl RunningResistance {
    pub fn new(
        locomotive: &Locomotive,
        train: &Train,
        track_type: TrackType,
    ) -> anyhow::Result<Self> {
        let loco_mass = locomotive.total_mass().get::<si::megagram>();
        let train_mass = train.mass.get::<si::megagram>();
        let train_coeffs = train.resistance.for_track(track_type);
        Ok(Self {
            motion: blend(
                locomotive.motion_resistance.for_track(track_type),
                loco_mass,
                train_coeffs,
                train_mass,
            )
            .with_context(|| format_dbg!(track_type))?,
            idle: blend(
                locomotive.idle_resistance.for_track(track_type),
                loco_mass,
                train_coeffs,
                train_mass,
            )
            .with_context(|| format_dbg!(track_type))?,
        })
    }

    /// Specific resistance under current at `speed` km/h, N/kN
    pub fn motion(&self, speed: f64) -> f64 {
        polyval(&self.motion, speed)
    }

    /// Specific resistance without current at `speed` km/h, N/kN
    pub fn idle(&self, speed: f64) -> f64 {
        polyval(&self.idle, speed)
    }
}

/// Speed below which undercarriage generators are disconnected, km/h
pub const GENERATOR_CUT_IN_SPEED: f64 = 20.0;

/// Specific retarding force of undercarriage generators, N/kN
///
/// # Arguments
/// - `power`: total generator power, kW
/// - `speed`: km/h
/// - `weight`: train weight, kN
pub fn generator_resistance(power: f64, speed: f64, weight: f64) -> f64 {
    if power <= 0.0 || speed < GENERATOR_CUT_IN_SPEED || weight <= 0.0 {
        return 0.0;
    }
    3600.0 * power / (speed * weight)
}
