//! Discretized traction and recuperation characteristics of a locomotive.

use crate::imports::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// One sample of a position characteristic
pub struct TractionPoint {
    /// km/h
    pub speed: f64,
    /// Force of one locomotive, kN
    pub force: f64,
    /// Current of one traction motor, A
    pub motor_amperage: f64,
    /// Active current drawn by one locomotive, A
    pub active_amperage: f64,
    /// Apparent current drawn by one locomotive, A; present only for AC locomotives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_amperage: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
/// Force and currents of one locomotive at a given operating point
pub struct TractionSample {
    /// kN
    pub force: f64,
    /// A
    pub motor_amperage: f64,
    /// A
    pub active_amperage: f64,
    /// A
    pub full_amperage: Option<f64>,
}

impl TractionSample {
    pub(crate) fn scaled(self, k: f64) -> Self {
        Self {
            force: self.force * k,
            motor_amperage: self.motor_amperage * k,
            active_amperage: self.active_amperage * k,
            full_amperage: self.full_amperage.map(|f| f * k),
        }
    }

    fn amperages_scaled(self, k: f64) -> Self {
        Self {
            force: self.force,
            ..self.scaled(k)
        }
    }

    /// `(1 - p) * a + p * b`
    fn blended(a: Self, b: Self, p: f64) -> Self {
        let mix = |x: f64, y: f64| (1.0 - p) * x + p * y;
        Self {
            force: mix(a.force, b.force),
            motor_amperage: mix(a.motor_amperage, b.motor_amperage),
            active_amperage: mix(a.active_amperage, b.active_amperage),
            full_amperage: match (a.full_amperage, b.full_amperage) {
                (Some(fa), Some(fb)) => Some(mix(fa, fb)),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Characteristic of one throttle position (notch), ordered by speed
pub struct Position {
    pub points: Vec<TractionPoint>,
}

impl Position {
    pub fn new(points: Vec<TractionPoint>) -> anyhow::Result<Self> {
        let mut position = Self { points };
        position.init()?;
        Ok(position)
    }

    pub fn has_full_amperage(&self) -> bool {
        self.points.iter().all(|p| p.full_amperage.is_some())
    }

    /// Samples the characteristic at `speed`.  Beyond the last tabulated speed the force falls
    /// off with the square and the currents linearly with the ratio of speeds.
    fn sample(&self, speed: f64) -> anyhow::Result<TractionSample> {
        let last = self
            .points
            .last()
            .with_context(|| format!("{}\nempty position characteristic", format_dbg!()))?;
        if speed > last.speed && speed > 0.0 && last.speed > 0.0 {
            let k = last.speed / speed;
            return Ok(TractionSample {
                force: last.force * k * k,
                motor_amperage: last.motor_amperage * k,
                active_amperage: last.active_amperage * k,
                full_amperage: last.full_amperage.map(|f| f * k),
            });
        }
        let speeds: Vec<f64> = self.points.iter().map(|p| p.speed).collect();
        let column = |f: fn(&TractionPoint) -> f64| -> anyhow::Result<f64> {
            let values: Vec<f64> = self.points.iter().map(f).collect();
            interp1d(speed, &speeds, &values, false)
        };
        Ok(TractionSample {
            force: column(|p| p.force)?,
            motor_amperage: column(|p| p.motor_amperage)?,
            active_amperage: column(|p| p.active_amperage)?,
            full_amperage: if self.has_full_amperage() {
                Some(column(|p| p.full_amperage.unwrap_or_default())?)
            } else {
                None
            },
        })
    }
}

impl Init for Position {
    fn init(&mut self) -> Result<(), Error> {
        if self.points.is_empty() {
            return Err(Error::Validation(
                "position characteristic must not be empty".into(),
            ));
        }
        let speeds: Vec<f64> = self.points.iter().map(|p| p.speed).collect();
        if !is_sorted(&speeds) || speeds.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::Validation(
                "position characteristic speeds must be strictly increasing".into(),
            ));
        }
        if let Some(p) = self.points.iter().find(|p| {
            p.full_amperage
                .map(|full| full < p.active_amperage)
                .unwrap_or(false)
        }) {
            return Err(Error::DataConsistency(format!(
                "full current below active current at {} km/h",
                p.speed
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Set of throttle positions of a locomotive.
///
/// With one position the throttle scales its characteristic, with two positions the throttle
/// blends between them, and with three or more the positions are discrete notches whose force is
/// capped by the first (limiting) characteristic.
pub struct TractivePositions {
    pub positions: Vec<Position>,
}

impl TractivePositions {
    pub fn new(positions: Vec<Position>) -> anyhow::Result<Self> {
        let mut positions = Self { positions };
        positions.init()?;
        Ok(positions)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether positions are discrete notches rather than a continuous throttle
    pub fn is_notched(&self) -> bool {
        self.positions.len() >= 3
    }

    /// Notch selected by a throttle fraction
    pub fn notch(&self, throttle: f64) -> usize {
        let top = self.positions.len().saturating_sub(1);
        ((throttle.clamp(0.0, 1.0) * top as f64).round() as usize).min(top)
    }

    /// Fails unless every sample carries the apparent current needed on AC lines
    pub fn require_full_amperage(&self) -> Result<(), Error> {
        if self.positions.iter().all(|p| p.has_full_amperage()) {
            Ok(())
        } else {
            Err(Error::DataConsistency(
                "AC current type requires full current in every position sample".into(),
            ))
        }
    }

    /// Force and currents of one locomotive.
    ///
    /// # Arguments
    /// - `speed`: km/h
    /// - `throttle`: throttle fraction in `[0, 1]`; selects the notch for notched locomotives
    /// - `adhesion`: adhesion coefficient, scales the currents
    /// - `voltage_ratio`: real over nominal catenary voltage; the table is read at
    ///   `speed / voltage_ratio`
    pub fn get_fktu(
        &self,
        speed: f64,
        throttle: f64,
        adhesion: f64,
        voltage_ratio: f64,
    ) -> anyhow::Result<TractionSample> {
        ensure!(
            voltage_ratio > 0.0,
            "{}\nvoltage ratio must be positive, got {}",
            format_dbg!(),
            voltage_ratio
        );
        let speed = speed.max(0.0) / voltage_ratio;
        let p = throttle.clamp(0.0, 1.0);
        let sample = match self.positions.as_slice() {
            [] => bail!("{}\nno traction positions", format_dbg!()),
            [single] => single.sample(speed)?.scaled(p),
            [low, high] => TractionSample::blended(low.sample(speed)?, high.sample(speed)?, p),
            notches => {
                let limiting = notches[0].sample(speed)?;
                let selected = notches[self.notch(p)].sample(speed)?;
                // contactors drop out to the limiting characteristic near notch boundaries
                if limiting.force <= selected.force {
                    limiting
                } else {
                    selected
                }
            }
        };
        Ok(sample.amperages_scaled(adhesion))
    }
}

impl Init for TractivePositions {
    fn init(&mut self) -> Result<(), Error> {
        if self.positions.is_empty() {
            return Err(Error::Validation(
                "at least one traction position is required".into(),
            ));
        }
        self.positions.init()
    }
}
impl SerdeAPI for TractivePositions {}

impl Valid for TractivePositions {
    /// Single full-field characteristic of a 3 kV DC freight locomotive
    fn valid() -> Self {
        let table = [
            // speed, force, motor amperage, active amperage
            (0.0, 400.0, 620.0, 1100.0),
            (20.0, 390.0, 610.0, 1650.0),
            (40.0, 370.0, 600.0, 2400.0),
            (50.0, 330.0, 590.0, 2500.0),
            (60.0, 280.0, 560.0, 2550.0),
            (70.0, 240.0, 530.0, 2550.0),
            (80.0, 205.0, 500.0, 2500.0),
            (90.0, 180.0, 470.0, 2450.0),
            (100.0, 160.0, 450.0, 2400.0),
        ];
        Self {
            positions: vec![Position {
                points: table
                    .iter()
                    .map(|&(speed, force, motor_amperage, active_amperage)| TractionPoint {
                        speed,
                        force,
                        motor_amperage,
                        active_amperage,
                        full_amperage: None,
                    })
                    .collect(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(speed: f64, force: f64) -> TractionPoint {
        TractionPoint {
            speed,
            force,
            motor_amperage: force,
            active_amperage: 2.0 * force,
            full_amperage: Some(3.0 * force),
        }
    }

    fn notches() -> TractivePositions {
        TractivePositions::new(vec![
            Position::new(vec![point(0.0, 250.0), point(50.0, 250.0)]).unwrap(),
            Position::new(vec![point(0.0, 200.0), point(50.0, 150.0)]).unwrap(),
            Position::new(vec![point(0.0, 300.0), point(50.0, 250.0)]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_position_scales_with_throttle() {
        let positions = TractivePositions::valid();
        let full = positions.get_fktu(20.0, 1.0, 1.0, 1.0).unwrap();
        let half = positions.get_fktu(20.0, 0.5, 1.0, 1.0).unwrap();
        assert_eq!(full.force, 390.0);
        assert!(almost_eq(half.force, 195.0, None));
        assert!(almost_eq(half.active_amperage, 825.0, None));
    }

    #[test]
    fn test_interpolation_and_voltage_correction() {
        let positions = TractivePositions::valid();
        let sample = positions.get_fktu(45.0, 1.0, 1.0, 1.0).unwrap();
        assert!(almost_eq(sample.force, 350.0, None));
        // at 90 % voltage the characteristic is read at 50 km/h
        let sample = positions.get_fktu(45.0, 1.0, 1.0, 0.9).unwrap();
        assert!(almost_eq(sample.force, 330.0, None));
    }

    #[test]
    fn test_beyond_last_speed() {
        let positions = TractivePositions::valid();
        let sample = positions.get_fktu(200.0, 1.0, 1.0, 1.0).unwrap();
        assert!(almost_eq(sample.force, 40.0, None));
        assert!(almost_eq(sample.active_amperage, 1200.0, None));
    }

    #[test]
    fn test_adhesion_scales_currents_only() {
        let positions = TractivePositions::valid();
        let sample = positions.get_fktu(0.0, 1.0, 0.5, 1.0).unwrap();
        assert_eq!(sample.force, 400.0);
        assert_eq!(sample.active_amperage, 550.0);
    }

    #[test]
    fn test_two_positions_blend() {
        let positions = TractivePositions::new(vec![
            Position::new(vec![point(0.0, 100.0)]).unwrap(),
            Position::new(vec![point(0.0, 300.0)]).unwrap(),
        ])
        .unwrap();
        let sample = positions.get_fktu(10.0, 0.25, 1.0, 1.0).unwrap();
        assert!(almost_eq(sample.force, 150.0, None));
        assert_eq!(sample.full_amperage, Some(450.0));
    }

    #[test]
    fn test_notched_takes_lesser_force() {
        let positions = notches();
        assert!(positions.is_notched());
        assert_eq!(positions.notch(0.74), 1);
        assert_eq!(positions.notch(0.76), 2);
        let sample = positions.get_fktu(0.0, 1.0, 1.0, 1.0).unwrap();
        assert_eq!(sample.force, 250.0);
        assert_eq!(sample.active_amperage, 500.0);
        let sample = positions.get_fktu(50.0, 0.5, 1.0, 1.0).unwrap();
        assert_eq!(sample.force, 150.0);
    }

    #[test]
    fn test_full_below_active_rejected() {
        let mut bad = point(0.0, 100.0);
        bad.full_amperage = Some(50.0);
        let err = Position::new(vec![bad]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::DataConsistency(_))
        ));
        assert!(TractivePositions::valid().require_full_amperage().is_err());
        assert!(notches().require_full_amperage().is_ok());
    }

    #[test]
    fn test_unsorted_speeds_rejected() {
        assert!(Position::new(vec![point(10.0, 1.0), point(5.0, 1.0)]).is_err());
    }
}
