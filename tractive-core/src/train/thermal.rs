//! Overheat of traction motor windings.

use crate::imports::*;

/// Overheat floor reached by cooling windings, °C
pub const AMBIENT_OVERHEAT: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Heating characteristic of a traction motor
pub struct ThermalCharacteristic {
    /// Thermal time constant of the windings
    pub time_constant: si::Time,
    /// Motor currents of the balancing-overheat table, A, strictly increasing
    pub currents: Vec<f64>,
    /// Steady-state overheat reached at each current, °C
    pub balancing_overheats: Vec<f64>,
    /// Overheat above which a warning is raised, °C
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissible_overheat: Option<f64>,
}

impl ThermalCharacteristic {
    /// Steady-state overheat at motor current `current`, linearly extrapolated past the table
    pub fn balancing_overheat(&self, current: f64) -> anyhow::Result<f64> {
        interp1d(
            current.abs(),
            &self.currents,
            &self.balancing_overheats,
            true,
        )
    }

    /// Overheat after carrying `current` for `dt`, starting from `overheat`
    pub fn heat(&self, overheat: f64, current: f64, dt: si::Time) -> anyhow::Result<f64> {
        let ratio = (dt / self.time_constant).get::<si::ratio>();
        Ok(self.balancing_overheat(current)? * ratio + overheat * (1.0 - ratio))
    }

    /// Overheat after cooling without current for `dt`, starting from `overheat`
    pub fn cool(&self, overheat: f64, dt: si::Time) -> f64 {
        let ratio = (dt / self.time_constant).get::<si::ratio>();
        (overheat * (-ratio).exp()).max(AMBIENT_OVERHEAT)
    }
}

impl Default for ThermalCharacteristic {
    fn default() -> Self {
        Self {
            time_constant: 30.0 * uc::MIN,
            currents: vec![0.0, 400.0, 600.0, 800.0],
            balancing_overheats: vec![0.0, 70.0, 120.0, 190.0],
            permissible_overheat: Some(140.0),
        }
    }
}

impl Init for ThermalCharacteristic {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.time_constant > si::Time::ZERO) {
            return Err(Error::Validation(
                "thermal time constant must be positive".into(),
            ));
        }
        if self.currents.len() != self.balancing_overheats.len() || self.currents.is_empty() {
            return Err(Error::Validation(format!(
                "balancing-overheat table needs matching, non-empty columns: {} currents vs {} overheats",
                self.currents.len(),
                self.balancing_overheats.len()
            )));
        }
        if !is_sorted(&self.currents) || self.currents.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::Validation(
                "balancing-overheat currents must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}
impl SerdeAPI for ThermalCharacteristic {}
impl Valid for ThermalCharacteristic {}

#[derive(Debug, Clone, PartialEq)]
/// Tracks winding overheat over a run
pub struct ThermalModel {
    characteristic: ThermalCharacteristic,
    overheat: f64,
    peak: f64,
    warned: bool,
}

impl ThermalModel {
    pub fn new(characteristic: ThermalCharacteristic, initial_overheat: f64) -> Self {
        Self {
            characteristic,
            overheat: initial_overheat,
            peak: initial_overheat,
            warned: false,
        }
    }

    pub fn overheat(&self) -> f64 {
        self.overheat
    }

    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Advances the overheat by `dt`.  Windings heat while `current` flows through them and
    /// cool otherwise.
    ///
    /// # Arguments
    /// - `current`: motor current when the motors are loaded (traction or recuperation)
    /// - `dt`: elapsed time
    /// - `coordinate`: real coordinate, only used for diagnostics
    pub fn step(&mut self, current: Option<f64>, dt: si::Time, coordinate: f64) -> anyhow::Result<f64> {
        self.overheat = match current {
            Some(current) => self
                .characteristic
                .heat(self.overheat, current, dt)
                .with_context(|| format_dbg!(current))?,
            None => self.characteristic.cool(self.overheat, dt),
        };
        self.peak = self.peak.max(self.overheat);
        if let Some(permissible) = self.characteristic.permissible_overheat {
            if self.overheat > permissible && !self.warned {
                self.warned = true;
                #[cfg(feature = "logging")]
                log::warn!(
                    "motor overheat {} °C exceeds permissible {} °C at {} km",
                    self.overheat.format_eng(Some(4)),
                    permissible.format_eng(Some(4)),
                    coordinate.format_eng(Some(6))
                );
            }
        }
        #[cfg(not(feature = "logging"))]
        let _ = coordinate;
        Ok(self.overheat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heating_approaches_balance() {
        let chr = ThermalCharacteristic::default();
        let mut model = ThermalModel::new(chr, 15.0);
        let mut prev = model.overheat();
        for _ in 0..600 {
            let next = model.step(Some(600.0), 10.0 * uc::S, 0.0).unwrap();
            assert!(next >= prev);
            prev = next;
        }
        assert!(prev < 120.0);
        assert!(prev > 110.0);
        assert_eq!(model.peak(), prev);
    }

    #[test]
    fn test_heating_formula() {
        let chr = ThermalCharacteristic::default();
        // 60 s of a 30 min constant: θ' = 120 * 1/30 + 40 * 29/30
        let theta = chr.heat(40.0, 600.0, 60.0 * uc::S).unwrap();
        assert!(almost_eq(theta, 4.0 + 40.0 * 29.0 / 30.0, None));
    }

    #[test]
    fn test_cooling_floor() {
        let chr = ThermalCharacteristic::default();
        assert!(almost_eq(
            chr.cool(100.0, 30.0 * uc::MIN),
            100.0 * (-1.0f64).exp(),
            None
        ));
        assert_eq!(chr.cool(16.0, 30.0 * uc::MIN), AMBIENT_OVERHEAT);
    }

    #[test]
    fn test_extrapolates_balancing_table() {
        let chr = ThermalCharacteristic::default();
        assert!(almost_eq(chr.balancing_overheat(1000.0).unwrap(), 260.0, None));
    }

    #[test]
    fn test_rejects_bad_table() {
        let mut chr = ThermalCharacteristic {
            currents: vec![0.0, 100.0],
            ..Default::default()
        };
        assert!(chr.init().is_err());
    }

    #[test]
    fn test_rejects_repeated_current() {
        let mut chr = ThermalCharacteristic {
            currents: vec![0.0, 400.0, 400.0, 800.0],
            ..Default::default()
        };
        let err = chr.init().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(ThermalCharacteristic::default().init().is_ok());
    }
}
