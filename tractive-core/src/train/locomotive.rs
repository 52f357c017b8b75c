use super::ResistanceCoefficients;
use crate::imports::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Electric locomotive (or multiple-unit set) hauling the train
pub struct Locomotive {
    pub name: String,
    /// Mass of one unit
    pub mass: si::Mass,
    /// Number of coupled units working together
    pub count: u32,
    /// Catenary voltage at which the traction tables were measured, V
    pub nominal_voltage: f64,
    /// Resistance while the motors draw current
    pub motion_resistance: ResistanceCoefficients,
    /// Resistance while coasting or braking
    pub idle_resistance: ResistanceCoefficients,
}

impl Locomotive {
    pub fn total_mass(&self) -> si::Mass {
        self.mass * self.count as f64
    }
}

impl Init for Locomotive {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.mass > si::Mass::ZERO) {
            return Err(Error::Validation(format!(
                "locomotive `{}` must have positive mass",
                self.name
            )));
        }
        if self.count == 0 {
            return Err(Error::Validation(format!(
                "locomotive `{}` must have at least one unit",
                self.name
            )));
        }
        if !(self.nominal_voltage > 0.0) {
            return Err(Error::Validation(format!(
                "locomotive `{}` must have positive nominal voltage",
                self.name
            )));
        }
        self.motion_resistance.init()?;
        self.idle_resistance.init()?;
        Ok(())
    }
}
impl SerdeAPI for Locomotive {}

impl Valid for Locomotive {
    fn valid() -> Self {
        Self {
            name: "DC freight locomotive".into(),
            mass: 192.0 * uc::TON,
            count: 1,
            nominal_voltage: 3000.0,
            motion_resistance: ResistanceCoefficients::new(
                vec![1.9, 0.008, 0.00025],
                vec![1.9, 0.01, 0.0003],
            ),
            idle_resistance: ResistanceCoefficients::new(
                vec![2.4, 0.009, 0.00033],
                vec![2.4, 0.011, 0.00035],
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Hauled rolling stock
pub struct Train {
    pub mass: si::Mass,
    pub resistance: ResistanceCoefficients,
    /// Specific service-brake force at full application, N/kN
    pub standard_brake_force: f64,
    /// Total power of undercarriage generators, kW
    #[serde(default)]
    pub generator_power: f64,
}

impl Init for Train {
    fn init(&mut self) -> Result<(), Error> {
        if self.mass < si::Mass::ZERO {
            return Err(Error::Validation("train mass must not be negative".into()));
        }
        if !(self.standard_brake_force > 0.0) {
            return Err(Error::Validation(format!(
                "standard brake force must be positive, got {}",
                self.standard_brake_force
            )));
        }
        if !(self.generator_power >= 0.0) {
            return Err(Error::Validation(
                "generator power must not be negative".into(),
            ));
        }
        self.resistance.init()
    }
}
impl SerdeAPI for Train {}

impl Valid for Train {
    fn valid() -> Self {
        Self {
            mass: 2000.0 * uc::TON,
            resistance: ResistanceCoefficients::new(
                vec![0.7, 0.0043, 0.00011],
                vec![0.7, 0.005, 0.00013],
            ),
            standard_brake_force: 40.0,
            generator_power: 0.0,
        }
    }
}

/// Weight of locomotive and train together, kN
pub fn total_weight(locomotive: &Locomotive, train: &Train) -> f64 {
    (locomotive.total_mass() + train.mass).get::<si::megagram>() * uc::G_KN_PER_TON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_weight() {
        let weight = total_weight(&Locomotive::valid(), &Train::valid());
        assert!(almost_eq(weight, 2192.0 * 9.81, None));
    }

    #[test]
    fn test_locomotive_validation() {
        let mut loco = Locomotive::valid();
        assert!(loco.init().is_ok());
        loco.count = 0;
        assert!(loco.init().is_err());
    }

    #[test]
    fn test_train_from_yaml() {
        let yaml = Train::valid().to_yaml().unwrap();
        let train = Train::from_yaml(yaml, false).unwrap();
        assert_eq!(train, Train::valid());
    }
}
