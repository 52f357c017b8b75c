//! Reduction of the step trace to fixed-period samples.

use crate::imports::*;
use crate::train::{Element, Load, Regime};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Mean of [Element]s over one averaging period
pub struct AverageElement {
    /// Real track coordinate, km
    pub coordinate: f64,
    /// km/h
    pub speed: f64,
    pub load: Load,
    /// Majority regime of the window
    pub regime: Regime,
    /// kN per locomotive
    pub force: f64,
    pub throttle_position: f64,
    /// km/h
    pub speed_limit: f64,
    /// °C
    pub motor_temperature: f64,
    /// A
    pub motor_amperage: f64,
}

impl AverageElement {
    /// Averages a non-empty window of elements
    pub fn from_window(window: &[Element]) -> anyhow::Result<Self> {
        ensure!(!window.is_empty(), "{}\nempty averaging window", format_dbg!());
        let n = window.len() as f64;
        let mean = |f: fn(&Element) -> f64| window.iter().map(f).sum::<f64>() / n;
        let loads: Vec<Load> = window.iter().map(|e| e.load).collect();
        Ok(Self {
            coordinate: mean(|e| e.coordinate),
            speed: mean(|e| e.speed),
            load: Load::mean(&loads)?,
            regime: Regime::from_mean(mean(|e| e.regime.sign())),
            force: mean(|e| e.force),
            throttle_position: mean(|e| e.throttle_position),
            speed_limit: mean(|e| e.speed_limit),
            motor_temperature: mean(|e| e.motor_temperature),
            motor_amperage: mean(|e| e.motor_amperage),
        })
    }
}

/// Number of raw steps per averaged sample, never less than one
pub fn window_len(time_slot: si::Time, averaging_period: si::Time) -> usize {
    ((averaging_period / time_slot).get::<si::ratio>().round() as usize).max(1)
}

/// Groups `elements` into windows of `averaging_period / time_slot` steps and averages each.
/// A trailing partial window yields a final, shorter sample.
pub fn average(
    elements: &[Element],
    time_slot: si::Time,
    averaging_period: si::Time,
) -> anyhow::Result<Vec<AverageElement>> {
    ensure!(
        time_slot > si::Time::ZERO && averaging_period > si::Time::ZERO,
        "{}\ntime slot and averaging period must be positive",
        format_dbg!()
    );
    elements
        .chunks(window_len(time_slot, averaging_period))
        .map(AverageElement::from_window)
        .collect()
}

#[readonly::make]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Averaged motion and load of one train, read-only once computed
pub struct TractiveResult {
    pub elements: Vec<AverageElement>,
    pub averaging_period: si::Time,
    /// Mass of the simulated train including locomotives
    pub reference_mass: si::Mass,
}

impl TractiveResult {
    pub fn new(
        elements: Vec<AverageElement>,
        averaging_period: si::Time,
        reference_mass: si::Mass,
    ) -> anyhow::Result<Self> {
        let mut result = Self {
            elements,
            averaging_period,
            reference_mass,
        };
        result.init()?;
        Ok(result)
    }

    /// Averages a raw step trace
    pub fn from_elements(
        raw: &[Element],
        time_slot: si::Time,
        averaging_period: si::Time,
        reference_mass: si::Mass,
    ) -> anyhow::Result<Self> {
        Self::new(
            average(raw, time_slot, averaging_period)?,
            averaging_period,
            reference_mass,
        )
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Sample count times the averaging period
    pub fn duration(&self) -> si::Time {
        self.averaging_period * self.elements.len() as f64
    }

    /// Time spent moving, excluding standing at stops
    pub fn travel_time(&self) -> si::Time {
        self.averaging_period * self.elements.iter().filter(|e| e.speed > 0.0).count() as f64
    }

    /// Highest averaged motor overheat, °C
    pub fn peak_overheat(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| e.motor_temperature)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Sample covering `elapsed` time since departure
    pub fn sample_at(&self, elapsed: si::Time) -> Option<&AverageElement> {
        if elapsed < si::Time::ZERO {
            return None;
        }
        let idx = (elapsed / self.averaging_period).get::<si::ratio>().floor() as usize;
        self.elements.get(idx)
    }

    /// Sample coordinates in time order, km
    pub fn coordinates(&self) -> Vec<f64> {
        self.elements.iter().map(|e| e.coordinate).collect()
    }
}

impl Init for TractiveResult {
    fn init(&mut self) -> Result<(), Error> {
        if !(self.averaging_period > si::Time::ZERO) {
            return Err(Error::Validation(
                "averaging period must be positive".into(),
            ));
        }
        if !(self.reference_mass > si::Mass::ZERO) {
            return Err(Error::Validation("reference mass must be positive".into()));
        }
        Ok(())
    }
}
impl SerdeAPI for TractiveResult {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::train::CurrentType;
    use proptest::prelude::*;

    fn raw(i: usize) -> Element {
        Element {
            coordinate: i as f64,
            speed: 10.0 * i as f64,
            load: Load::new(CurrentType::Dc, 100.0 * i as f64, None).unwrap(),
            regime: if i < 3 {
                Regime::Traction
            } else if i < 7 {
                Regime::Coast
            } else {
                Regime::Braking
            },
            force: 1.0,
            throttle_position: 0.5,
            speed_limit: 60.0,
            motor_temperature: 20.0 + i as f64,
            motor_amperage: 2.0 * i as f64,
        }
    }

    #[test]
    fn test_average_ten_elements_period_five() {
        let elements: Vec<Element> = (0..10).map(raw).collect();
        let averaged = average(&elements, uc::S, 5.0 * uc::S).unwrap();
        assert_eq!(averaged.len(), 2);
        assert_eq!(averaged[0].coordinate, 2.0);
        assert_eq!(averaged[1].coordinate, 7.0);
        assert_eq!(averaged[0].speed, 20.0);
        assert_eq!(averaged[1].load.active(), 700.0);
        assert_eq!(averaged[1].motor_temperature, 27.0);
        // signs 1, 1, 1, 0, 0 and 0, 0, -1, -1, -1
        assert_eq!(averaged[0].regime, Regime::Traction);
        assert_eq!(averaged[1].regime, Regime::Braking);
    }

    #[test]
    fn test_trailing_partial_window() {
        let elements: Vec<Element> = (0..7).map(raw).collect();
        let averaged = average(&elements, uc::S, 5.0 * uc::S).unwrap();
        assert_eq!(averaged.len(), 2);
        assert_eq!(averaged[1].coordinate, 5.5);
    }

    #[test]
    fn test_window_never_zero() {
        assert_eq!(window_len(10.0 * uc::S, uc::S), 1);
        assert_eq!(window_len(uc::S, 10.0 * uc::S), 10);
    }

    #[test]
    fn test_tractive_result_accessors() {
        let elements: Vec<Element> = (0..10).map(raw).collect();
        let result =
            TractiveResult::from_elements(&elements, uc::S, 2.0 * uc::S, 1000.0 * uc::TON)
                .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(result.duration(), 10.0 * uc::S);
        assert_eq!(result.travel_time(), 10.0 * uc::S);
        assert_eq!(result.peak_overheat(), 28.5);
        assert_eq!(result.sample_at(3.0 * uc::S).unwrap().coordinate, 2.5);
        assert!(result.sample_at(10.0 * uc::S).is_none());
        assert!(result.sample_at(-1.0 * uc::S).is_none());
    }

    #[test]
    fn test_tractive_result_rejects_bad_period() {
        assert!(TractiveResult::new(vec![], si::Time::ZERO, uc::TON).is_err());
    }

    proptest! {
        #[test]
        fn prop_averaged_len(n in 1usize..300, k in 1usize..30) {
            let elements: Vec<Element> = (0..n).map(raw).collect();
            let averaged = average(&elements, uc::S, k as f64 * uc::S).unwrap();
            prop_assert_eq!(averaged.len(), (n + k - 1) / k);
        }
    }
}
