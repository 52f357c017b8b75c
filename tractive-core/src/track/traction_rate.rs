use super::{mirror_sections, section_idx};
use crate::imports::*;
use crate::ordered::OrderedSeq;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// Closing breakpoint of a section on which the usable share of traction is restricted
pub struct TractionRate {
    /// km
    pub coordinate: f64,
    /// Upper bound on the throttle position, in (0, 1]
    pub rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Traction-rate sections with the same closing-breakpoint semantics as speed limits.  An empty
/// list leaves traction unrestricted.
pub struct TractionRates {
    rates: OrderedSeq<TractionRate>,
}

impl TractionRates {
    pub fn new(rates: Vec<TractionRate>) -> anyhow::Result<Self> {
        let mut rates = Self {
            rates: OrderedSeq::new(rates)?,
        };
        rates.init()?;
        Ok(rates)
    }

    pub fn rates(&self) -> &[TractionRate] {
        &self.rates
    }

    /// Rates in internal coordinates for the given direction of travel
    pub fn for_travel(&self, reverse: bool) -> anyhow::Result<Self> {
        if !reverse {
            return Ok(self.clone());
        }
        let mut sections: Vec<(f64, f64)> =
            self.rates.iter().map(|r| (r.coordinate, r.rate)).collect();
        // make the unrestricted tail explicit so that it survives mirroring
        sections.push((f64::INFINITY, 1.0));
        Self::new(
            mirror_sections(&sections)
                .into_iter()
                .map(|(coordinate, rate)| TractionRate { coordinate, rate })
                .collect(),
        )
    }

    /// Rate in force at `coordinate`, with the section index found from `hint`
    pub fn rate_at(&self, coordinate: f64, hint: usize) -> (f64, usize) {
        if self.rates.is_empty() {
            return (1.0, 0);
        }
        let idx = section_idx(&self.rates, coordinate, hint);
        // past the last breakpoint the restriction no longer applies
        if coordinate > self.rates[idx].coordinate {
            (1.0, idx)
        } else {
            (self.rates[idx].rate, idx)
        }
    }
}

impl Init for TractionRates {
    fn init(&mut self) -> Result<(), Error> {
        self.rates.init()?;
        if let Some(bad) = self.rates.iter().find(|r| !(r.rate > 0.0 && r.rate <= 1.0)) {
            return Err(Error::Validation(format!(
                "traction rate at {} km must be in (0, 1], got {}",
                bad.coordinate, bad.rate
            )));
        }
        Ok(())
    }
}
impl SerdeAPI for TractionRates {}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> TractionRates {
        TractionRates::new(vec![
            TractionRate {
                coordinate: 2.0,
                rate: 1.0,
            },
            TractionRate {
                coordinate: 4.0,
                rate: 0.5,
            },
        ])
        .unwrap()
    }

    #[test]
    fn test_rate_at() {
        let r = rates();
        assert_eq!(r.rate_at(1.0, 0), (1.0, 0));
        assert_eq!(r.rate_at(3.0, 0), (0.5, 1));
        assert_eq!(r.rate_at(5.0, 1).0, 1.0);
        assert_eq!(TractionRates::default().rate_at(3.0, 0).0, 1.0);
    }

    #[test]
    fn test_reversed() {
        let rev = rates().for_travel(true).unwrap();
        assert_eq!(rev.rate_at(-3.0, 0).0, 0.5);
        assert_eq!(rev.rate_at(-1.0, 0).0, 1.0);
        assert_eq!(rev.rate_at(-5.0, 0).0, 1.0);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(TractionRates::new(vec![TractionRate {
            coordinate: 1.0,
            rate: 1.5
        }])
        .is_err());
    }
}
