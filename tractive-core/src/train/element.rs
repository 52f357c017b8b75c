//! Per-step output records of the traction calculation.

use crate::imports::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Motive state of the train
pub enum Regime {
    Traction,
    #[default]
    Coast,
    Braking,
}

impl Regime {
    /// `+1` for traction, `0` for coasting, `-1` for braking
    pub fn sign(&self) -> f64 {
        match self {
            Self::Traction => 1.0,
            Self::Coast => 0.0,
            Self::Braking => -1.0,
        }
    }

    /// Majority regime for the mean of a window of signs
    pub fn from_mean(mean: f64) -> Self {
        if mean > 0.5 {
            Self::Traction
        } else if mean < -0.5 {
            Self::Braking
        } else {
            Self::Coast
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Traction => "traction",
            Self::Coast => "coast",
            Self::Braking => "braking",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Kind of catenary supply
pub enum CurrentType {
    #[default]
    Dc,
    /// Alternating current; loads also carry the apparent (full) current
    Ac,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AcLoadRecord")]
/// Load on an AC catenary.  The full (apparent) current never falls below the active current.
pub struct AcLoad {
    active: f64,
    full: f64,
}

#[derive(Deserialize)]
struct AcLoadRecord {
    active: f64,
    full: f64,
}

impl TryFrom<AcLoadRecord> for AcLoad {
    type Error = Error;

    fn try_from(record: AcLoadRecord) -> Result<Self, Self::Error> {
        Self::new(record.active, record.full)
    }
}

/// Slack for rounding when comparing full and active current, A
const LOAD_TOL: f64 = 1e-9;

impl AcLoad {
    pub fn new(active: f64, full: f64) -> Result<Self, Error> {
        if full + LOAD_TOL < active {
            return Err(Error::DataConsistency(format!(
                "full current {} A is less than active current {} A",
                full.format_eng(Some(4)),
                active.format_eng(Some(4))
            )));
        }
        Ok(Self { active, full })
    }

    pub fn active(&self) -> f64 {
        self.active
    }

    pub fn full(&self) -> f64 {
        self.full
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Current drawn from the catenary.  Negative active current is returned by recuperation.
pub enum Load {
    Dc { active: f64 },
    Ac(AcLoad),
}

impl Default for Load {
    fn default() -> Self {
        Self::Dc { active: 0.0 }
    }
}

impl Load {
    /// Builds the load for `current_type`.  AC loads require `full`.
    pub fn new(current_type: CurrentType, active: f64, full: Option<f64>) -> Result<Self, Error> {
        match current_type {
            CurrentType::Dc => Ok(Self::Dc { active }),
            CurrentType::Ac => {
                let full = full.ok_or_else(|| {
                    Error::DataConsistency(
                        "AC current type requires full current in the traction table".into(),
                    )
                })?;
                Ok(Self::Ac(AcLoad::new(active, full)?))
            }
        }
    }

    /// Zero load of the same kind as `self`
    pub fn zeroed(&self) -> Self {
        match self {
            Self::Dc { .. } => Self::Dc { active: 0.0 },
            Self::Ac(_) => Self::Ac(AcLoad {
                active: 0.0,
                full: 0.0,
            }),
        }
    }

    pub fn active(&self) -> f64 {
        match self {
            Self::Dc { active } => *active,
            Self::Ac(load) => load.active,
        }
    }

    /// Apparent current, present only on AC loads
    pub fn full(&self) -> Option<f64> {
        match self {
            Self::Dc { .. } => None,
            Self::Ac(load) => Some(load.full),
        }
    }

    /// Arithmetic mean of `loads`, which must all be of the same kind
    pub fn mean(loads: &[Load]) -> anyhow::Result<Self> {
        ensure!(!loads.is_empty(), "{}\ncannot average zero loads", format_dbg!());
        if loads
            .iter()
            .any(|l| l.full().is_some() != loads[0].full().is_some())
        {
            bail!(Error::DataConsistency(
                "mixed DC and AC loads in one trace".into()
            ));
        }
        let n = loads.len() as f64;
        let active = loads.iter().map(|l| l.active()).sum::<f64>() / n;
        match loads[0] {
            Self::Dc { .. } => Ok(Self::Dc { active }),
            Self::Ac(_) => {
                let full = loads.iter().filter_map(|l| l.full()).sum::<f64>() / n;
                // means of pairwise-ordered values stay ordered up to rounding
                Ok(Self::Ac(AcLoad {
                    active,
                    full: full.max(active),
                }))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
/// State of the train at the end of one simulation step
pub struct Element {
    /// Real track coordinate, km
    pub coordinate: f64,
    /// km/h
    pub speed: f64,
    pub load: Load,
    pub regime: Regime,
    /// Force per locomotive, kN; negative while braking
    pub force: f64,
    /// Throttle position in `[0, 1]`
    pub throttle_position: f64,
    /// Speed limit in force, km/h
    pub speed_limit: f64,
    /// Motor winding overheat above ambient, °C
    pub motor_temperature: f64,
    /// Current through one traction motor, A
    pub motor_amperage: f64,
}
