//! Import uom si system and add unit constants
//! Zero values should be created using standard uom syntax ($Quantity::ZERO) after adding "use crate::imports::*"
//! Non-zero values should be created using standard uom syntax ($Quantity::new::<$unit>($value)) or multiplication syntax ($value * $UNIT_CONSTANT)

use uom::si;

pub use si::f64::{Mass, Ratio, Time};
pub use si::mass::{kilogram, megagram};
pub use si::ratio::ratio;
pub use si::time::{hour, minute, second};
