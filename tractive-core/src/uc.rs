//! Unit constants for building quantities by multiplication, e.g. `0.5 * uc::S`.

use crate::si;
use std::marker::PhantomData;

pub const S: si::Time = si::Time {
    dimension: PhantomData,
    units: PhantomData,
    value: 1.0,
};
pub const MIN: si::Time = si::Time {
    dimension: PhantomData,
    units: PhantomData,
    value: 60.0,
};
pub const HR: si::Time = si::Time {
    dimension: PhantomData,
    units: PhantomData,
    value: 3600.0,
};
pub const KG: si::Mass = si::Mass {
    dimension: PhantomData,
    units: PhantomData,
    value: 1.0,
};
/// Metric ton
pub const TON: si::Mass = si::Mass {
    dimension: PhantomData,
    units: PhantomData,
    value: 1000.0,
};
pub const R: si::Ratio = si::Ratio {
    dimension: PhantomData,
    units: PhantomData,
    value: 1.0,
};

/// Standard gravity used to turn tonnes into kilonewtons of weight
pub const G_KN_PER_TON: f64 = 9.81;
