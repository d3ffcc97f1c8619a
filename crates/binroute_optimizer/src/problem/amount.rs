use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Sub},
};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Thousandths of a unit
const SCALE: f64 = 1000.0;

/// Largest demand or capacity accepted, in units. Sums of up to thousands of such
/// amounts stay far below `u64::MAX` once scaled.
pub const MAX_AMOUNT: f64 = 1e12;

/// Product of a float by [`SCALE`] closer than this to an integer is treated as that integer,
/// so `0.1` becomes `100` and not `101`.
const SNAP_EPSILON: f64 = 1e-6;

/// Exact fixed-point quantity (weight) used for demands, capacities and loads.
///
/// Demands are rounded up and capacities rounded down when quantized, a load that fits
/// in quantized units therefore also fits with the original numbers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_units(thousandths: u64) -> Self {
        Amount(thousandths)
    }

    /// `None` when the value is negative, not finite or above [`MAX_AMOUNT`].
    pub fn from_demand(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value > MAX_AMOUNT {
            return None;
        }

        Some(Amount(quantize(value, f64::ceil)))
    }

    /// `None` when the value is not strictly positive, not finite or above [`MAX_AMOUNT`].
    pub fn from_capacity(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 || value > MAX_AMOUNT {
            return None;
        }

        Some(Amount(quantize(value, f64::floor)))
    }

    pub const fn units(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / SCALE
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn fits_within(self, capacity: Amount) -> bool {
        self <= capacity
    }
}

fn quantize(value: f64, round: fn(f64) -> f64) -> u64 {
    let scaled = value * SCALE;
    let nearest = scaled.round();

    if (scaled - nearest).abs() < SNAP_EPSILON {
        nearest as u64
    } else {
        round(scaled) as u64
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}

/// Saturates, a saturated load never fits within a capacity.
impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |total, amount| total + amount)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
