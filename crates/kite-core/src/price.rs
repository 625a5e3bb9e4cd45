//! Fixed-point price type.
//!
//! The wire protocol delivers prices as integer hundredths of a rupee.
//! Keeping that representation internally avoids accumulated float error
//! in threshold comparisons; conversion to `Decimal` happens only at the
//! rendering and percentage-math boundaries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Price in integer hundredths of a rupee (paise).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Paise(pub i64);

impl Paise {
    pub const ZERO: Self = Self(0);

    #[inline]
    pub fn from_raw(hundredths: i64) -> Self {
        Self(hundredths)
    }

    /// Build from the wire representation (unsigned hundredths).
    #[inline]
    pub fn from_wire(hundredths: u32) -> Self {
        Self(i64::from(hundredths))
    }

    #[inline]
    pub fn raw(&self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Exact decimal value in rupees.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Percent change of `self` relative to `base`.
    ///
    /// Returns `None` when `base` is zero.
    #[inline]
    pub fn pct_from(&self, base: Paise) -> Option<Decimal> {
        if base.is_zero() {
            return None;
        }
        Some(Decimal::from(self.0 - base.0) / Decimal::from(base.0) * Decimal::from(100))
    }
}

impl fmt::Display for Paise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rupees = self.0 / 100;
        let frac = (self.0 % 100).abs();
        if self.0 < 0 && rupees == 0 {
            write!(f, "-0.{frac:02}")
        } else {
            write!(f, "{rupees}.{frac:02}")
        }
    }
}

impl Add for Paise {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Paise {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Paise {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl From<u32> for Paise {
    fn from(hundredths: u32) -> Self {
        Self::from_wire(hundredths)
    }
}
