//! Prices as whole cents.
//!
//! Entry prices arrive as decimal text (`"2.50"`) or JSON numbers and leave as
//! spreadsheet numbers, but every sum in between is done on integer cents so
//! a batch total never picks up float drift.
//!
//! ```text
//!   "2.50" ──parse──► 2.5 ──from_major──► Money(250) ──Display──► "2.5"
//!                                             │
//!                                   JSON / xlsx cell: 2.5
//! ```
//!
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_major(2.5);
//! assert_eq!(price.cents(), 250);
//! assert_eq!(price.line_total(3).to_string(), "7.5");
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

const CENTS_PER_UNIT: i64 = 100;

/// An amount in cents. Signed so sums stay closed; validation keeps entry
/// prices non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Rounds half away from zero to the nearest cent. NaN and infinities
    /// become zero.
    pub fn from_major(value: f64) -> Self {
        if value.is_finite() {
            Money((value * CENTS_PER_UNIT as f64).round() as i64)
        } else {
            Money(0)
        }
    }

    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn to_major(self) -> f64 {
        self.0 as f64 / CENTS_PER_UNIT as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Price times quantity, saturating at the i64 bounds.
    pub const fn line_total(self, quantity: i64) -> Self {
        Money(self.0.saturating_mul(quantity))
    }

    fn is_whole(self) -> bool {
        self.0 % CENTS_PER_UNIT == 0
    }
}

/// Shortest plain decimal: `0`, `2.5`, `10.99`, `0.05`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / CENTS_PER_UNIT as u64;
        let cents = abs % CENTS_PER_UNIT as u64;

        match (cents, cents % 10) {
            (0, _) => write!(f, "{sign}{units}"),
            (_, 0) => write!(f, "{sign}{units}.{}", cents / 10),
            _ => write!(f, "{sign}{units}.{cents:02}"),
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), Add::add)
    }
}

/// Stored as a plain number in major units: `7` for whole amounts, `2.5`
/// otherwise.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_whole() {
            serializer.serialize_i64(self.0 / CENTS_PER_UNIT)
        } else {
            serializer.serialize_f64(self.to_major())
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if value.is_finite() {
            Ok(Money::from_major(value))
        } else {
            Err(de::Error::custom("price must be a finite number"))
        }
    }
}
