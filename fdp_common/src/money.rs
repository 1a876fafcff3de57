use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const DEFAULT_CURRENCY_CODE: &str = "usd";

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in the minor unit of the platform currency (e.g. cents).
///
/// Amounts travel over the wire as plain integers, so `{"subtotal": 1250}` is 12.50 in the platform currency.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("{value} is too large to convert to Money")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Money> {
        self.0.checked_mul(rhs).map(Money)
    }
}
