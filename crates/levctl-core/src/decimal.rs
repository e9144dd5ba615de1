//! Precision-safe decimal types for leverage accounting.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Leverage bounds are
//! configured with the position's directional sign, but every comparison and
//! interpolation works on magnitudes. `Direction` is the explicit split: take a
//! signed value apart with `direction()` / `magnitude()`, do the math unsigned,
//! and put the sign back with `Direction::apply`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};
use std::str::FromStr;

/// Position bias: long (positive leverage) or short (negative leverage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Direction of a signed value. Zero has no direction.
    #[inline]
    pub fn of(value: Decimal) -> Option<Self> {
        if value.is_zero() {
            None
        } else if value.is_sign_negative() {
            Some(Self::Short)
        } else {
            Some(Self::Long)
        }
    }

    /// Returns 1 for long, -1 for short.
    #[inline]
    pub fn sign(&self) -> Decimal {
        match self {
            Self::Long => Decimal::ONE,
            Self::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// Re-apply this direction to an unsigned magnitude.
    #[inline]
    pub fn apply(&self, magnitude: Decimal) -> Decimal {
        magnitude.abs() * self.sign()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Leverage ratio: position notional divided by collateral value.
///
/// Signed by position direction (long positive, short negative). Zero means
/// the controller is not engaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeverageRatio(pub Decimal);

impl LeverageRatio {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Build a ratio from an explicit direction and magnitude.
    #[inline]
    pub fn from_parts(direction: Direction, magnitude: Decimal) -> Self {
        Self(direction.apply(magnitude))
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Unsigned size of the ratio.
    #[inline]
    pub fn magnitude(&self) -> Decimal {
        self.0.abs()
    }

    /// Direction of the ratio, `None` when zero.
    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        Direction::of(self.0)
    }
}

impl fmt::Display for LeverageRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LeverageRatio {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for LeverageRatio {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Sub for LeverageRatio {
    type Output = Decimal;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}

/// Signed quantity of the base asset.
///
/// Positive means buy base (add long exposure), negative means sell base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseUnits(pub Decimal);

impl BaseUnits {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Unsigned quantity.
    #[inline]
    pub fn abs(&self) -> Decimal {
        self.0.abs()
    }

    /// Trade direction, `None` when zero.
    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        Direction::of(self.0)
    }

    /// Notional value at a given price (signed).
    #[inline]
    pub fn notional(&self, price: Decimal) -> Decimal {
        self.0 * price
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BaseUnits {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for BaseUnits {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for BaseUnits {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for BaseUnits {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for BaseUnits {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_direction_of_zero_is_none() {
        assert_eq!(Direction::of(Decimal::ZERO), None);
        assert_eq!(Direction::of(dec!(2)), Some(Direction::Long));
        assert_eq!(Direction::of(dec!(-0.5)), Some(Direction::Short));
    }

    #[test]
    fn test_direction_apply_ignores_input_sign() {
        assert_eq!(Direction::Short.apply(dec!(0.9525)), dec!(-0.9525));
        assert_eq!(Direction::Short.apply(dec!(-0.9525)), dec!(-0.9525));
        assert_eq!(Direction::Long.apply(dec!(-2)), dec!(2));
    }

    #[test]
    fn test_leverage_ratio_parts_roundtrip() {
        let ratio = LeverageRatio::new(dec!(-1.1));
        assert_eq!(ratio.magnitude(), dec!(1.1));
        assert_eq!(ratio.direction(), Some(Direction::Short));

        let rebuilt = LeverageRatio::from_parts(Direction::Short, ratio.magnitude());
        assert_eq!(rebuilt, ratio);
    }

    #[test]
    fn test_base_units_notional() {
        let units = BaseUnits::new(dec!(-1.5));
        assert_eq!(units.notional(dec!(2000)), dec!(-3000));
        assert_eq!(units.abs(), dec!(1.5));
        assert_eq!((-units).direction(), Some(Direction::Long));
    }

    #[test]
    fn test_leverage_ratio_serde_transparent() {
        let ratio: LeverageRatio = serde_json::from_str("\"-1.25\"").unwrap();
        assert_eq!(ratio.inner(), dec!(-1.25));
    }
}
