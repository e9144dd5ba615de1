//! Leverage ratio arithmetic.
//!
//! Interpolation and clamping happen on magnitudes; the direction is taken
//! from the current ratio (or the target on first engagement) and re-applied
//! at the end. All division goes through `checked_div` so a zero denominator
//! surfaces as an error instead of a panic.

use levctl_core::{BaseUnits, Direction, LeverageRatio, MethodologySettings};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Leverage ratio from position notional and collateral value.
///
/// The sign follows the position direction. Returns exactly zero for a flat
/// position or zero collateral.
pub fn current_leverage_ratio(position_notional: Decimal, collateral_value: Decimal) -> LeverageRatio {
    let Some(direction) = Direction::of(position_notional) else {
        return LeverageRatio::ZERO;
    };
    if collateral_value.is_zero() {
        return LeverageRatio::ZERO;
    }
    match position_notional.abs().checked_div(collateral_value.abs()) {
        Some(magnitude) => LeverageRatio::from_parts(direction, magnitude),
        None => LeverageRatio::ZERO,
    }
}

/// Next leverage ratio one recentering step toward target.
///
/// `raw = |target| * speed + |current| * (1 - speed)`, clamped to
/// `[|min|, |max|]`, signed by `current` (or `target` when `current` is zero).
pub fn next_leverage_ratio(current: LeverageRatio, methodology: &MethodologySettings) -> LeverageRatio {
    let direction = match current.direction().or_else(|| methodology.direction()) {
        Some(direction) => direction,
        None => return LeverageRatio::ZERO,
    };

    let speed = methodology.recentering_speed;
    let raw = methodology.target_leverage_ratio.magnitude() * speed
        + current.magnitude() * (Decimal::ONE - speed);
    let clamped = raw
        .min(methodology.max_leverage_ratio.magnitude())
        .max(methodology.min_leverage_ratio.magnitude());

    LeverageRatio::from_parts(direction, clamped)
}

/// How a leverage change maps to a base-asset trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotionalModel {
    /// Derivatives position only.
    SingleVenue,
    /// Derivatives position paired with an opposite spot leg funded from the
    /// same collateral.
    DualVenue,
}

impl NotionalModel {
    /// Signed base quantity that moves leverage from `current` to `next`.
    ///
    /// - single venue: `base * (next - current) / current`
    /// - dual venue: `base * (next - current) / (current * (1 - next))`
    ///
    /// Undefined for a flat position.
    pub fn rebalance_notional(
        &self,
        base_balance: BaseUnits,
        current: LeverageRatio,
        next: LeverageRatio,
    ) -> EngineResult<BaseUnits> {
        if current.is_zero() {
            return Err(EngineError::FlatPosition);
        }
        let difference = next - current;
        let numerator = base_balance
            .inner()
            .checked_mul(difference)
            .ok_or(EngineError::Overflow("rebalance numerator"))?;

        let denominator = match self {
            Self::SingleVenue => current.inner(),
            Self::DualVenue => current
                .inner()
                .checked_mul(Decimal::ONE - next.inner())
                .ok_or(EngineError::Overflow("rebalance denominator"))?,
        };
        if denominator.is_zero() {
            return Err(EngineError::DegenerateLeverage(format!(
                "next leverage {next} leaves no collateral for the paired leg"
            )));
        }

        numerator
            .checked_div(denominator)
            .map(BaseUnits::new)
            .ok_or(EngineError::Overflow("rebalance notional"))
    }

    /// Signed base quantity that opens a position at `target` from flat.
    ///
    /// - single venue: `accountValue * target / price`
    /// - dual venue: `accountValue * target / (price * (1 - target))`
    pub fn engage_notional(
        &self,
        account_value: Decimal,
        base_price: Decimal,
        target: LeverageRatio,
    ) -> EngineResult<BaseUnits> {
        if base_price <= Decimal::ZERO {
            return Err(EngineError::InvalidPrice(format!(
                "base price must be positive, got {base_price}"
            )));
        }
        let numerator = account_value
            .checked_mul(target.inner())
            .ok_or(EngineError::Overflow("engage numerator"))?;

        let denominator = match self {
            Self::SingleVenue => base_price,
            Self::DualVenue => base_price
                .checked_mul(Decimal::ONE - target.inner())
                .ok_or(EngineError::Overflow("engage denominator"))?,
        };
        if denominator.is_zero() {
            return Err(EngineError::DegenerateLeverage(format!(
                "target leverage {target} leaves no collateral for the paired leg"
            )));
        }

        numerator
            .checked_div(denominator)
            .map(BaseUnits::new)
            .ok_or(EngineError::Overflow("engage notional"))
    }

    /// Number of venue legs this model trades.
    pub fn legs(&self) -> usize {
        match self {
            Self::SingleVenue => 1,
            Self::DualVenue => 2,
        }
    }
}
