//! Settings invariants.
//!
//! Checks run in a fixed order and stop at the first violation, so the
//! reported reason always names the earliest broken field. Validation never
//! mutates anything: callers build a candidate `StrategySettings`, validate
//! it, and only then swap it in.

use std::fmt;

use levctl_core::{
    Direction, ExchangeSettings, ExecutionSettings, IncentiveSettings, LeverageRatio,
    MethodologySettings, StrategySettings,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PolicyError, PolicyResult};

/// A named settings invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundsViolation {
    /// Target leverage ratio is zero.
    TargetLeverage,
    /// Two-leg layout with a long target.
    BasisTargetLeverage,
    /// Min leverage has the wrong sign, is zero, or exceeds target in magnitude.
    MinLeverage,
    /// Max leverage has the wrong sign or is below target in magnitude.
    MaxLeverage,
    /// Recentering speed outside (0, 1].
    RecenteringSpeed,
    /// Normal slippage tolerance outside [0, 1).
    SlippageTolerance,
    /// Incentivized slippage tolerance outside [0, 1).
    IncentivizedSlippageTolerance,
    /// Incentivized leverage ratio not strictly beyond max, or wrong sign.
    IncentivizedLeverage,
    /// Rebalance interval not greater than TWAP cooldown.
    RebalanceInterval,
    /// TWAP cooldown not greater than incentivized TWAP cooldown.
    TwapCooldown,
    /// Incentivized TWAP cooldown is zero.
    IncentivizedTwapCooldown,
    /// Negative reward amount.
    RewardAmount,
    /// Performance fee outside [0, 1).
    PerformanceFee,
    /// Number of venue routes differs from the controller's leg count.
    LegCount,
    /// A venue's max trade size is zero or negative.
    TwapMaxTradeSize,
    /// A venue's max trade size exceeds its incentivized counterpart.
    IncentivizedTwapMaxTradeSize,
    /// Custom bounds would loosen the configured band.
    CustomBounds,
}

impl BoundsViolation {
    /// Stable human-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::TargetLeverage => "Target leverage ratio must not be 0",
            Self::BasisTargetLeverage => "Basis target leverage ratio must be negative",
            Self::MinLeverage => "Must be valid min leverage",
            Self::MaxLeverage => "Must be valid max leverage",
            Self::RecenteringSpeed => "Must be valid recentering speed",
            Self::SlippageTolerance => "Slippage tolerance must be <100%",
            Self::IncentivizedSlippageTolerance => "Incentivized slippage tolerance must be <100%",
            Self::IncentivizedLeverage => {
                "Incentivized leverage ratio must be > max leverage ratio"
            }
            Self::RebalanceInterval => "Rebalance interval must be greater than TWAP cooldown period",
            Self::TwapCooldown => "TWAP cooldown must be greater than incentivized TWAP cooldown",
            Self::IncentivizedTwapCooldown => "Incentivized TWAP cooldown must be > 0",
            Self::RewardAmount => "Reward amount must not be negative",
            Self::PerformanceFee => "Performance fee must be <100%",
            Self::LegCount => "Exchange settings must define one route per leg",
            Self::TwapMaxTradeSize => "Max TWAP trade size must not be 0",
            Self::IncentivizedTwapMaxTradeSize => {
                "Max TWAP trade size must not be greater than incentivized max TWAP trade size"
            }
            Self::CustomBounds => "Custom bounds must be valid",
        }
    }
}

impl fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

fn ensure(condition: bool, violation: BoundsViolation) -> PolicyResult<()> {
    if condition {
        Ok(())
    } else {
        trace!(violation = %violation, "bounds check failed");
        Err(PolicyError::ConfigurationInvalid(violation))
    }
}

/// `x` in `[0, 1)`.
fn is_fraction_below_one(x: Decimal) -> bool {
    !x.is_sign_negative() && x < Decimal::ONE
}

/// Same non-zero direction as the target.
fn agrees_with(ratio: LeverageRatio, direction: Direction) -> bool {
    ratio.direction() == Some(direction)
}

/// Validates settings against the controller's leg layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundsPolicy {
    legs: usize,
}

impl BoundsPolicy {
    /// Create a policy for a controller with `legs` venues (1 or 2).
    pub fn new(legs: usize) -> Self {
        Self { legs }
    }

    /// Validate every group plus the cross-group invariants.
    pub fn validate(&self, settings: &StrategySettings) -> PolicyResult<()> {
        self.check_methodology(&settings.methodology)?;
        self.check_execution(&settings.execution, &settings.methodology)?;
        self.check_incentive(
            &settings.incentive,
            &settings.execution,
            &settings.methodology,
        )?;
        self.check_exchange(&settings.exchange)?;
        Ok(())
    }

    /// Leverage band, recentering speed and performance fee.
    pub fn check_methodology(&self, methodology: &MethodologySettings) -> PolicyResult<()> {
        let direction = match methodology.direction() {
            Some(direction) => direction,
            None => return Err(BoundsViolation::TargetLeverage.into()),
        };
        // Paired legs size trades by 1 - target
        ensure(
            self.legs != 2 || direction == Direction::Short,
            BoundsViolation::BasisTargetLeverage,
        )?;
        let target = methodology.target_leverage_ratio.magnitude();

        ensure(
            agrees_with(methodology.min_leverage_ratio, direction)
                && methodology.min_leverage_ratio.magnitude() <= target,
            BoundsViolation::MinLeverage,
        )?;
        ensure(
            agrees_with(methodology.max_leverage_ratio, direction)
                && methodology.max_leverage_ratio.magnitude() >= target,
            BoundsViolation::MaxLeverage,
        )?;
        ensure(
            methodology.recentering_speed > Decimal::ZERO
                && methodology.recentering_speed <= Decimal::ONE,
            BoundsViolation::RecenteringSpeed,
        )?;
        ensure(
            is_fraction_below_one(methodology.performance_fee_percentage),
            BoundsViolation::PerformanceFee,
        )
    }

    /// Slippage and rebalance interval vs TWAP cooldown.
    pub fn check_execution(
        &self,
        execution: &ExecutionSettings,
        methodology: &MethodologySettings,
    ) -> PolicyResult<()> {
        ensure(
            is_fraction_below_one(execution.slippage_tolerance),
            BoundsViolation::SlippageTolerance,
        )?;
        ensure(
            methodology.rebalance_interval_ms > execution.twap_cooldown_period_ms,
            BoundsViolation::RebalanceInterval,
        )
    }

    /// Emergency threshold, cooldown ordering, slippage and reward.
    pub fn check_incentive(
        &self,
        incentive: &IncentiveSettings,
        execution: &ExecutionSettings,
        methodology: &MethodologySettings,
    ) -> PolicyResult<()> {
        ensure(
            is_fraction_below_one(incentive.incentivized_slippage_tolerance),
            BoundsViolation::IncentivizedSlippageTolerance,
        )?;

        let same_side = methodology
            .direction()
            .map(|direction| agrees_with(incentive.incentivized_leverage_ratio, direction))
            .unwrap_or(false);
        ensure(
            same_side
                && incentive.incentivized_leverage_ratio.magnitude()
                    > methodology.max_leverage_ratio.magnitude(),
            BoundsViolation::IncentivizedLeverage,
        )?;
        ensure(
            incentive.incentivized_twap_cooldown_period_ms > 0,
            BoundsViolation::IncentivizedTwapCooldown,
        )?;
        ensure(
            execution.twap_cooldown_period_ms > incentive.incentivized_twap_cooldown_period_ms,
            BoundsViolation::TwapCooldown,
        )?;
        ensure(
            !incentive.reward_amount.is_sign_negative(),
            BoundsViolation::RewardAmount,
        )
    }

    /// One route per leg, each with non-zero, ordered size limits.
    pub fn check_exchange(&self, exchange: &ExchangeSettings) -> PolicyResult<()> {
        ensure(exchange.legs.len() == self.legs, BoundsViolation::LegCount)?;
        for route in &exchange.legs {
            ensure(
                route.twap_max_trade_size > Decimal::ZERO,
                BoundsViolation::TwapMaxTradeSize,
            )?;
            ensure(
                route.twap_max_trade_size <= route.incentivized_twap_max_trade_size,
                BoundsViolation::IncentivizedTwapMaxTradeSize,
            )?;
        }
        Ok(())
    }

    /// Caller-supplied bounds may only tighten the configured band.
    ///
    /// Requires the same direction as the target, `|custom_min| >= |min|`,
    /// `|custom_max| <= |max|` and `|custom_min| <= |custom_max|`.
    pub fn check_custom_bounds(
        &self,
        methodology: &MethodologySettings,
        custom_min: LeverageRatio,
        custom_max: LeverageRatio,
    ) -> PolicyResult<()> {
        let Some(direction) = methodology.direction() else {
            return Err(BoundsViolation::CustomBounds.into());
        };
        ensure(
            agrees_with(custom_min, direction)
                && agrees_with(custom_max, direction)
                && custom_min.magnitude() >= methodology.min_leverage_ratio.magnitude()
                && custom_max.magnitude() <= methodology.max_leverage_ratio.magnitude()
                && custom_min.magnitude() <= custom_max.magnitude(),
            BoundsViolation::CustomBounds,
        )
    }
}
