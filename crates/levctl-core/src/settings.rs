//! Strategy settings groups.
//!
//! Settings are plain data. Invariants between fields (and across groups) are
//! enforced by `levctl-policy` whenever a group is replaced, so a value of
//! these types on its own carries no validity guarantee.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Direction, LeverageRatio};

/// How far and how fast leverage is steered back to target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodologySettings {
    /// Target leverage ratio (negative = short bias).
    pub target_leverage_ratio: LeverageRatio,
    /// Lower bound of the tolerance band (same sign as target).
    pub min_leverage_ratio: LeverageRatio,
    /// Upper bound of the tolerance band (same sign as target).
    pub max_leverage_ratio: LeverageRatio,
    /// Fraction of the gap to target closed per rebalance, in (0, 1].
    pub recentering_speed: Decimal,
    /// Minimum time between regular rebalances (ms).
    pub rebalance_interval_ms: u64,
    /// Minimum time between reinvestments (ms). Dual-venue only.
    #[serde(default = "default_reinvest_interval_ms")]
    pub reinvest_interval_ms: u64,
    /// Share of reinvested funding kept as performance fee, in [0, 1).
    /// Dual-venue only.
    #[serde(default = "default_performance_fee_percentage")]
    pub performance_fee_percentage: Decimal,
}

fn default_reinvest_interval_ms() -> u64 {
    7 * 24 * 60 * 60 * 1000 // 1 week
}

fn default_performance_fee_percentage() -> Decimal {
    dec!(0.1)
}

impl MethodologySettings {
    /// Position bias implied by the target.
    pub fn direction(&self) -> Option<Direction> {
        self.target_leverage_ratio.direction()
    }
}

impl Default for MethodologySettings {
    fn default() -> Self {
        Self {
            target_leverage_ratio: LeverageRatio::new(dec!(2)),
            min_leverage_ratio: LeverageRatio::new(dec!(1.7)),
            max_leverage_ratio: LeverageRatio::new(dec!(2.3)),
            recentering_speed: dec!(0.05),
            rebalance_interval_ms: 24 * 60 * 60 * 1000, // 1 day
            reinvest_interval_ms: default_reinvest_interval_ms(),
            performance_fee_percentage: default_performance_fee_percentage(),
        }
    }
}

/// Normal-path trade execution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Minimum time between TWAP chunks (ms).
    pub twap_cooldown_period_ms: u64,
    /// Maximum slippage for normal trades, in [0, 1).
    pub slippage_tolerance: Decimal,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            twap_cooldown_period_ms: 30 * 60 * 1000, // 30 minutes
            slippage_tolerance: dec!(0.01),
        }
    }
}

/// Emergency (ripcord) parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentiveSettings {
    /// Minimum time between ripcord chunks (ms).
    pub incentivized_twap_cooldown_period_ms: u64,
    /// Maximum slippage for ripcord trades, in [0, 1).
    pub incentivized_slippage_tolerance: Decimal,
    /// Reward paid to the ripcord caller, in reward-asset units.
    pub reward_amount: Decimal,
    /// Leverage beyond which anyone may ripcord (same sign as target).
    pub incentivized_leverage_ratio: LeverageRatio,
}

impl Default for IncentiveSettings {
    fn default() -> Self {
        Self {
            incentivized_twap_cooldown_period_ms: 60 * 1000, // 1 minute
            incentivized_slippage_tolerance: dec!(0.05),
            reward_amount: dec!(1),
            incentivized_leverage_ratio: LeverageRatio::new(dec!(2.7)),
        }
    }
}

/// Per-venue routing and trade size limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueRoute {
    /// Venue name (opaque to the controller, used in logs and instructions).
    pub name: String,
    /// Maximum base quantity per normal call.
    pub twap_max_trade_size: Decimal,
    /// Maximum base quantity per ripcord call.
    pub incentivized_twap_max_trade_size: Decimal,
}

/// Venue routing metadata for every leg.
///
/// Leg 0 is the derivatives venue, leg 1 (dual-venue only) the spot venue.
/// Both legs trade the same base quantity, so the effective limit is the
/// smallest across legs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeSettings {
    /// Base asset symbol.
    pub base_asset: String,
    /// Quote (collateral) asset symbol.
    pub quote_asset: String,
    /// One route per leg.
    pub legs: Vec<VenueRoute>,
}

impl ExchangeSettings {
    /// Effective per-call size limit for normal trades.
    pub fn twap_max_trade_size(&self) -> Decimal {
        self.legs
            .iter()
            .map(|leg| leg.twap_max_trade_size)
            .min()
            .unwrap_or(Decimal::ZERO)
    }

    /// Effective per-call size limit for ripcord trades.
    pub fn incentivized_twap_max_trade_size(&self) -> Decimal {
        self.legs
            .iter()
            .map(|leg| leg.incentivized_twap_max_trade_size)
            .min()
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            base_asset: "ETH".to_string(),
            quote_asset: "USDC".to_string(),
            legs: vec![VenueRoute {
                name: "perp".to_string(),
                twap_max_trade_size: dec!(5),
                incentivized_twap_max_trade_size: dec!(10),
            }],
        }
    }
}

/// All four settings groups, validated together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategySettings {
    #[serde(default)]
    pub methodology: MethodologySettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub incentive: IncentiveSettings,
    #[serde(default)]
    pub exchange: ExchangeSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methodology_direction_follows_target() {
        let methodology = MethodologySettings {
            target_leverage_ratio: LeverageRatio::new(dec!(-1)),
            min_leverage_ratio: LeverageRatio::new(dec!(-0.9)),
            max_leverage_ratio: LeverageRatio::new(dec!(-1.1)),
            ..MethodologySettings::default()
        };

        assert_eq!(methodology.direction(), Some(Direction::Short));
        assert_eq!(MethodologySettings::default().direction(), Some(Direction::Long));
    }

    #[test]
    fn test_exchange_effective_limit_is_min_across_legs() {
        let exchange = ExchangeSettings {
            legs: vec![
                VenueRoute {
                    name: "perp".to_string(),
                    twap_max_trade_size: dec!(5),
                    incentivized_twap_max_trade_size: dec!(10),
                },
                VenueRoute {
                    name: "spot".to_string(),
                    twap_max_trade_size: dec!(3),
                    incentivized_twap_max_trade_size: dec!(12),
                },
            ],
            ..ExchangeSettings::default()
        };

        assert_eq!(exchange.twap_max_trade_size(), dec!(3));
        assert_eq!(exchange.incentivized_twap_max_trade_size(), dec!(10));
    }

    #[test]
    fn test_settings_from_toml_uses_defaults() {
        let settings: StrategySettings = toml::from_str(
            r#"
            [methodology]
            target_leverage_ratio = "-1"
            min_leverage_ratio = "-0.9"
            max_leverage_ratio = "-1.1"
            recentering_speed = "0.05"
            rebalance_interval_ms = 86400000
            "#,
        )
        .unwrap();

        assert_eq!(settings.methodology.target_leverage_ratio.inner(), dec!(-1));
        assert_eq!(settings.methodology.performance_fee_percentage, dec!(0.1));
        assert_eq!(settings.execution, ExecutionSettings::default());
    }
}
