//! Observable controller effects and operation outcomes.

use levctl_core::{BaseUnits, LeverageRatio, PrincipalId};
use levctl_engine::Chunk;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::venue::AssetPair;

/// Settings group named in `SettingsUpdated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsGroup {
    Methodology,
    Execution,
    Incentive,
    Exchange,
}

/// Event published to monitoring after each successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    Engaged {
        prev_leverage: LeverageRatio,
        new_leverage: LeverageRatio,
        chunk_notional: BaseUnits,
        total_notional: BaseUnits,
    },
    Rebalanced {
        prev_leverage: LeverageRatio,
        new_leverage: LeverageRatio,
        chunk_notional: BaseUnits,
        total_notional: BaseUnits,
    },
    RebalanceIterated {
        prev_leverage: LeverageRatio,
        new_leverage: LeverageRatio,
        twap_leverage: LeverageRatio,
        chunk_notional: BaseUnits,
        total_notional: BaseUnits,
    },
    RipcordCalled {
        prev_leverage: LeverageRatio,
        new_leverage: LeverageRatio,
        chunk_notional: BaseUnits,
        reward_paid: Decimal,
    },
    Disengaged {
        prev_leverage: LeverageRatio,
        new_leverage: LeverageRatio,
        chunk_notional: BaseUnits,
        total_notional: BaseUnits,
    },
    Reinvested {
        funding: Decimal,
        performance_fee: Decimal,
        spot_spend: Decimal,
        base_quantity: BaseUnits,
    },
    SettingsUpdated {
        group: SettingsGroup,
    },
    CallerStatusUpdated {
        caller: PrincipalId,
        allowed: bool,
    },
    AnyoneCallableUpdated {
        allowed: bool,
    },
    IncentiveFunded {
        amount: Decimal,
    },
    IncentiveWithdrawn {
        amount: Decimal,
    },
}

/// Result of engage, rebalance, iterate and disengage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    pub prev_leverage: LeverageRatio,
    pub new_leverage: LeverageRatio,
    pub chunk: Chunk,
    /// TWAP target left in place after the call (zero when none).
    pub twap_leverage_ratio: LeverageRatio,
}

impl RebalanceOutcome {
    /// Whether more chunks are pending.
    pub fn twap_pending(&self) -> bool {
        !self.twap_leverage_ratio.is_zero()
    }
}

/// Result of a ripcord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipcordOutcome {
    pub prev_leverage: LeverageRatio,
    pub new_leverage: LeverageRatio,
    pub chunk: Chunk,
    pub reward_paid: Decimal,
}

/// Result of a reinvestment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinvestOutcome {
    pub funding: Decimal,
    pub performance_fee: Decimal,
    pub spot_spend: Decimal,
    pub base_quantity: BaseUnits,
    pub new_leverage: LeverageRatio,
}

/// Next chunk a keeper would execute, with the assets per leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPreview {
    pub chunk: Chunk,
    /// Leg A (derivatives) assets.
    pub leg_a: AssetPair,
    /// Leg B (spot) assets, dual-venue only.
    pub leg_b: Option<AssetPair>,
}
