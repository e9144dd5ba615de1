//! Position accounting seam.

use levctl_core::{BaseUnits, LeverageRatio};
use levctl_engine::current_leverage_ratio;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ControllerResult;
use crate::venue::Fill;

/// Point-in-time view of the position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Signed base balance on the derivatives venue.
    pub base_balance: BaseUnits,
    /// Derivatives account value in quote units (collateral plus unrealized PnL).
    pub account_value: Decimal,
    /// Oracle price of the base asset in quote units.
    pub base_price: Decimal,
    /// Outstanding shares of the managed position.
    pub total_supply: Decimal,
    /// Base held on the spot venue (dual-venue only).
    pub spot_balance: BaseUnits,
    /// Funding settled to the account and not yet reinvested.
    pub settled_funding: Decimal,
}

impl PositionSnapshot {
    /// Signed notional of the derivatives position.
    pub fn position_notional(&self) -> Decimal {
        self.base_balance.notional(self.base_price)
    }

    /// Current leverage ratio; zero when flat or without collateral.
    pub fn leverage_ratio(&self) -> LeverageRatio {
        current_leverage_ratio(self.position_notional(), self.account_value)
    }

    #[inline]
    pub fn has_supply(&self) -> bool {
        self.total_supply > Decimal::ZERO
    }
}

/// Position ledger.
///
/// Holds collateral and balances for every leg. Spot purchases are funded
/// from, and spot sales credited to, the derivatives account.
#[cfg_attr(test, mockall::automock)]
pub trait PositionLedger: Send + Sync {
    /// Current balances and oracle price.
    fn snapshot(&self) -> ControllerResult<PositionSnapshot>;

    /// Add collateral.
    fn deposit(&self, units: Decimal) -> ControllerResult<()>;

    /// Remove collateral.
    fn withdraw(&self, units: Decimal) -> ControllerResult<()>;

    /// Take settled funding out of the account.
    fn withdraw_funding(&self, units: Decimal) -> ControllerResult<()>;

    /// Book a derivatives fill.
    fn apply_perp_fill(&self, fill: &Fill) -> ControllerResult<()>;

    /// Book a spot fill.
    fn apply_spot_fill(&self, fill: &Fill) -> ControllerResult<()>;
}
