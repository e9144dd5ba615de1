//! Paper (simulated) collaborators.
//!
//! `PaperLedger` keeps a cash-style derivatives account: account value is
//! `cash + base_balance * price`, so a fill at the oracle price leaves the
//! account value unchanged. Spot purchases are paid out of the same cash
//! balance. `PaperVenue` fills at the ledger's oracle price (optionally with
//! a fixed price impact) and refuses fills outside the quote bound.

use std::sync::Arc;

use levctl_core::BaseUnits;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ControllerError, ControllerResult};
use crate::ledger::{PositionLedger, PositionSnapshot};
use crate::venue::{Fill, Leg, TradeInstruction, VenueAdapter};

/// Balances held by the paper ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperAccount {
    /// Quote balance of the derivatives account.
    pub cash: Decimal,
    /// Signed perp position.
    pub base_balance: BaseUnits,
    /// Base held on the spot venue.
    pub spot_balance: BaseUnits,
    /// Oracle price.
    pub base_price: Decimal,
    pub total_supply: Decimal,
    pub settled_funding: Decimal,
}

impl PaperAccount {
    /// Flat account holding `collateral`.
    pub fn funded(collateral: Decimal, base_price: Decimal, total_supply: Decimal) -> Self {
        Self {
            cash: collateral,
            base_price,
            total_supply,
            ..Self::default()
        }
    }

    /// Account with an open perp position, sized so that account value
    /// equals `account_value` at `base_price`.
    pub fn with_position(
        account_value: Decimal,
        base_balance: BaseUnits,
        base_price: Decimal,
        total_supply: Decimal,
    ) -> Self {
        Self {
            cash: account_value - base_balance.notional(base_price),
            base_balance,
            base_price,
            total_supply,
            ..Self::default()
        }
    }

    pub fn account_value(&self) -> Decimal {
        self.cash + self.base_balance.notional(self.base_price)
    }

    fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            base_balance: self.base_balance,
            account_value: self.account_value(),
            base_price: self.base_price,
            total_supply: self.total_supply,
            spot_balance: self.spot_balance,
            settled_funding: self.settled_funding,
        }
    }
}

/// Shared in-memory ledger. Clones share the same account.
#[derive(Debug, Clone, Default)]
pub struct PaperLedger {
    account: Arc<RwLock<PaperAccount>>,
}

impl PaperLedger {
    pub fn new(account: PaperAccount) -> Self {
        Self {
            account: Arc::new(RwLock::new(account)),
        }
    }

    /// Copy of the current balances.
    #[must_use]
    pub fn account(&self) -> PaperAccount {
        self.account.read().clone()
    }

    #[must_use]
    pub fn price(&self) -> Decimal {
        self.account.read().base_price
    }

    pub fn set_price(&self, price: Decimal) {
        self.account.write().base_price = price;
    }

    /// Move the oracle price by `fraction` (e.g. `0.01` = +1%).
    pub fn drift_price(&self, fraction: Decimal) {
        let mut account = self.account.write();
        account.base_price *= Decimal::ONE + fraction;
    }

    /// Settle funding to the account.
    pub fn accrue_funding(&self, amount: Decimal) {
        self.account.write().settled_funding += amount;
    }

    pub fn set_total_supply(&self, total_supply: Decimal) {
        self.account.write().total_supply = total_supply;
    }
}

impl PositionLedger for PaperLedger {
    fn snapshot(&self) -> ControllerResult<PositionSnapshot> {
        Ok(self.account.read().snapshot())
    }

    fn deposit(&self, units: Decimal) -> ControllerResult<()> {
        self.account.write().cash += units;
        Ok(())
    }

    fn withdraw(&self, units: Decimal) -> ControllerResult<()> {
        let mut account = self.account.write();
        if units > account.account_value() {
            return Err(ControllerError::Ledger(format!(
                "withdrawal {} exceeds account value {}",
                units,
                account.account_value()
            )));
        }
        account.cash -= units;
        Ok(())
    }

    fn withdraw_funding(&self, units: Decimal) -> ControllerResult<()> {
        let mut account = self.account.write();
        if units > account.settled_funding {
            return Err(ControllerError::Ledger(format!(
                "funding withdrawal {} exceeds settled {}",
                units, account.settled_funding
            )));
        }
        account.settled_funding -= units;
        Ok(())
    }

    fn apply_perp_fill(&self, fill: &Fill) -> ControllerResult<()> {
        let mut account = self.account.write();
        account.base_balance = account.base_balance + fill.base_quantity;
        account.cash += fill.quote_delta();
        trace!(base = %account.base_balance, cash = %account.cash, "perp fill booked");
        Ok(())
    }

    fn apply_spot_fill(&self, fill: &Fill) -> ControllerResult<()> {
        let mut account = self.account.write();
        account.spot_balance = account.spot_balance + fill.base_quantity;
        account.cash += fill.quote_delta();
        trace!(spot = %account.spot_balance, cash = %account.cash, "spot fill booked");
        Ok(())
    }
}

/// Simulated venue for one leg.
#[derive(Debug, Clone)]
pub struct PaperVenue {
    leg: Leg,
    ledger: PaperLedger,
    price_impact: Decimal,
}

impl PaperVenue {
    /// Perp venue filling at the oracle price.
    pub fn perp(ledger: PaperLedger) -> Self {
        Self {
            leg: Leg::Perp,
            ledger,
            price_impact: Decimal::ZERO,
        }
    }

    /// Spot venue filling at the oracle price.
    pub fn spot(ledger: PaperLedger) -> Self {
        Self {
            leg: Leg::Spot,
            ledger,
            price_impact: Decimal::ZERO,
        }
    }

    /// Fill buys above and sells below the oracle price by `impact`.
    #[must_use]
    pub fn with_price_impact(mut self, impact: Decimal) -> Self {
        self.price_impact = impact;
        self
    }
}

impl VenueAdapter for PaperVenue {
    fn execute(&self, instruction: &TradeInstruction) -> ControllerResult<Fill> {
        if instruction.leg != self.leg {
            return Err(ControllerError::Venue(format!(
                "{} venue received a {} instruction",
                self.leg, instruction.leg
            )));
        }
        let account = self.ledger.account();
        if account.base_price <= Decimal::ZERO {
            return Err(ControllerError::Venue("no oracle price".to_string()));
        }
        if self.leg == Leg::Spot
            && !instruction.is_buy()
            && instruction.base_quantity.abs() > account.spot_balance.inner()
        {
            return Err(ControllerError::Venue(format!(
                "spot sale {} exceeds balance {}",
                instruction.base_quantity, account.spot_balance
            )));
        }

        let fill_price = if instruction.is_buy() {
            account.base_price * (Decimal::ONE + self.price_impact)
        } else {
            account.base_price * (Decimal::ONE - self.price_impact)
        };
        let quote_amount = instruction.base_quantity.abs() * fill_price;
        if !instruction.accepts(quote_amount) {
            return Err(ControllerError::Venue(format!(
                "quote {} outside bound {}",
                quote_amount, instruction.quote_bound
            )));
        }

        Ok(Fill {
            base_quantity: instruction.base_quantity,
            quote_amount,
        })
    }
}
