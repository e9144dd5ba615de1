//! Trade execution seam.
//!
//! The controller never trades itself. It builds a [`TradeInstruction`] per
//! leg and hands it to a [`VenueAdapter`], which returns the [`Fill`].

use std::fmt;

use levctl_core::{BaseUnits, Direction, ExchangeSettings};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ControllerResult;

/// Venue leg. Leg A is always the derivatives venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
    /// Perpetual (derivatives) venue.
    Perp,
    /// Spot venue, paired opposite the perp leg.
    Spot,
}

impl Leg {
    /// Position of this leg in the exchange routes.
    pub fn index(&self) -> usize {
        match self {
            Self::Perp => 0,
            Self::Spot => 1,
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perp => write!(f, "perp"),
            Self::Spot => write!(f, "spot"),
        }
    }
}

/// Asset sold and asset bought by one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPair {
    pub sell_asset: String,
    pub buy_asset: String,
}

impl AssetPair {
    /// Assets for a signed base quantity: buying base sells quote and vice
    /// versa. A zero quantity is reported as a base sale.
    pub fn for_quantity(base_quantity: BaseUnits, exchange: &ExchangeSettings) -> Self {
        match base_quantity.direction() {
            Some(Direction::Long) => Self {
                sell_asset: exchange.quote_asset.clone(),
                buy_asset: exchange.base_asset.clone(),
            },
            _ => Self {
                sell_asset: exchange.base_asset.clone(),
                buy_asset: exchange.quote_asset.clone(),
            },
        }
    }
}

/// One bounded trade on one leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInstruction {
    pub leg: Leg,
    /// Venue route name.
    pub venue: String,
    /// Signed base quantity (positive = buy base).
    pub base_quantity: BaseUnits,
    pub assets: AssetPair,
    /// Oracle price the bound was derived from.
    pub reference_price: Decimal,
    /// Buys: max quote paid. Sells: min quote received.
    pub quote_bound: Decimal,
}

impl TradeInstruction {
    /// Build an instruction for `leg`, deriving the quote bound from the
    /// oracle price and slippage tolerance.
    pub fn new(
        leg: Leg,
        exchange: &ExchangeSettings,
        base_quantity: BaseUnits,
        price: Decimal,
        slippage_tolerance: Decimal,
    ) -> Self {
        let venue = exchange
            .legs
            .get(leg.index())
            .map(|route| route.name.clone())
            .unwrap_or_else(|| leg.to_string());
        let notional = base_quantity.abs() * price;
        let quote_bound = if base_quantity.inner() > Decimal::ZERO {
            notional * (Decimal::ONE + slippage_tolerance)
        } else {
            notional * (Decimal::ONE - slippage_tolerance)
        };

        Self {
            leg,
            venue,
            base_quantity,
            assets: AssetPair::for_quantity(base_quantity, exchange),
            reference_price: price,
            quote_bound,
        }
    }

    /// Whether this instruction buys base.
    #[inline]
    pub fn is_buy(&self) -> bool {
        self.base_quantity.inner() > Decimal::ZERO
    }

    /// Whether a fill for `quote_amount` respects the bound.
    pub fn accepts(&self, quote_amount: Decimal) -> bool {
        if self.is_buy() {
            quote_amount <= self.quote_bound
        } else {
            quote_amount >= self.quote_bound
        }
    }
}

/// Executed trade reported by a venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    /// Signed base quantity filled.
    pub base_quantity: BaseUnits,
    /// Quote paid (buys) or received (sells), unsigned.
    pub quote_amount: Decimal,
}

impl Fill {
    /// Quote balance change implied by this fill (negative when paying).
    pub fn quote_delta(&self) -> Decimal {
        match self.base_quantity.direction() {
            Some(Direction::Long) => -self.quote_amount,
            Some(Direction::Short) => self.quote_amount,
            None => Decimal::ZERO,
        }
    }
}

/// Trade execution venue.
///
/// Implementations must either fill the whole instruction within its quote
/// bound or return an error without filling.
#[cfg_attr(test, mockall::automock)]
pub trait VenueAdapter: Send + Sync {
    /// Execute one instruction.
    fn execute(&self, instruction: &TradeInstruction) -> ControllerResult<Fill>;
}
