//! Per-call trade chunking.

use levctl_core::BaseUnits;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Bound `total` to `max_trade_size`, keeping its sign.
///
/// Returns `total` unchanged when `|total| <= max_trade_size`; an exactly
/// equal magnitude completes in one step.
pub fn plan_chunk(total: BaseUnits, max_trade_size: Decimal) -> BaseUnits {
    let limit = max_trade_size.abs();
    if total.abs() <= limit {
        return total;
    }
    match total.direction() {
        Some(direction) => BaseUnits::new(direction.apply(limit)),
        None => BaseUnits::ZERO,
    }
}

/// A planned chunk together with the full gap it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Quantity to trade in this call.
    pub notional: BaseUnits,
    /// Full quantity needed to reach the target.
    pub total: BaseUnits,
}

impl Chunk {
    /// Plan a chunk of `total` against `max_trade_size`.
    pub fn plan(total: BaseUnits, max_trade_size: Decimal) -> Self {
        Self {
            notional: plan_chunk(total, max_trade_size),
            total,
        }
    }

    /// A chunk with nothing to trade.
    pub fn empty() -> Self {
        Self {
            notional: BaseUnits::ZERO,
            total: BaseUnits::ZERO,
        }
    }

    /// Whether this chunk closes the whole gap.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.notional.abs() == self.total.abs()
    }

    /// Whether more chunks are needed after this one.
    #[inline]
    pub fn continues_twap(&self) -> bool {
        !self.is_complete()
    }
}
