//! Leg layouts the controller is generic over.
//!
//! A layout fixes how many venues the controller drives and which notional
//! formula applies. Everything else is shared.

use levctl_engine::NotionalModel;

use crate::venue::Leg;

/// Compile-time leg configuration.
pub trait LegLayout: Send + Sync + 'static {
    /// Notional formula for engage and rebalance.
    const MODEL: NotionalModel;
    /// Legs traded per chunk, in execution order.
    const LEGS: &'static [Leg];
    /// Whether funding can be reinvested.
    const SUPPORTS_REINVEST: bool;
    /// Label for logs.
    const NAME: &'static str;
}

/// Derivatives position only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleLeg;

impl LegLayout for SingleLeg {
    const MODEL: NotionalModel = NotionalModel::SingleVenue;
    const LEGS: &'static [Leg] = &[Leg::Perp];
    const SUPPORTS_REINVEST: bool = false;
    const NAME: &'static str = "leverage";
}

/// Derivatives position plus an opposite spot leg of equal base quantity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairedLegs;

impl LegLayout for PairedLegs {
    const MODEL: NotionalModel = NotionalModel::DualVenue;
    const LEGS: &'static [Leg] = &[Leg::Perp, Leg::Spot];
    const SUPPORTS_REINVEST: bool = true;
    const NAME: &'static str = "basis";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leg_counts_match_model() {
        assert_eq!(SingleLeg::LEGS.len(), SingleLeg::MODEL.legs());
        assert_eq!(PairedLegs::LEGS.len(), PairedLegs::MODEL.legs());
        assert_eq!(PairedLegs::LEGS[0], Leg::Perp);
    }
}
