//! Leverage rebalancing orchestrator.
//!
//! Drives the engine against external collaborators:
//! - [`PositionLedger`]: balances, collateral and oracle price
//! - [`VenueAdapter`]: executes one bounded [`TradeInstruction`] per leg
//!
//! [`RebalanceController`] is generic over a [`LegLayout`]:
//! [`LeverageController`] trades a perp leg only, [`BasisController`] pairs it
//! with an opposite spot leg and can reinvest settled funding.
//!
//! The [`paper`] module provides in-memory collaborators for simulation and
//! tests.

pub mod controller;
pub mod error;
pub mod events;
pub mod layout;
pub mod ledger;
pub mod paper;
pub mod venue;

pub use controller::{BasisController, LeverageController, RebalanceController};
pub use error::{Authorization, ControllerError, ControllerResult, Precondition};
pub use events::{
    ChunkPreview, ControllerEvent, RebalanceOutcome, ReinvestOutcome, RipcordOutcome,
    SettingsGroup,
};
pub use layout::{LegLayout, PairedLegs, SingleLeg};
pub use ledger::{PositionLedger, PositionSnapshot};
pub use paper::{PaperAccount, PaperLedger, PaperVenue};
pub use venue::{AssetPair, Fill, Leg, TradeInstruction, VenueAdapter};
