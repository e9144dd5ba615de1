//! Core domain types for the leverage rebalancing controller.
//!
//! This crate provides fundamental types used throughout the controller:
//! - `LeverageRatio`, `BaseUnits`: Precision-safe signed numeric types
//! - `Direction`: Long/short bias split out of signed values
//! - `MethodologySettings`, `ExecutionSettings`, `IncentiveSettings`,
//!   `ExchangeSettings`: Strategy configuration groups
//! - `Caller`, `PrincipalId`: Who is invoking an operation and how
//! - `ActionCode`: Advisory result returned to keepers

pub mod action;
pub mod decimal;
pub mod error;
pub mod principal;
pub mod settings;

pub use action::ActionCode;
pub use decimal::{BaseUnits, Direction, LeverageRatio};
pub use error::{CoreError, Result};
pub use principal::{CallOrigin, Caller, PrincipalId};
pub use settings::{
    ExchangeSettings, ExecutionSettings, IncentiveSettings, MethodologySettings,
    StrategySettings, VenueRoute,
};
