//! Keeper for the leverage rebalancing controller.
//!
//! Loads configuration, builds a controller over paper collaborators and
//! drives it from the advisory action code on a polling loop.

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, RunSummary};
pub use config::{AppConfig, StrategyVariant};
pub use error::{AppError, AppResult};
