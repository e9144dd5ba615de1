//! Engine error types.

use levctl_policy::PolicyError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Cooldown not elapsed: {elapsed_ms}ms of {required_ms}ms")]
    CooldownNotElapsed { required_ms: u64, elapsed_ms: u64 },

    #[error("Rebalance notional is undefined for a flat position")]
    FlatPosition,

    #[error("Degenerate leverage ratio: {0}")]
    DegenerateLeverage(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

pub type EngineResult<T> = Result<T, EngineError>;
