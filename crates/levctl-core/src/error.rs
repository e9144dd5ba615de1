//! Error types for levctl-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid leverage ratio: {0}")]
    InvalidLeverage(String),

    #[error("Invalid action code: {0}")]
    InvalidActionCode(u8),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
