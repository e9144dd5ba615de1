//! Policy error types.

use thiserror::Error;

use crate::bounds::BoundsViolation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(BoundsViolation),
}

impl PolicyError {
    /// The violated invariant.
    pub fn violation(&self) -> BoundsViolation {
        match self {
            Self::ConfigurationInvalid(violation) => *violation,
        }
    }
}

impl From<BoundsViolation> for PolicyError {
    fn from(violation: BoundsViolation) -> Self {
        Self::ConfigurationInvalid(violation)
    }
}

pub type PolicyResult<T> = Result<T, PolicyError>;
