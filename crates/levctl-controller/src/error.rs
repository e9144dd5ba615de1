//! Controller error types.
//!
//! Every rejection falls into one of four caller-facing kinds
//! (configuration, precondition, authorization, cooldown) plus collaborator
//! failures. Rejections are raised before any state is touched.

use std::fmt;

use levctl_engine::EngineError;
use levctl_policy::{BoundsViolation, PolicyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operation invoked outside its valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Precondition {
    NoSupply,
    AlreadyEngaged,
    NotEngaged,
    NoCollateral,
    TwapInProgress,
    NotInTwap,
    AboveIncentivizedLeverage,
    BelowIncentivizedLeverage,
    NothingToReinvest,
    NonPositiveAmount,
    InsufficientCollateral,
    WithdrawalExceedsMaxLeverage,
    ArrayLengthMismatch,
}

impl Precondition {
    /// Stable human-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NoSupply => "Total supply must be > 0",
            Self::AlreadyEngaged => "Base position must be zero to engage",
            Self::NotEngaged => "Current leverage ratio must NOT be 0",
            Self::NoCollateral => "Collateral balance must be > 0",
            Self::TwapInProgress => "Rebalance is currently in TWAP",
            Self::NotInTwap => "Not in TWAP state",
            Self::AboveIncentivizedLeverage => "Must be below incentivized leverage ratio",
            Self::BelowIncentivizedLeverage => "Must be above incentivized leverage ratio",
            Self::NothingToReinvest => "Settled funding must be > 0",
            Self::NonPositiveAmount => "Amount must be > 0",
            Self::InsufficientCollateral => "Withdrawal exceeds account value",
            Self::WithdrawalExceedsMaxLeverage => {
                "Withdrawal must not push leverage beyond max leverage ratio"
            }
            Self::ArrayLengthMismatch => "Array length mismatch",
        }
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Caller not permitted to invoke an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Authorization {
    NotOwner,
    NotAllowedCaller,
    RelayedCaller,
}

impl Authorization {
    /// Stable human-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotOwner => "Must be owner",
            Self::NotAllowedCaller => "Address not permitted to call",
            Self::RelayedCaller => "Caller must be a direct principal",
        }
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(BoundsViolation),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(Precondition),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(Authorization),

    #[error("Cooldown not elapsed: {elapsed_ms}ms of {required_ms}ms")]
    CooldownNotElapsed { required_ms: u64, elapsed_ms: u64 },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Venue error: {0}")]
    Venue(String),

    #[error("Computation failed: {0}")]
    Computation(EngineError),
}

impl ControllerError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigurationInvalid(_) => "configuration",
            Self::PreconditionFailed(_) => "precondition",
            Self::AuthorizationFailed(_) => "authorization",
            Self::CooldownNotElapsed { .. } => "cooldown",
            Self::Ledger(_) => "ledger",
            Self::Venue(_) => "venue",
            Self::Computation(_) => "computation",
        }
    }
}

impl From<EngineError> for ControllerError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CooldownNotElapsed {
                required_ms,
                elapsed_ms,
            } => Self::CooldownNotElapsed {
                required_ms,
                elapsed_ms,
            },
            EngineError::Policy(policy) => Self::ConfigurationInvalid(policy.violation()),
            EngineError::FlatPosition => Self::PreconditionFailed(Precondition::NotEngaged),
            EngineError::InvalidAmount(_) => {
                Self::PreconditionFailed(Precondition::NonPositiveAmount)
            }
            other => Self::Computation(other),
        }
    }
}

impl From<PolicyError> for ControllerError {
    fn from(err: PolicyError) -> Self {
        Self::ConfigurationInvalid(err.violation())
    }
}

impl From<Precondition> for ControllerError {
    fn from(precondition: Precondition) -> Self {
        Self::PreconditionFailed(precondition)
    }
}

impl From<Authorization> for ControllerError {
    fn from(authorization: Authorization) -> Self {
        Self::AuthorizationFailed(authorization)
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
