//! Advisory action codes returned to keepers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// What the keeper should call next.
///
/// Numeric values are stable and part of the external interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ActionCode {
    #[default]
    None = 0,
    Rebalance = 1,
    IterateTwap = 2,
    Ripcord = 3,
    Reinvest = 4,
}

impl ActionCode {
    #[inline]
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Whether the keeper has anything to do.
    #[inline]
    pub fn is_actionable(&self) -> bool {
        *self != Self::None
    }

    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rebalance => "rebalance",
            Self::IterateTwap => "iterate_twap",
            Self::Ripcord => "ripcord",
            Self::Reinvest => "reinvest",
        }
    }
}

impl TryFrom<u8> for ActionCode {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Rebalance),
            2 => Ok(Self::IterateTwap),
            3 => Ok(Self::Ripcord),
            4 => Ok(Self::Reinvest),
            other => Err(CoreError::InvalidActionCode(other)),
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_code_values_are_stable() {
        assert_eq!(ActionCode::None.as_u8(), 0);
        assert_eq!(ActionCode::Rebalance.as_u8(), 1);
        assert_eq!(ActionCode::IterateTwap.as_u8(), 2);
        assert_eq!(ActionCode::Ripcord.as_u8(), 3);
        assert_eq!(ActionCode::Reinvest.as_u8(), 4);
    }

    #[test]
    fn test_action_code_try_from() {
        assert_eq!(ActionCode::try_from(3).unwrap(), ActionCode::Ripcord);
        assert!(matches!(
            ActionCode::try_from(9),
            Err(CoreError::InvalidActionCode(9))
        ));
    }
}
