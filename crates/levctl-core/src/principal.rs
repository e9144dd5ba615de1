//! Caller identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque principal identifier (account, key, or operator name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a call reached the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallOrigin {
    /// Submitted directly by the principal.
    Direct,
    /// Forwarded by an intermediary inside a larger batch or transaction.
    /// Such a caller could move the price and trigger the emergency path in
    /// the same atomic unit, so direct-only operations reject it.
    Relayed,
}

/// Principal plus call origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub id: PrincipalId,
    pub origin: CallOrigin,
}

impl Caller {
    pub fn direct(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
            origin: CallOrigin::Direct,
        }
    }

    pub fn relayed(id: impl Into<String>) -> Self {
        Self {
            id: PrincipalId::new(id),
            origin: CallOrigin::Relayed,
        }
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.origin == CallOrigin::Direct
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            CallOrigin::Direct => write!(f, "{}", self.id),
            CallOrigin::Relayed => write!(f, "{} (relayed)", self.id),
        }
    }
}
