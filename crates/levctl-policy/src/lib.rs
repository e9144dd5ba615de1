//! Bounds policy for leverage controller settings.
//!
//! Every settings mutation is validated here before it is applied.
//! Checks, in evaluation order:
//! - Methodology: sign agreement, |min| <= |target| <= |max|, recentering speed
//! - Execution: slippage < 100%, rebalance interval > TWAP cooldown
//! - Incentive: incentivized leverage beyond max, cooldown ordering, slippage
//! - Exchange: one route per leg, non-zero sizes, normal <= incentivized
//!
//! Also validates caller-supplied custom bounds (tighten only).

pub mod bounds;
pub mod error;

pub use bounds::{BoundsPolicy, BoundsViolation};
pub use error::{PolicyError, PolicyResult};
