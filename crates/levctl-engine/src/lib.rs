//! Decision engine for the leverage rebalancing controller.
//!
//! Pure, in-memory building blocks. Nothing here talks to a venue or ledger.
//!
//! # Key Components
//!
//! - [`leverage_math`]: current leverage, recentered next leverage, and total
//!   rebalance notional per [`NotionalModel`]
//! - [`plan_chunk`] / [`Chunk`]: bound a total trade to the per-call limit
//! - [`RebalanceStateMachine`]: TWAP marker, cooldown timestamps and the
//!   advisory evaluation (`NONE` / `REBALANCE` / `ITERATE_TWAP` / `RIPCORD` /
//!   `REINVEST`)
//! - [`IncentiveController`]: ripcord reward pool and incentivized cooldown

pub mod chunk;
pub mod error;
pub mod incentive;
pub mod leverage_math;
pub mod state_machine;

pub use chunk::{plan_chunk, Chunk};
pub use error::{EngineError, EngineResult};
pub use incentive::{current_reward, IncentiveController};
pub use leverage_math::{current_leverage_ratio, next_leverage_ratio, NotionalModel};
pub use state_machine::{
    is_advantageous_move, ControllerState, LeverageBand, RebalancePhase, RebalanceStateMachine,
};
