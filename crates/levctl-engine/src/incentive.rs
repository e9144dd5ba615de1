//! Ripcord incentive accounting.
//!
//! The reward pool is a single shared balance. A payout reads the pool and
//! decrements it in one call, and never pays more than is held.

use levctl_core::IncentiveSettings;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::state_machine::RebalanceStateMachine;

/// Reward actually payable: `min(balance, configured)`, never negative.
pub fn current_reward(balance: Decimal, configured: Decimal) -> Decimal {
    balance.min(configured).max(Decimal::ZERO)
}

/// Reward pool plus the incentivized cooldown guard.
#[derive(Debug, Clone, Default)]
pub struct IncentiveController {
    /// Reward asset held for ripcord callers.
    balance: Decimal,
}

impl IncentiveController {
    /// Create a pool holding `balance`.
    pub fn new(balance: Decimal) -> Self {
        Self {
            balance: balance.max(Decimal::ZERO),
        }
    }

    /// Current pool balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Reward the next ripcord caller would receive.
    pub fn current_reward(&self, settings: &IncentiveSettings) -> Decimal {
        current_reward(self.balance, settings.reward_amount)
    }

    /// Add funds to the pool.
    pub fn fund(&mut self, amount: Decimal) -> EngineResult<()> {
        if amount <= Decimal::ZERO {
            return Err(EngineError::InvalidAmount(format!(
                "incentive funding must be positive, got {amount}"
            )));
        }
        self.balance += amount;
        debug!(amount = %amount, balance = %self.balance, "incentive pool funded");
        Ok(())
    }

    /// Fail unless the incentivized cooldown has elapsed since the last trade.
    pub fn ensure_cooldown(
        &self,
        machine: &RebalanceStateMachine,
        now_ms: u64,
        settings: &IncentiveSettings,
    ) -> EngineResult<()> {
        machine.ensure_trade_cooldown(now_ms, settings.incentivized_twap_cooldown_period_ms)
    }

    /// Pay the ripcord reward. Returns the amount actually paid.
    pub fn pay(&mut self, settings: &IncentiveSettings) -> Decimal {
        let reward = self.current_reward(settings);
        self.balance -= reward;
        if reward < settings.reward_amount {
            info!(
                paid = %reward,
                configured = %settings.reward_amount,
                "incentive pool depleted, partial reward paid"
            );
        }
        reward
    }

    /// Drain the pool. Returns the amount withdrawn.
    pub fn withdraw_all(&mut self) -> Decimal {
        std::mem::take(&mut self.balance)
    }
}
