//! Rebalance orchestrator.
//!
//! `RebalanceController` ties the engine together and drives the
//! collaborators. Each state-mutating operation follows the same order:
//!
//! 1. Authorization and precondition checks (nothing mutated yet)
//! 2. Chunk computation from a fresh ledger snapshot
//! 3. Venue execution and ledger booking
//! 4. State machine update (timestamps, TWAP marker) as the final effect
//!
//! A rejected operation therefore leaves every field untouched. A venue
//! failure after leg A filled can leave the legs unbalanced; the timestamps
//! are not advanced in that case and the next call recomputes from the
//! ledger.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use levctl_core::{
    ActionCode, BaseUnits, Caller, ExchangeSettings, ExecutionSettings, IncentiveSettings,
    LeverageRatio, MethodologySettings, PrincipalId, StrategySettings,
};
use levctl_engine::{
    is_advantageous_move, next_leverage_ratio, Chunk, ControllerState, EngineError,
    IncentiveController, RebalancePhase, RebalanceStateMachine,
};
use levctl_policy::{BoundsPolicy, BoundsViolation};
use levctl_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Authorization, ControllerError, ControllerResult, Precondition};
use crate::events::{
    ChunkPreview, ControllerEvent, RebalanceOutcome, ReinvestOutcome, RipcordOutcome,
    SettingsGroup,
};
use crate::layout::{LegLayout, PairedLegs, SingleLeg};
use crate::ledger::{PositionLedger, PositionSnapshot};
use crate::venue::{AssetPair, Leg, TradeInstruction, VenueAdapter};

/// Single-venue leverage controller.
pub type LeverageController = RebalanceController<SingleLeg>;

/// Dual-venue basis controller.
pub type BasisController = RebalanceController<PairedLegs>;

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn ensure_supply(snapshot: &PositionSnapshot) -> ControllerResult<()> {
    if snapshot.has_supply() {
        Ok(())
    } else {
        Err(Precondition::NoSupply.into())
    }
}

fn ensure_positive(amount: Decimal) -> ControllerResult<()> {
    if amount > Decimal::ZERO {
        Ok(())
    } else {
        Err(Precondition::NonPositiveAmount.into())
    }
}

/// Leverage of an engaged position, rejecting a flat one.
fn engaged_leverage(snapshot: &PositionSnapshot) -> ControllerResult<LeverageRatio> {
    let current = snapshot.leverage_ratio();
    if current.is_zero() {
        Err(Precondition::NotEngaged.into())
    } else {
        Ok(current)
    }
}

/// Leverage rebalancing controller, generic over its leg layout.
pub struct RebalanceController<L: LegLayout> {
    owner: PrincipalId,
    settings: StrategySettings,
    policy: BoundsPolicy,
    machine: RebalanceStateMachine,
    incentive: IncentiveController,
    authorized_callers: HashSet<PrincipalId>,
    anyone_callable: bool,
    accrued_performance_fees: Decimal,
    ledger: Arc<dyn PositionLedger>,
    venues: Vec<Arc<dyn VenueAdapter>>,
    events: Option<mpsc::UnboundedSender<ControllerEvent>>,
    _layout: PhantomData<L>,
}

impl<L: LegLayout> RebalanceController<L> {
    /// Create a controller.
    ///
    /// `venues` must hold one adapter per leg, in leg order. Settings are
    /// validated before anything is constructed.
    pub fn new(
        owner: PrincipalId,
        settings: StrategySettings,
        ledger: Arc<dyn PositionLedger>,
        venues: Vec<Arc<dyn VenueAdapter>>,
    ) -> ControllerResult<Self> {
        let policy = BoundsPolicy::new(L::LEGS.len());
        policy.validate(&settings)?;
        if venues.len() != L::LEGS.len() {
            return Err(ControllerError::ConfigurationInvalid(BoundsViolation::LegCount));
        }

        info!(
            layout = L::NAME,
            owner = %owner,
            target = %settings.methodology.target_leverage_ratio,
            "Controller created"
        );

        Ok(Self {
            owner,
            settings,
            policy,
            machine: RebalanceStateMachine::new(),
            incentive: IncentiveController::default(),
            authorized_callers: HashSet::new(),
            anyone_callable: false,
            accrued_performance_fees: Decimal::ZERO,
            ledger,
            venues,
            events: None,
            _layout: PhantomData,
        })
    }

    /// Publish events to `sink` after every successful mutation.
    #[must_use]
    pub fn with_event_sink(mut self, sink: mpsc::UnboundedSender<ControllerEvent>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Resume from persisted state.
    #[must_use]
    pub fn with_state(mut self, state: ControllerState) -> Self {
        self.machine = RebalanceStateMachine::from_state(state);
        self
    }

    // =========================================================================
    // Trade operations
    // =========================================================================

    /// Open the position at target leverage from flat. Owner only.
    pub fn engage(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        let result = self.try_engage(caller, now_ms);
        self.finish("engage", result)
    }

    fn try_engage(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        self.ensure_owner(caller)?;
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;
        if !snapshot.base_balance.is_zero() {
            return Err(Precondition::AlreadyEngaged.into());
        }
        if snapshot.account_value <= Decimal::ZERO {
            return Err(Precondition::NoCollateral.into());
        }

        let target = self.settings.methodology.target_leverage_ratio;
        let total =
            L::MODEL.engage_notional(snapshot.account_value, snapshot.base_price, target)?;
        let chunk = Chunk::plan(total, self.settings.exchange.twap_max_trade_size());

        self.execute_chunk(
            chunk.notional,
            snapshot.base_price,
            self.settings.execution.slippage_tolerance,
        )?;
        let new_leverage = self.ledger.snapshot()?.leverage_ratio();
        self.machine.record_rebalance(now_ms, &chunk, target);

        info!(
            new_leverage = %new_leverage,
            chunk = %chunk.notional,
            total = %chunk.total,
            twap = chunk.continues_twap(),
            "Engaged"
        );
        self.publish(ControllerEvent::Engaged {
            prev_leverage: LeverageRatio::ZERO,
            new_leverage,
            chunk_notional: chunk.notional,
            total_notional: chunk.total,
        });
        Ok(self.outcome(LeverageRatio::ZERO, new_leverage, chunk))
    }

    /// One recentering step toward target. Allowed callers only.
    pub fn rebalance(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        let result = self.try_rebalance(caller, now_ms);
        self.finish("rebalance", result)
    }

    fn try_rebalance(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        self.ensure_allowed_caller(caller)?;
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;
        let current = engaged_leverage(&snapshot)?;
        self.ensure_no_twap()?;
        self.ensure_below_incentivized(current)?;
        self.machine
            .ensure_trade_cooldown(now_ms, self.settings.methodology.rebalance_interval_ms)?;

        let next = next_leverage_ratio(current, &self.settings.methodology);
        let total = L::MODEL.rebalance_notional(snapshot.base_balance, current, next)?;
        let chunk = Chunk::plan(total, self.settings.exchange.twap_max_trade_size());

        self.execute_chunk(
            chunk.notional,
            snapshot.base_price,
            self.settings.execution.slippage_tolerance,
        )?;
        let new_leverage = self.ledger.snapshot()?.leverage_ratio();
        self.machine.record_rebalance(now_ms, &chunk, next);

        info!(
            prev_leverage = %current,
            next_leverage = %next,
            new_leverage = %new_leverage,
            chunk = %chunk.notional,
            total = %chunk.total,
            twap = chunk.continues_twap(),
            "Rebalanced"
        );
        self.publish(ControllerEvent::Rebalanced {
            prev_leverage: current,
            new_leverage,
            chunk_notional: chunk.notional,
            total_notional: chunk.total,
        });
        Ok(self.outcome(current, new_leverage, chunk))
    }

    /// Continue an in-progress TWAP. Allowed callers only.
    ///
    /// The gap is recomputed toward the stored TWAP target on every call, not
    /// the target recentered from the current leverage. If price already
    /// carried leverage past the TWAP target, the TWAP ends without trading.
    pub fn iterate_rebalance(
        &mut self,
        caller: &Caller,
        now_ms: u64,
    ) -> ControllerResult<RebalanceOutcome> {
        let result = self.try_iterate(caller, now_ms);
        self.finish("iterate", result)
    }

    fn try_iterate(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        self.ensure_allowed_caller(caller)?;
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;
        let current = engaged_leverage(&snapshot)?;
        if !self.machine.is_twap_active() {
            return Err(Precondition::NotInTwap.into());
        }
        self.ensure_below_incentivized(current)?;
        self.machine
            .ensure_trade_cooldown(now_ms, self.settings.execution.twap_cooldown_period_ms)?;

        let twap = self.machine.twap_leverage_ratio();
        let target = self.settings.methodology.target_leverage_ratio;
        let chunk = if is_advantageous_move(current, twap, target) {
            debug!(current = %current, twap = %twap, "Advantageous move, TWAP ends without trade");
            Chunk::empty()
        } else {
            let total = L::MODEL.rebalance_notional(snapshot.base_balance, current, twap)?;
            Chunk::plan(total, self.settings.exchange.twap_max_trade_size())
        };

        let new_leverage = if chunk.notional.is_zero() {
            current
        } else {
            self.execute_chunk(
                chunk.notional,
                snapshot.base_price,
                self.settings.execution.slippage_tolerance,
            )?;
            self.ledger.snapshot()?.leverage_ratio()
        };
        self.machine.record_iteration(now_ms, &chunk);

        info!(
            prev_leverage = %current,
            twap_leverage = %twap,
            new_leverage = %new_leverage,
            chunk = %chunk.notional,
            total = %chunk.total,
            complete = chunk.is_complete(),
            "TWAP iterated"
        );
        self.publish(ControllerEvent::RebalanceIterated {
            prev_leverage: current,
            new_leverage,
            twap_leverage: twap,
            chunk_notional: chunk.notional,
            total_notional: chunk.total,
        });
        Ok(self.outcome(current, new_leverage, chunk))
    }

    /// Emergency deleverage toward max leverage. Any direct caller; pays the
    /// ripcord reward.
    pub fn ripcord(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RipcordOutcome> {
        let result = self.try_ripcord(caller, now_ms);
        self.finish("ripcord", result)
    }

    fn try_ripcord(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RipcordOutcome> {
        if !caller.is_direct() {
            return Err(Authorization::RelayedCaller.into());
        }
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;
        // Cooldown before the breach check: a second call in the same instant
        // must fail on the cooldown even if the first call cured the breach.
        self.incentive
            .ensure_cooldown(&self.machine, now_ms, &self.settings.incentive)?;

        let current = snapshot.leverage_ratio();
        if current.magnitude()
            <= self.settings.incentive.incentivized_leverage_ratio.magnitude()
        {
            return Err(Precondition::BelowIncentivizedLeverage.into());
        }

        let target = self.settings.methodology.max_leverage_ratio;
        let total = L::MODEL.rebalance_notional(snapshot.base_balance, current, target)?;
        let chunk = Chunk::plan(
            total,
            self.settings.exchange.incentivized_twap_max_trade_size(),
        );

        self.execute_chunk(
            chunk.notional,
            snapshot.base_price,
            self.settings.incentive.incentivized_slippage_tolerance,
        )?;
        let new_leverage = self.ledger.snapshot()?.leverage_ratio();
        let reward_paid = self.incentive.pay(&self.settings.incentive);
        Metrics::ripcord_reward(to_f64(reward_paid));
        self.machine.record_ripcord(now_ms);

        warn!(
            caller = %caller,
            prev_leverage = %current,
            new_leverage = %new_leverage,
            chunk = %chunk.notional,
            total = %chunk.total,
            reward = %reward_paid,
            "Ripcord called"
        );
        self.publish(ControllerEvent::RipcordCalled {
            prev_leverage: current,
            new_leverage,
            chunk_notional: chunk.notional,
            reward_paid,
        });
        Metrics::leverage_ratio(to_f64(new_leverage.inner()));
        Ok(RipcordOutcome {
            prev_leverage: current,
            new_leverage,
            chunk,
            reward_paid,
        })
    }

    /// Unwind toward flat, one chunk per call. Owner only.
    ///
    /// Any in-progress TWAP target is abandoned.
    pub fn disengage(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        let result = self.try_disengage(caller, now_ms);
        self.finish("disengage", result)
    }

    fn try_disengage(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<RebalanceOutcome> {
        self.ensure_owner(caller)?;
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;
        let current = engaged_leverage(&snapshot)?;

        let chunk = Chunk::plan(
            -snapshot.base_balance,
            self.settings.exchange.twap_max_trade_size(),
        );
        self.execute_chunk(
            chunk.notional,
            snapshot.base_price,
            self.settings.execution.slippage_tolerance,
        )?;
        let new_leverage = self.ledger.snapshot()?.leverage_ratio();
        self.machine.record_disengage(now_ms);

        info!(
            prev_leverage = %current,
            new_leverage = %new_leverage,
            chunk = %chunk.notional,
            remaining = %(chunk.total - chunk.notional),
            "Disengaged"
        );
        self.publish(ControllerEvent::Disengaged {
            prev_leverage: current,
            new_leverage,
            chunk_notional: chunk.notional,
            total_notional: chunk.total,
        });
        Ok(self.outcome(current, new_leverage, chunk))
    }

    // =========================================================================
    // Collateral
    // =========================================================================

    /// Add collateral. Owner only, not during a TWAP.
    pub fn deposit(&mut self, caller: &Caller, units: Decimal) -> ControllerResult<LeverageRatio> {
        let result = self.try_deposit(caller, units);
        self.finish("deposit", result)
    }

    fn try_deposit(&mut self, caller: &Caller, units: Decimal) -> ControllerResult<LeverageRatio> {
        self.ensure_owner(caller)?;
        self.ensure_no_twap()?;
        ensure_positive(units)?;
        ensure_supply(&self.ledger.snapshot()?)?;

        self.ledger.deposit(units)?;
        let leverage = self.ledger.snapshot()?.leverage_ratio();
        info!(units = %units, leverage = %leverage, "Collateral deposited");
        Ok(leverage)
    }

    /// Remove collateral. Owner only, not during a TWAP.
    ///
    /// Rejected if the withdrawal would push an engaged position beyond max
    /// leverage.
    pub fn withdraw(&mut self, caller: &Caller, units: Decimal) -> ControllerResult<LeverageRatio> {
        let result = self.try_withdraw(caller, units);
        self.finish("withdraw", result)
    }

    fn try_withdraw(&mut self, caller: &Caller, units: Decimal) -> ControllerResult<LeverageRatio> {
        self.ensure_owner(caller)?;
        self.ensure_no_twap()?;
        ensure_positive(units)?;
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;

        let remaining = snapshot.account_value - units;
        if remaining.is_sign_negative() {
            return Err(Precondition::InsufficientCollateral.into());
        }
        if !snapshot.base_balance.is_zero() {
            if remaining.is_zero() {
                return Err(Precondition::InsufficientCollateral.into());
            }
            let after = levctl_engine::current_leverage_ratio(snapshot.position_notional(), remaining);
            if after.magnitude() > self.settings.methodology.max_leverage_ratio.magnitude() {
                return Err(Precondition::WithdrawalExceedsMaxLeverage.into());
            }
        }

        self.ledger.withdraw(units)?;
        let leverage = self.ledger.snapshot()?.leverage_ratio();
        info!(units = %units, leverage = %leverage, "Collateral withdrawn");
        Ok(leverage)
    }

    // =========================================================================
    // Advisory
    // =========================================================================

    /// Action a keeper should take now.
    pub fn should_rebalance(&self, now_ms: u64) -> ControllerResult<ActionCode> {
        let snapshot = self.ledger.snapshot()?;
        if !snapshot.has_supply() {
            return Ok(ActionCode::None);
        }
        let current = snapshot.leverage_ratio();
        Metrics::leverage_ratio(to_f64(current.inner()));
        Ok(self.machine.evaluate(
            now_ms,
            current,
            &self.settings,
            Self::reinvest_enabled(&snapshot),
        ))
    }

    /// Same as [`Self::should_rebalance`] with a tighter band.
    ///
    /// Bounds that loosen the configured band are rejected.
    pub fn should_rebalance_with_bounds(
        &self,
        now_ms: u64,
        custom_min: LeverageRatio,
        custom_max: LeverageRatio,
    ) -> ControllerResult<ActionCode> {
        let snapshot = self.ledger.snapshot()?;
        let current = snapshot.leverage_ratio();
        let action = self.machine.evaluate_with_bounds(
            now_ms,
            current,
            &self.settings,
            &self.policy,
            custom_min,
            custom_max,
            Self::reinvest_enabled(&snapshot),
        )?;
        if snapshot.has_supply() {
            Ok(action)
        } else {
            Ok(ActionCode::None)
        }
    }

    /// Chunk the next trade operation would execute, with its assets per leg.
    ///
    /// Mirrors the target selection of the operations: max leverage beyond
    /// the incentivized ratio, the TWAP target mid-TWAP, otherwise the
    /// recentered leverage.
    pub fn get_chunk_rebalance_notional(&self) -> ControllerResult<ChunkPreview> {
        let snapshot = self.ledger.snapshot()?;
        let current = engaged_leverage(&snapshot)?;

        let exchange = &self.settings.exchange;
        let (target, max_trade_size) = if current.magnitude()
            > self.settings.incentive.incentivized_leverage_ratio.magnitude()
        {
            (
                self.settings.methodology.max_leverage_ratio,
                exchange.incentivized_twap_max_trade_size(),
            )
        } else if self.machine.is_twap_active() {
            (self.machine.twap_leverage_ratio(), exchange.twap_max_trade_size())
        } else {
            (
                next_leverage_ratio(current, &self.settings.methodology),
                exchange.twap_max_trade_size(),
            )
        };

        let total = L::MODEL.rebalance_notional(snapshot.base_balance, current, target)?;
        let chunk = Chunk::plan(total, max_trade_size);
        let leg_b = L::LEGS
            .contains(&Leg::Spot)
            .then(|| AssetPair::for_quantity(-chunk.notional, exchange));

        Ok(ChunkPreview {
            chunk,
            leg_a: AssetPair::for_quantity(chunk.notional, exchange),
            leg_b,
        })
    }

    /// Current leverage ratio; zero when flat.
    pub fn get_current_leverage_ratio(&self) -> ControllerResult<LeverageRatio> {
        Ok(self.ledger.snapshot()?.leverage_ratio())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    #[must_use]
    pub fn methodology(&self) -> &MethodologySettings {
        &self.settings.methodology
    }

    #[must_use]
    pub fn execution(&self) -> &ExecutionSettings {
        &self.settings.execution
    }

    #[must_use]
    pub fn incentive(&self) -> &IncentiveSettings {
        &self.settings.incentive
    }

    #[must_use]
    pub fn exchange_settings(&self) -> &ExchangeSettings {
        &self.settings.exchange
    }

    #[must_use]
    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    #[must_use]
    pub fn state(&self) -> &ControllerState {
        self.machine.state()
    }

    #[must_use]
    pub fn twap_leverage_ratio(&self) -> LeverageRatio {
        self.machine.twap_leverage_ratio()
    }

    /// Phase for the current ledger state.
    pub fn phase(&self) -> ControllerResult<RebalancePhase> {
        Ok(self.machine.phase(self.get_current_leverage_ratio()?))
    }

    #[must_use]
    pub fn owner(&self) -> &PrincipalId {
        &self.owner
    }

    /// Whether `id` may call rebalance, iterate and reinvest.
    #[must_use]
    pub fn is_allowed_caller(&self, id: &PrincipalId) -> bool {
        self.anyone_callable || self.authorized_callers.contains(id)
    }

    #[must_use]
    pub fn anyone_callable(&self) -> bool {
        self.anyone_callable
    }

    /// Reward pool balance.
    #[must_use]
    pub fn incentive_balance(&self) -> Decimal {
        self.incentive.balance()
    }

    /// Reward the next ripcord caller would receive.
    #[must_use]
    pub fn get_current_incentive_reward(&self) -> Decimal {
        self.incentive.current_reward(&self.settings.incentive)
    }

    /// Performance fees taken from reinvested funding and not yet withdrawn.
    #[must_use]
    pub fn accrued_performance_fees(&self) -> Decimal {
        self.accrued_performance_fees
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn set_methodology_settings(
        &mut self,
        caller: &Caller,
        methodology: MethodologySettings,
    ) -> ControllerResult<()> {
        let result = self.update_settings(caller, SettingsGroup::Methodology, |settings| {
            settings.methodology = methodology
        });
        self.finish("set_methodology_settings", result)
    }

    pub fn set_execution_settings(
        &mut self,
        caller: &Caller,
        execution: ExecutionSettings,
    ) -> ControllerResult<()> {
        let result = self.update_settings(caller, SettingsGroup::Execution, |settings| {
            settings.execution = execution
        });
        self.finish("set_execution_settings", result)
    }

    pub fn set_incentive_settings(
        &mut self,
        caller: &Caller,
        incentive: IncentiveSettings,
    ) -> ControllerResult<()> {
        let result = self.update_settings(caller, SettingsGroup::Incentive, |settings| {
            settings.incentive = incentive
        });
        self.finish("set_incentive_settings", result)
    }

    pub fn set_exchange_settings(
        &mut self,
        caller: &Caller,
        exchange: ExchangeSettings,
    ) -> ControllerResult<()> {
        let result = self.update_settings(caller, SettingsGroup::Exchange, |settings| {
            settings.exchange = exchange
        });
        self.finish("set_exchange_settings", result)
    }

    /// Validate the whole candidate, then swap it in.
    fn update_settings(
        &mut self,
        caller: &Caller,
        group: SettingsGroup,
        apply: impl FnOnce(&mut StrategySettings),
    ) -> ControllerResult<()> {
        self.ensure_owner(caller)?;
        self.ensure_no_twap()?;

        let mut candidate = self.settings.clone();
        apply(&mut candidate);
        self.policy.validate(&candidate)?;
        self.settings = candidate;

        info!(group = ?group, "Settings updated");
        self.publish(ControllerEvent::SettingsUpdated { group });
        Ok(())
    }

    /// Grant or revoke callers. `statuses[i]` applies to `callers[i]`.
    pub fn update_authorized_callers(
        &mut self,
        caller: &Caller,
        callers: &[PrincipalId],
        statuses: &[bool],
    ) -> ControllerResult<()> {
        let result = self.try_update_authorized_callers(caller, callers, statuses);
        self.finish("update_authorized_callers", result)
    }

    fn try_update_authorized_callers(
        &mut self,
        caller: &Caller,
        callers: &[PrincipalId],
        statuses: &[bool],
    ) -> ControllerResult<()> {
        self.ensure_owner(caller)?;
        self.ensure_no_twap()?;
        if callers.len() != statuses.len() {
            return Err(Precondition::ArrayLengthMismatch.into());
        }

        for (id, &allowed) in callers.iter().zip(statuses) {
            if allowed {
                self.authorized_callers.insert(id.clone());
            } else {
                self.authorized_callers.remove(id);
            }
            info!(caller = %id, allowed, "Caller status updated");
            self.publish(ControllerEvent::CallerStatusUpdated {
                caller: id.clone(),
                allowed,
            });
        }
        Ok(())
    }

    /// Open (or close) rebalance, iterate and reinvest to every direct caller.
    pub fn update_anyone_callable(&mut self, caller: &Caller, allowed: bool) -> ControllerResult<()> {
        let result = self
            .ensure_owner(caller)
            .and_then(|_| self.ensure_no_twap())
            .map(|_| {
                self.anyone_callable = allowed;
                info!(allowed, "Anyone-callable updated");
                self.publish(ControllerEvent::AnyoneCallableUpdated { allowed });
            });
        self.finish("update_anyone_callable", result)
    }

    /// Top up the ripcord reward pool. Open to anyone.
    pub fn fund_incentive(&mut self, amount: Decimal) -> ControllerResult<()> {
        let result = self
            .incentive
            .fund(amount)
            .map_err(ControllerError::from)
            .map(|_| self.publish(ControllerEvent::IncentiveFunded { amount }));
        self.finish("fund_incentive", result)
    }

    /// Drain the reward pool. Owner only, not during a TWAP.
    pub fn withdraw_incentive_balance(&mut self, caller: &Caller) -> ControllerResult<Decimal> {
        let result = self
            .ensure_owner(caller)
            .and_then(|_| self.ensure_no_twap())
            .map(|_| {
                let amount = self.incentive.withdraw_all();
                info!(amount = %amount, "Incentive balance withdrawn");
                self.publish(ControllerEvent::IncentiveWithdrawn { amount });
                amount
            });
        self.finish("withdraw_incentive_balance", result)
    }

    /// Take accrued performance fees. Owner only.
    pub fn withdraw_performance_fees(&mut self, caller: &Caller) -> ControllerResult<Decimal> {
        let result = self.ensure_owner(caller).map(|_| {
            let amount = std::mem::take(&mut self.accrued_performance_fees);
            info!(amount = %amount, "Performance fees withdrawn");
            amount
        });
        self.finish("withdraw_performance_fees", result)
    }

    // =========================================================================
    // Guards and helpers
    // =========================================================================

    fn ensure_owner(&self, caller: &Caller) -> ControllerResult<()> {
        if caller.id == self.owner {
            Ok(())
        } else {
            Err(Authorization::NotOwner.into())
        }
    }

    /// Direct caller on the allow list (or anyone, when opened).
    fn ensure_allowed_caller(&self, caller: &Caller) -> ControllerResult<()> {
        if !caller.is_direct() {
            return Err(Authorization::RelayedCaller.into());
        }
        if self.is_allowed_caller(&caller.id) {
            Ok(())
        } else {
            Err(Authorization::NotAllowedCaller.into())
        }
    }

    fn ensure_no_twap(&self) -> ControllerResult<()> {
        if self.machine.is_twap_active() {
            Err(Precondition::TwapInProgress.into())
        } else {
            Ok(())
        }
    }

    fn ensure_below_incentivized(&self, current: LeverageRatio) -> ControllerResult<()> {
        if current.magnitude() > self.settings.incentive.incentivized_leverage_ratio.magnitude() {
            Err(Precondition::AboveIncentivizedLeverage.into())
        } else {
            Ok(())
        }
    }

    fn reinvest_enabled(snapshot: &PositionSnapshot) -> bool {
        L::SUPPORTS_REINVEST && snapshot.settled_funding > Decimal::ZERO
    }

    /// Trade `quantity` on leg A and its opposite on leg B, booking each fill.
    fn execute_chunk(
        &self,
        quantity: BaseUnits,
        price: Decimal,
        slippage_tolerance: Decimal,
    ) -> ControllerResult<()> {
        if quantity.is_zero() {
            return Ok(());
        }

        for (leg, venue) in L::LEGS.iter().zip(&self.venues) {
            let leg_quantity = match leg {
                Leg::Perp => quantity,
                Leg::Spot => -quantity,
            };
            let instruction = TradeInstruction::new(
                *leg,
                &self.settings.exchange,
                leg_quantity,
                price,
                slippage_tolerance,
            );
            let fill = venue.execute(&instruction)?;
            if fill.base_quantity != instruction.base_quantity
                || !instruction.accepts(fill.quote_amount)
            {
                return Err(ControllerError::Venue(format!(
                    "{} fill {} for {} outside instruction (qty {}, bound {})",
                    leg,
                    fill.base_quantity,
                    fill.quote_amount,
                    instruction.base_quantity,
                    instruction.quote_bound
                )));
            }

            match leg {
                Leg::Perp => self.ledger.apply_perp_fill(&fill)?,
                Leg::Spot => self.ledger.apply_spot_fill(&fill)?,
            }
            debug!(
                leg = %leg,
                venue = %instruction.venue,
                base = %fill.base_quantity,
                quote = %fill.quote_amount,
                "Leg filled"
            );
        }

        Metrics::chunk_notional(to_f64(quantity.inner()));
        Ok(())
    }

    fn outcome(
        &self,
        prev_leverage: LeverageRatio,
        new_leverage: LeverageRatio,
        chunk: Chunk,
    ) -> RebalanceOutcome {
        Metrics::leverage_ratio(to_f64(new_leverage.inner()));
        RebalanceOutcome {
            prev_leverage,
            new_leverage,
            chunk,
            twap_leverage_ratio: self.machine.twap_leverage_ratio(),
        }
    }

    fn publish(&self, event: ControllerEvent) {
        if let Some(sink) = &self.events {
            if sink.send(event).is_err() {
                debug!("Event receiver dropped");
            }
        }
    }

    /// Count the result and log rejections.
    fn finish<T>(&self, operation: &'static str, result: ControllerResult<T>) -> ControllerResult<T> {
        match &result {
            Ok(_) => Metrics::action(operation),
            Err(err) => {
                warn!(operation, kind = err.kind(), error = %err, "Operation rejected");
                Metrics::rejection(operation, err.kind());
            }
        }
        Metrics::twap_active(self.machine.is_twap_active());
        result
    }
}

impl RebalanceController<PairedLegs> {
    /// Reinvest settled funding at the current leverage. Allowed callers
    /// only.
    ///
    /// Net of the performance fee, the proceeds are re-deposited as
    /// collateral and `net * |L| / (1 + |L|)` of it buys the spot leg, paired
    /// with an equal perp trade in the position's direction. This keeps `L`
    /// unchanged. Funding only moves once both legs have filled.
    pub fn reinvest(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<ReinvestOutcome> {
        let result = self.try_reinvest(caller, now_ms);
        self.finish("reinvest", result)
    }

    fn try_reinvest(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<ReinvestOutcome> {
        self.ensure_allowed_caller(caller)?;
        let snapshot = self.ledger.snapshot()?;
        ensure_supply(&snapshot)?;
        let current = engaged_leverage(&snapshot)?;
        self.ensure_no_twap()?;
        self.machine
            .ensure_reinvest_interval(now_ms, self.settings.methodology.reinvest_interval_ms)?;
        if snapshot.settled_funding <= Decimal::ZERO {
            return Err(Precondition::NothingToReinvest.into());
        }
        if snapshot.base_price <= Decimal::ZERO {
            return Err(ControllerError::Computation(EngineError::InvalidPrice(format!(
                "base price must be positive, got {}",
                snapshot.base_price
            ))));
        }

        let funding = snapshot.settled_funding;
        let performance_fee = funding * self.settings.methodology.performance_fee_percentage;
        let net = funding - performance_fee;
        let magnitude = current.magnitude();
        let spot_spend = (net * magnitude)
            .checked_div(Decimal::ONE + magnitude)
            .ok_or(ControllerError::Computation(EngineError::Overflow(
                "reinvest spot spend",
            )))?;
        let quantity = spot_spend
            .checked_div(snapshot.base_price)
            .ok_or(ControllerError::Computation(EngineError::Overflow(
                "reinvest quantity",
            )))?;
        let base_quantity = match current.direction() {
            Some(direction) => BaseUnits::new(direction.apply(quantity)),
            None => return Err(Precondition::NotEngaged.into()),
        };

        // Legs first: a refused fill leaves the funding settled
        self.execute_chunk(
            base_quantity,
            snapshot.base_price,
            self.settings.execution.slippage_tolerance,
        )?;
        self.ledger.withdraw_funding(funding)?;
        self.ledger.deposit(net)?;
        self.accrued_performance_fees += performance_fee;
        let new_leverage = self.ledger.snapshot()?.leverage_ratio();
        self.machine.record_reinvest(now_ms);

        info!(
            funding = %funding,
            fee = %performance_fee,
            spot_spend = %spot_spend,
            base = %base_quantity,
            leverage = %new_leverage,
            "Reinvested"
        );
        self.publish(ControllerEvent::Reinvested {
            funding,
            performance_fee,
            spot_spend,
            base_quantity,
        });
        Ok(ReinvestOutcome {
            funding,
            performance_fee,
            spot_spend,
            base_quantity,
            new_leverage,
        })
    }
}
