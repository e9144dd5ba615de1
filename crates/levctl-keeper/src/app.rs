//! Keeper application.
//!
//! Builds a controller over paper collaborators, engages it, then polls the
//! advisory on every tick and dispatches the advised action:
//! - moves the simulated oracle price and settles funding
//! - asks `should_rebalance` for the action code
//! - calls the matching operation as the keeper principal
//! - drains controller events into the log
//!
//! Time is simulated: each tick advances the clock by
//! `keeper.tick_duration_ms` regardless of the wall-clock poll interval.

use std::sync::Arc;
use std::time::Duration;

use levctl_controller::{
    BasisController, ControllerEvent, ControllerResult, LeverageController, PaperAccount,
    PaperLedger, PaperVenue, VenueAdapter,
};
use levctl_core::{ActionCode, Caller, LeverageRatio, PrincipalId};
use levctl_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, StrategyVariant};
use crate::error::AppResult;

/// The controller being driven.
enum Strategy {
    Leverage(LeverageController),
    Basis(BasisController),
}

impl Strategy {
    fn should_rebalance(&self, now_ms: u64) -> ControllerResult<ActionCode> {
        match self {
            Self::Leverage(c) => c.should_rebalance(now_ms),
            Self::Basis(c) => c.should_rebalance(now_ms),
        }
    }

    fn current_leverage(&self) -> ControllerResult<LeverageRatio> {
        match self {
            Self::Leverage(c) => c.get_current_leverage_ratio(),
            Self::Basis(c) => c.get_current_leverage_ratio(),
        }
    }

    fn engage(&mut self, caller: &Caller, now_ms: u64) -> ControllerResult<()> {
        match self {
            Self::Leverage(c) => c.engage(caller, now_ms).map(drop),
            Self::Basis(c) => c.engage(caller, now_ms).map(drop),
        }
    }

    /// Run the operation behind `action`.
    fn dispatch(&mut self, action: ActionCode, caller: &Caller, now_ms: u64) -> ControllerResult<()> {
        match (self, action) {
            (_, ActionCode::None) => Ok(()),
            (Self::Leverage(c), ActionCode::Rebalance) => c.rebalance(caller, now_ms).map(drop),
            (Self::Basis(c), ActionCode::Rebalance) => c.rebalance(caller, now_ms).map(drop),
            (Self::Leverage(c), ActionCode::IterateTwap) => {
                c.iterate_rebalance(caller, now_ms).map(drop)
            }
            (Self::Basis(c), ActionCode::IterateTwap) => {
                c.iterate_rebalance(caller, now_ms).map(drop)
            }
            (Self::Leverage(c), ActionCode::Ripcord) => c.ripcord(caller, now_ms).map(drop),
            (Self::Basis(c), ActionCode::Ripcord) => c.ripcord(caller, now_ms).map(drop),
            (Self::Basis(c), ActionCode::Reinvest) => c.reinvest(caller, now_ms).map(drop),
            // Never advised without reinvest support
            (Self::Leverage(_), ActionCode::Reinvest) => Ok(()),
        }
    }
}

/// Counters for one keeper run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub rebalances: u64,
    pub iterations: u64,
    pub ripcords: u64,
    pub reinvests: u64,
    /// Advised actions the controller rejected.
    pub rejected: u64,
    pub events: u64,
    pub final_leverage: LeverageRatio,
    pub final_price: Decimal,
}

impl RunSummary {
    fn record(&mut self, action: ActionCode) {
        match action {
            ActionCode::Rebalance => self.rebalances += 1,
            ActionCode::IterateTwap => self.iterations += 1,
            ActionCode::Ripcord => self.ripcords += 1,
            ActionCode::Reinvest => self.reinvests += 1,
            ActionCode::None => {}
        }
    }
}

/// Keeper application.
pub struct Application {
    config: AppConfig,
    ledger: PaperLedger,
    strategy: Strategy,
    owner: Caller,
    keeper: Caller,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    clock_ms: u64,
    summary: RunSummary,
}

impl Application {
    /// Build the paper ledger, venues and controller, authorize the keeper
    /// and fund the reward pool.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let paper = &config.paper;
        let ledger = PaperLedger::new(PaperAccount::funded(
            paper.initial_collateral,
            paper.initial_price,
            paper.total_supply,
        ));
        let owner_id = PrincipalId::new(config.owner.clone());
        let keeper_id = PrincipalId::new(config.keeper.principal.clone());
        let (tx, events) = mpsc::unbounded_channel();

        let perp: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::perp(ledger.clone()));
        let mut strategy = match config.variant {
            StrategyVariant::Leverage => Strategy::Leverage(
                LeverageController::new(
                    owner_id.clone(),
                    config.strategy_settings(),
                    Arc::new(ledger.clone()),
                    vec![perp],
                )?
                .with_event_sink(tx),
            ),
            StrategyVariant::Basis => {
                let spot: Arc<dyn VenueAdapter> = Arc::new(PaperVenue::spot(ledger.clone()));
                Strategy::Basis(
                    BasisController::new(
                        owner_id.clone(),
                        config.strategy_settings(),
                        Arc::new(ledger.clone()),
                        vec![perp, spot],
                    )?
                    .with_event_sink(tx),
                )
            }
        };

        let owner = Caller::direct(owner_id.as_str());
        match &mut strategy {
            Strategy::Leverage(c) => {
                c.update_authorized_callers(&owner, &[keeper_id.clone()], &[true])?;
                if paper.incentive_pool > Decimal::ZERO {
                    c.fund_incentive(paper.incentive_pool)?;
                }
            }
            Strategy::Basis(c) => {
                c.update_authorized_callers(&owner, &[keeper_id.clone()], &[true])?;
                if paper.incentive_pool > Decimal::ZERO {
                    c.fund_incentive(paper.incentive_pool)?;
                }
            }
        }

        let clock_ms = config
            .keeper
            .start_time_ms
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis().max(0) as u64);

        info!(
            variant = ?config.variant,
            owner = %owner_id,
            keeper = %keeper_id,
            collateral = %paper.initial_collateral,
            price = %paper.initial_price,
            "Keeper initialized"
        );

        Ok(Self {
            keeper: Caller::direct(keeper_id.as_str()),
            owner,
            config,
            ledger,
            strategy,
            events,
            clock_ms,
            summary: RunSummary::default(),
        })
    }

    /// Paper ledger shared with the controller.
    pub fn ledger(&self) -> &PaperLedger {
        &self.ledger
    }

    /// Simulated clock (Unix ms).
    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    /// Engage, then poll until `max_ticks` or Ctrl-C.
    pub async fn run(&mut self) -> AppResult<RunSummary> {
        self.strategy.engage(&self.owner, self.clock_ms)?;
        self.drain_events();

        let mut poll = tokio::time::interval(Duration::from_millis(self.config.keeper.poll_interval_ms));
        // First tick completes immediately
        poll.tick().await;

        loop {
            if self.config.keeper.max_ticks > 0 && self.summary.ticks >= self.config.keeper.max_ticks {
                info!(ticks = self.summary.ticks, "Max ticks reached");
                break;
            }

            tokio::select! {
                _ = poll.tick() => {
                    self.tick()?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.summary.final_leverage = self.strategy.current_leverage()?;
        self.summary.final_price = self.ledger.price();
        info!(
            ticks = self.summary.ticks,
            rebalances = self.summary.rebalances,
            iterations = self.summary.iterations,
            ripcords = self.summary.ripcords,
            reinvests = self.summary.reinvests,
            rejected = self.summary.rejected,
            final_leverage = %self.summary.final_leverage,
            "Keeper stopped"
        );
        Ok(self.summary.clone())
    }

    /// Advance the simulation one step and act on the advisory.
    ///
    /// A rejected operation is logged by the controller and counted here; it
    /// does not stop the keeper.
    pub fn tick(&mut self) -> AppResult<ActionCode> {
        self.summary.ticks += 1;
        self.clock_ms += self.config.keeper.tick_duration_ms;

        let paper = &self.config.paper;
        if !paper.price_drift_per_tick.is_zero() {
            self.ledger.drift_price(paper.price_drift_per_tick);
        }
        if paper.funding_per_tick > Decimal::ZERO && self.config.variant == StrategyVariant::Basis {
            self.ledger.accrue_funding(paper.funding_per_tick);
        }

        let action = self.strategy.should_rebalance(self.clock_ms)?;
        debug!(
            tick = self.summary.ticks,
            now_ms = self.clock_ms,
            price = %self.ledger.price(),
            action = %action,
            "Keeper tick"
        );

        if action.is_actionable() {
            match self.strategy.dispatch(action, &self.keeper, self.clock_ms) {
                Ok(()) => self.summary.record(action),
                Err(err) => {
                    warn!(action = %action, error = %err, "Advised action failed");
                    self.summary.rejected += 1;
                }
            }
        }
        self.drain_events();
        self.report_metrics();
        Ok(action)
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.summary.events += 1;
            match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "Controller event"),
                Err(err) => warn!(error = %err, "Failed to encode controller event"),
            }
        }
    }

    fn report_metrics(&self) {
        let every = self.config.telemetry.metrics_report_interval_ticks;
        if every == 0 || self.summary.ticks % every != 0 {
            return;
        }
        match Metrics::gather_text() {
            Ok(text) => debug!(metrics = %text, "Metrics snapshot"),
            Err(err) => warn!(error = %err, "Failed to gather metrics"),
        }
    }
}
