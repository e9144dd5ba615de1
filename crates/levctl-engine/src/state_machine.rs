//! Rebalance state machine.
//!
//! Phases:
//! - `Idle`: current leverage is zero
//! - `EngagedStable`: engaged, no TWAP in progress
//! - `EngagedTwap`: engaged, `twap_leverage_ratio` holds the in-progress target
//!
//! Advisory precedence (first match wins):
//! 1. |current| > |incentivized| and incentivized cooldown elapsed -> RIPCORD
//! 2. TWAP in progress and TWAP cooldown elapsed -> ITERATE_TWAP
//! 3. stable, rebalance interval elapsed, leverage outside band -> REBALANCE
//! 4. stable, reinvest enabled and due, leverage inside band -> REINVEST
//! 5. NONE
//!
//! Timestamps are written by the `record_*` methods, which callers invoke as
//! the final effect of an operation. Cooldown guards read the stored
//! timestamp first, so a second call in the same instant is rejected by the
//! guard.

use levctl_core::{ActionCode, LeverageRatio, MethodologySettings, StrategySettings};
use levctl_policy::BoundsPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::chunk::Chunk;
use crate::error::{EngineError, EngineResult};

/// Coarse controller phase derived from leverage and the TWAP marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebalancePhase {
    Idle,
    EngagedStable,
    EngagedTwap,
}

impl std::fmt::Display for RebalancePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::EngagedStable => write!(f, "engaged_stable"),
            Self::EngagedTwap => write!(f, "engaged_twap"),
        }
    }
}

/// Mutable controller state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Time of the last trade-producing operation (Unix ms).
    pub last_trade_timestamp_ms: u64,
    /// Time of the last reinvestment (Unix ms).
    pub last_reinvest_timestamp_ms: u64,
    /// Target of the in-progress TWAP; zero when none.
    pub twap_leverage_ratio: LeverageRatio,
}

/// Tolerance band as magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverageBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl LeverageBand {
    /// Band configured in the methodology.
    pub fn from_methodology(methodology: &MethodologySettings) -> Self {
        Self {
            min: methodology.min_leverage_ratio.magnitude(),
            max: methodology.max_leverage_ratio.magnitude(),
        }
    }

    /// Band from caller-supplied signed bounds.
    pub fn from_bounds(min: LeverageRatio, max: LeverageRatio) -> Self {
        Self {
            min: min.magnitude(),
            max: max.magnitude(),
        }
    }

    /// Whether `|current|` lies inside `[min, max]`.
    pub fn contains(&self, current: LeverageRatio) -> bool {
        let magnitude = current.magnitude();
        magnitude >= self.min && magnitude <= self.max
    }
}

/// Whether price movement already carried leverage past the TWAP target.
///
/// Levering up (`|twap| < |target|`) is done once `|current| >= |twap|`;
/// levering down (`|twap| > |target|`) once `|current| <= |twap|`. A TWAP
/// whose target equals the methodology target is never short-circuited.
pub fn is_advantageous_move(
    current: LeverageRatio,
    twap: LeverageRatio,
    target: LeverageRatio,
) -> bool {
    let current = current.magnitude();
    let twap = twap.magnitude();
    let target = target.magnitude();
    (twap < target && current >= twap) || (twap > target && current <= twap)
}

/// Owns `ControllerState` and decides which action applies.
#[derive(Debug, Clone, Default)]
pub struct RebalanceStateMachine {
    state: ControllerState,
}

impl RebalanceStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a persisted state.
    pub fn from_state(state: ControllerState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Current TWAP target (zero when no TWAP is in progress).
    pub fn twap_leverage_ratio(&self) -> LeverageRatio {
        self.state.twap_leverage_ratio
    }

    /// Whether a multi-chunk rebalance is in progress.
    pub fn is_twap_active(&self) -> bool {
        !self.state.twap_leverage_ratio.is_zero()
    }

    /// Phase for a given current leverage.
    pub fn phase(&self, current: LeverageRatio) -> RebalancePhase {
        if current.is_zero() {
            RebalancePhase::Idle
        } else if self.is_twap_active() {
            RebalancePhase::EngagedTwap
        } else {
            RebalancePhase::EngagedStable
        }
    }

    /// Milliseconds since the last trade.
    pub fn elapsed_since_trade(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.state.last_trade_timestamp_ms)
    }

    /// Milliseconds since the last reinvestment.
    pub fn elapsed_since_reinvest(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.state.last_reinvest_timestamp_ms)
    }

    /// Fail unless `period_ms` has elapsed since the last trade.
    pub fn ensure_trade_cooldown(&self, now_ms: u64, period_ms: u64) -> EngineResult<()> {
        let elapsed_ms = self.elapsed_since_trade(now_ms);
        if elapsed_ms >= period_ms {
            Ok(())
        } else {
            Err(EngineError::CooldownNotElapsed {
                required_ms: period_ms,
                elapsed_ms,
            })
        }
    }

    /// Fail unless `interval_ms` has elapsed since the last reinvestment.
    pub fn ensure_reinvest_interval(&self, now_ms: u64, interval_ms: u64) -> EngineResult<()> {
        let elapsed_ms = self.elapsed_since_reinvest(now_ms);
        if elapsed_ms >= interval_ms {
            Ok(())
        } else {
            Err(EngineError::CooldownNotElapsed {
                required_ms: interval_ms,
                elapsed_ms,
            })
        }
    }

    /// Advisory evaluation against the configured band.
    pub fn evaluate(
        &self,
        now_ms: u64,
        current: LeverageRatio,
        settings: &StrategySettings,
        reinvest_enabled: bool,
    ) -> ActionCode {
        let band = LeverageBand::from_methodology(&settings.methodology);
        self.evaluate_in_band(now_ms, current, settings, band, reinvest_enabled)
    }

    /// Advisory evaluation with caller-supplied bounds.
    ///
    /// The bounds may only tighten the configured band; anything else is
    /// rejected rather than clamped.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_with_bounds(
        &self,
        now_ms: u64,
        current: LeverageRatio,
        settings: &StrategySettings,
        policy: &BoundsPolicy,
        custom_min: LeverageRatio,
        custom_max: LeverageRatio,
        reinvest_enabled: bool,
    ) -> EngineResult<ActionCode> {
        policy.check_custom_bounds(&settings.methodology, custom_min, custom_max)?;
        let band = LeverageBand::from_bounds(custom_min, custom_max);
        Ok(self.evaluate_in_band(now_ms, current, settings, band, reinvest_enabled))
    }

    fn evaluate_in_band(
        &self,
        now_ms: u64,
        current: LeverageRatio,
        settings: &StrategySettings,
        band: LeverageBand,
        reinvest_enabled: bool,
    ) -> ActionCode {
        let elapsed_ms = self.elapsed_since_trade(now_ms);
        let phase = self.phase(current);

        let action = if current.magnitude()
            > settings.incentive.incentivized_leverage_ratio.magnitude()
            && elapsed_ms >= settings.incentive.incentivized_twap_cooldown_period_ms
        {
            ActionCode::Ripcord
        } else if phase == RebalancePhase::EngagedTwap
            && elapsed_ms >= settings.execution.twap_cooldown_period_ms
        {
            ActionCode::IterateTwap
        } else if phase == RebalancePhase::EngagedStable
            && elapsed_ms >= settings.methodology.rebalance_interval_ms
            && !band.contains(current)
        {
            ActionCode::Rebalance
        } else if phase == RebalancePhase::EngagedStable
            && reinvest_enabled
            && self.elapsed_since_reinvest(now_ms) >= settings.methodology.reinvest_interval_ms
            && band.contains(current)
        {
            ActionCode::Reinvest
        } else {
            ActionCode::None
        };

        trace!(
            %phase,
            current = %current,
            elapsed_ms,
            action = %action,
            "evaluated rebalance state"
        );
        action
    }

    /// Record a rebalance or engage chunk.
    ///
    /// Sets the TWAP marker to `target` when the chunk is partial, clears it
    /// otherwise.
    pub fn record_rebalance(&mut self, now_ms: u64, chunk: &Chunk, target: LeverageRatio) {
        self.state.last_trade_timestamp_ms = now_ms;
        if chunk.continues_twap() {
            debug!(twap_leverage_ratio = %target, "TWAP started");
            self.state.twap_leverage_ratio = target;
        } else {
            self.state.twap_leverage_ratio = LeverageRatio::ZERO;
        }
    }

    /// Record a TWAP iteration. Clears the marker once the gap is closed.
    pub fn record_iteration(&mut self, now_ms: u64, chunk: &Chunk) {
        self.state.last_trade_timestamp_ms = now_ms;
        if chunk.is_complete() {
            debug!("TWAP completed");
            self.state.twap_leverage_ratio = LeverageRatio::ZERO;
        }
    }

    /// Record a ripcord. A ripcord never continues as a TWAP.
    pub fn record_ripcord(&mut self, now_ms: u64) {
        self.state.last_trade_timestamp_ms = now_ms;
        self.state.twap_leverage_ratio = LeverageRatio::ZERO;
    }

    /// Record a disengage chunk. Any in-progress TWAP target is abandoned.
    pub fn record_disengage(&mut self, now_ms: u64) {
        self.state.last_trade_timestamp_ms = now_ms;
        self.state.twap_leverage_ratio = LeverageRatio::ZERO;
    }

    /// Record a reinvestment.
    pub fn record_reinvest(&mut self, now_ms: u64) {
        self.state.last_reinvest_timestamp_ms = now_ms;
    }
}
