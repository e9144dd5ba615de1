//! Prometheus metrics for the leverage controller.
//!
//! Covers:
//! - Executed actions and rejected operations
//! - Current leverage ratio and TWAP state
//! - Chunk sizes and ripcord rewards paid
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram,
    register_int_gauge, Counter, CounterVec, Encoder, Gauge, Histogram, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Total state-mutating operations executed.
/// Labels: action (engage/rebalance/iterate/ripcord/disengage/reinvest)
pub static ACTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "levctl_actions_total",
        "Total controller operations executed",
        &["action"]
    )
    .unwrap()
});

/// Total rejected operations.
/// Labels: operation, kind (configuration/precondition/authorization/cooldown/...)
pub static REJECTIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "levctl_rejections_total",
        "Total controller operations rejected",
        &["operation", "kind"]
    )
    .unwrap()
});

/// Last observed leverage ratio (signed).
pub static LEVERAGE_RATIO: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "levctl_leverage_ratio",
        "Last observed leverage ratio (negative = short)"
    )
    .unwrap()
});

/// TWAP in progress (1 = active).
pub static TWAP_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("levctl_twap_active", "Multi-chunk rebalance in progress (1=active)")
        .unwrap()
});

/// Executed chunk size in base units (absolute).
pub static CHUNK_NOTIONAL: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "levctl_chunk_notional",
        "Executed chunk size in base units",
        vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 50.0, 100.0]
    )
    .unwrap()
});

/// Cumulative ripcord rewards paid.
pub static RIPCORD_REWARD_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "levctl_ripcord_reward_total",
        "Cumulative ripcord rewards paid in reward-asset units"
    )
    .unwrap()
});

/// Metrics helper for recording values.
pub struct Metrics;

impl Metrics {
    /// Record an executed operation.
    pub fn action(action: &str) {
        ACTIONS_TOTAL.with_label_values(&[action]).inc();
    }

    /// Record a rejected operation.
    pub fn rejection(operation: &str, kind: &str) {
        REJECTIONS_TOTAL.with_label_values(&[operation, kind]).inc();
    }

    /// Update the leverage ratio gauge.
    pub fn leverage_ratio(ratio: f64) {
        LEVERAGE_RATIO.set(ratio);
    }

    /// Set TWAP state.
    pub fn twap_active(active: bool) {
        TWAP_ACTIVE.set(if active { 1 } else { 0 });
    }

    /// Record an executed chunk size (absolute base units).
    pub fn chunk_notional(base_units: f64) {
        CHUNK_NOTIONAL.observe(base_units.abs());
    }

    /// Record a ripcord reward payout.
    pub fn ripcord_reward(amount: f64) {
        if amount > 0.0 {
            RIPCORD_REWARD_TOTAL.inc_by(amount);
        }
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_metrics_appear_in_text_output() {
        Metrics::action("rebalance");
        Metrics::rejection("ripcord", "cooldown");
        Metrics::leverage_ratio(-0.95);
        Metrics::twap_active(true);
        Metrics::chunk_notional(-1.0);
        Metrics::ripcord_reward(0.01);

        let text = Metrics::gather_text().unwrap();
        assert!(text.contains("levctl_actions_total"));
        assert!(text.contains("levctl_rejections_total"));
        assert!(text.contains("levctl_leverage_ratio"));
        assert!(text.contains("levctl_twap_active 1"));
        assert!(text.contains("levctl_chunk_notional"));
        assert!(text.contains("levctl_ripcord_reward_total"));
    }

    #[test]
    fn test_ripcord_reward_ignores_non_positive() {
        // Counters panic on negative increments
        Metrics::ripcord_reward(0.0);
        Metrics::ripcord_reward(-1.0);
    }
}
