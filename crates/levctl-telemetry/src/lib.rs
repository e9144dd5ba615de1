//! Prometheus metrics and structured logging for the leverage controller.
//!
//! - Prometheus metrics for actions, rejections, leverage and TWAP state
//! - Structured logging with tracing (JSON in production)

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
