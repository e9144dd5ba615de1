//! Keeper error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Policy error: {0}")]
    Policy(#[from] levctl_policy::PolicyError),

    #[error("Controller error: {0}")]
    Controller(#[from] levctl_controller::ControllerError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] levctl_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
