//! Keeper configuration.
//!
//! Layered with the `config` crate: TOML file first, then `LEVCTL__`-prefixed
//! environment overrides (`LEVCTL__KEEPER__MAX_TICKS=10`,
//! `LEVCTL__METHODOLOGY__RECENTERING_SPEED=0.1`).

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use levctl_controller::{LegLayout, PairedLegs, SingleLeg};
use levctl_core::{
    ExchangeSettings, ExecutionSettings, IncentiveSettings, MethodologySettings, StrategySettings,
};
use levctl_policy::BoundsPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "LEVCTL_CONFIG";

/// Config file used when neither the flag nor the env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const ENV_PREFIX: &str = "LEVCTL";

/// Which controller the keeper drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyVariant {
    /// Single perp venue.
    #[default]
    Leverage,
    /// Perp leg paired with an opposite spot leg.
    Basis,
}

impl StrategyVariant {
    /// Number of venue legs.
    pub fn legs(&self) -> usize {
        match self {
            Self::Leverage => SingleLeg::LEGS.len(),
            Self::Basis => PairedLegs::LEGS.len(),
        }
    }
}

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Principal the keeper calls as. Added to the allow list at startup.
    #[serde(default = "default_principal")]
    pub principal: String,
    /// Wall-clock delay between ticks (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Simulated time advanced per tick (ms).
    #[serde(default = "default_tick_duration_ms")]
    pub tick_duration_ms: u64,
    /// Stop after this many ticks. 0 = run until interrupted.
    #[serde(default)]
    pub max_ticks: u64,
    /// Simulated clock start (Unix ms). Defaults to the current time.
    #[serde(default)]
    pub start_time_ms: Option<u64>,
}

fn default_principal() -> String {
    "keeper".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_tick_duration_ms() -> u64 {
    60 * 60 * 1000 // 1 hour
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            principal: default_principal(),
            poll_interval_ms: default_poll_interval_ms(),
            tick_duration_ms: default_tick_duration_ms(),
            max_ticks: 0,
            start_time_ms: None,
        }
    }
}

/// Simulated market and account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Collateral deposited before engaging.
    #[serde(default = "default_initial_collateral")]
    pub initial_collateral: Decimal,
    /// Outstanding supply of the levered product.
    #[serde(default = "default_total_supply")]
    pub total_supply: Decimal,
    /// Oracle price at start.
    #[serde(default = "default_initial_price")]
    pub initial_price: Decimal,
    /// Fractional price move applied every tick (0.01 = +1%).
    #[serde(default)]
    pub price_drift_per_tick: Decimal,
    /// Funding settled to the account every tick.
    #[serde(default)]
    pub funding_per_tick: Decimal,
    /// Ripcord reward pool funded at startup.
    #[serde(default = "default_incentive_pool")]
    pub incentive_pool: Decimal,
}

fn default_initial_collateral() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_total_supply() -> Decimal {
    Decimal::ONE
}

fn default_initial_price() -> Decimal {
    Decimal::new(2_000, 0)
}

fn default_incentive_pool() -> Decimal {
    Decimal::new(10, 0)
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            initial_collateral: default_initial_collateral(),
            total_supply: default_total_supply(),
            initial_price: default_initial_price(),
            price_drift_per_tick: Decimal::ZERO,
            funding_per_tick: Decimal::ZERO,
            incentive_pool: default_incentive_pool(),
        }
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log a metrics snapshot every N ticks. 0 disables.
    #[serde(default = "default_metrics_report_interval_ticks")]
    pub metrics_report_interval_ticks: u64,
}

fn default_metrics_report_interval_ticks() -> u64 {
    24
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_report_interval_ticks: default_metrics_report_interval_ticks(),
        }
    }
}

/// Keeper configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub variant: StrategyVariant,
    /// Controller owner principal.
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default)]
    pub keeper: KeeperConfig,
    #[serde(default)]
    pub methodology: MethodologySettings,
    #[serde(default)]
    pub execution: ExecutionSettings,
    #[serde(default)]
    pub incentive: IncentiveSettings,
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_owner() -> String {
    "owner".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            variant: StrategyVariant::default(),
            owner: default_owner(),
            keeper: KeeperConfig::default(),
            methodology: MethodologySettings::default(),
            execution: ExecutionSettings::default(),
            incentive: IncentiveSettings::default(),
            exchange: ExchangeSettings::default(),
            paper: PaperConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl AppConfig {
    /// Config path: CLI flag > `LEVCTL_CONFIG` > `config/default.toml`.
    pub fn resolve_path(cli: Option<String>) -> String {
        cli.or_else(|| std::env::var(CONFIG_ENV_VAR).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Load `path` (defaults if missing) with environment overrides, then
    /// validate.
    pub fn load(path: &str) -> AppResult<Self> {
        let mut builder = Config::builder();
        if Path::new(path).exists() {
            builder = builder.add_source(File::from(Path::new(path)).required(true));
        } else {
            warn!(path = %path, "Config file not found, using defaults");
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without environment overrides, then validate.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// The four controller settings groups.
    pub fn strategy_settings(&self) -> StrategySettings {
        StrategySettings {
            methodology: self.methodology.clone(),
            execution: self.execution.clone(),
            incentive: self.incentive.clone(),
            exchange: self.exchange.clone(),
        }
    }

    /// Keeper and paper sanity checks plus the controller's bounds policy.
    pub fn validate(&self) -> AppResult<()> {
        if self.keeper.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "keeper.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.keeper.tick_duration_ms == 0 {
            return Err(AppError::Config(
                "keeper.tick_duration_ms must be positive".to_string(),
            ));
        }
        if self.paper.initial_price <= Decimal::ZERO {
            return Err(AppError::Config(
                "paper.initial_price must be positive".to_string(),
            ));
        }
        if self.paper.initial_collateral.is_sign_negative()
            || self.paper.total_supply.is_sign_negative()
            || self.paper.incentive_pool.is_sign_negative()
            || self.paper.funding_per_tick.is_sign_negative()
        {
            return Err(AppError::Config(
                "paper balances must not be negative".to_string(),
            ));
        }
        if self.paper.price_drift_per_tick <= -Decimal::ONE {
            return Err(AppError::Config(
                "paper.price_drift_per_tick must be above -1".to_string(),
            ));
        }

        BoundsPolicy::new(self.variant.legs()).validate(&self.strategy_settings())?;
        Ok(())
    }
}
