use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8088;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_TOPIC: &str = "order-created";
const DEFAULT_QUEUE_BACKEND: &str = "in-memory";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Base URLs for the downstream services this orchestrator calls.
/// Each one is independently overridable (e.g. `APP__SERVICES__PAYMENT`).
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ServiceEndpoints {
    #[serde(default = "default_cart_url")]
    pub cart: String,
    #[serde(default = "default_catalog_url")]
    pub catalog: String,
    #[serde(default = "default_inventory_url")]
    pub inventory: String,
    #[serde(default = "default_promo_url")]
    pub promo: String,
    #[serde(default = "default_payment_url")]
    pub payment: String,
    #[serde(default = "default_order_url")]
    pub order: String,
    #[serde(default = "default_address_url")]
    pub address: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            cart: default_cart_url(),
            catalog: default_catalog_url(),
            inventory: default_inventory_url(),
            promo: default_promo_url(),
            payment: default_payment_url(),
            order: default_order_url(),
            address: default_address_url(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    /// JWT secret key (minimum 32 characters)
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// Currency assumed when a downstream response omits one
    #[serde(default = "default_currency")]
    pub default_currency: String,

    /// Topic the OrderCreated event is published to
    #[serde(default = "default_topic")]
    pub order_created_topic: String,

    /// Message queue backend: "in-memory" or "redis"
    #[serde(default = "default_queue_backend")]
    pub queue_backend: String,

    /// Redis connection URL (used when queue_backend = "redis")
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Per-call timeout for downstream HTTP requests (seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Circuit breaker: consecutive failures before opening
    #[serde(default = "default_breaker_failure_threshold")]
    pub breaker_failure_threshold: u32,

    /// Circuit breaker: seconds to wait before probing a half-open circuit
    #[serde(default = "default_breaker_reset_timeout_secs")]
    pub breaker_reset_timeout_secs: u64,

    /// Circuit breaker: successes in half-open needed to close
    #[serde(default = "default_breaker_success_threshold")]
    pub breaker_success_threshold: u32,

    /// Downstream service base URLs
    #[serde(default)]
    pub services: ServiceEndpoints,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Per-call timeout for downstream HTTP requests
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn breaker_reset_timeout(&self) -> Duration {
        Duration::from_secs(self.breaker_reset_timeout_secs)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_queue_backend() -> String {
    DEFAULT_QUEUE_BACKEND.to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_breaker_failure_threshold() -> u32 {
    5
}

fn default_breaker_reset_timeout_secs() -> u64 {
    60
}

fn default_breaker_success_threshold() -> u32 {
    2
}

fn default_cart_url() -> String {
    "http://localhost:8087".to_string()
}

fn default_catalog_url() -> String {
    "http://localhost:8084".to_string()
}

fn default_inventory_url() -> String {
    "http://localhost:8085".to_string()
}

fn default_promo_url() -> String {
    "http://localhost:8086".to_string()
}

fn default_payment_url() -> String {
    "http://localhost:8089".to_string()
}

fn default_order_url() -> String {
    "http://localhost:8090".to_string()
}

fn default_address_url() -> String {
    "http://localhost:8083".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("checkout_api={},tower_http=debug", level);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = fmt().with_env_filter(filter).try_init();
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP_*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    let config = Config::builder()
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
