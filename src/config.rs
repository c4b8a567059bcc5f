use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// The single currency in which profits and stored transaction amounts
/// are denominated internally.
pub const SETTLEMENT_CURRENCY: &str = "EGP";

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_env")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Maximum database connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Minimum database connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Per-currency conversion rates into the settlement currency.
    /// The settlement currency itself has rate 1; unknown codes fall
    /// back to 1 (pass-through).
    #[serde(default = "default_rates")]
    pub rates: HashMap<String, Decimal>,

    /// Endpoint of the outbound mail relay. When unset, notifications
    /// are logged and dropped.
    #[serde(default)]
    pub mailer_url: Option<String>,

    /// Timeout in seconds for outbound notification/media calls
    #[serde(default = "default_external_timeout_secs")]
    pub external_timeout_secs: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_env() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_external_timeout_secs() -> u64 {
    10
}

fn default_rates() -> HashMap<String, Decimal> {
    use rust_decimal_macros::dec;
    let mut rates = HashMap::new();
    rates.insert("USD".to_string(), dec!(50.54));
    rates.insert(SETTLEMENT_CURRENCY.to_string(), dec!(1));
    rates
}

impl AppConfig {
    /// Minimal constructor used by tests and tooling.
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            rates: default_rates(),
            mailer_url: None,
            external_timeout_secs: default_external_timeout_secs(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Loads configuration from `config/default.toml`, an optional
/// environment-specific file and `APP_`-prefixed environment variables
/// (highest precedence).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .set_default("environment", environment.clone())?
        .add_source(File::from(Path::new(CONFIG_DIR).join("default")).required(false))
        .add_source(File::from(Path::new(CONFIG_DIR).join(&environment)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"));

    if let Ok(url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database_url", url)?;
    }

    let config: AppConfig = builder.build()?.try_deserialize()?;
    info!(environment = %config.environment, "Configuration loaded");
    Ok(config)
}

/// Initializes the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_rates_cover_settlement_and_usd() {
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        );
        assert_eq!(cfg.rates.get("USD"), Some(&dec!(50.54)));
        assert_eq!(cfg.rates.get(SETTLEMENT_CURRENCY), Some(&dec!(1)));
    }
}
