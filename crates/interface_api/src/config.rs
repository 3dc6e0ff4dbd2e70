//! API configuration

use serde::Deserialize;

use domain_billing::{NumberingSequence, DEFAULT_PREFIX, DEFAULT_WIDTH};
use infra_db::DatabaseConfig;

/// API configuration
///
/// Every key can be set through an `API_`-prefixed environment variable,
/// e.g. `API_PORT=9000` or `API_BILL_PREFIX=INV`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Prefix of generated bill numbers
    pub bill_prefix: String,
    /// Minimum digits in the bill number suffix
    pub bill_number_width: usize,
    /// Default threshold of the low-stock report
    pub low_stock_threshold: u32,
    /// Maximum pooled database connections
    pub db_max_connections: u32,
    /// Minimum pooled database connections
    pub db_min_connections: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/billing".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            bill_prefix: DEFAULT_PREFIX.to_string(),
            bill_number_width: DEFAULT_WIDTH,
            low_stock_threshold: 5,
            db_max_connections: 10,
            db_min_connections: 2,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bill numbering configured for this deployment
    pub fn numbering(&self) -> NumberingSequence {
        NumberingSequence::new(self.bill_prefix.clone()).with_width(self.bill_number_width)
    }

    /// Connection pool settings
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.db_max_connections)
            .min_connections(self.db_min_connections)
    }
}
