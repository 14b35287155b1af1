//! API configuration
//!
//! Every setting reads from an `API_`-prefixed environment variable and
//! falls back to a local-development default, so a bare `cargo run` comes up
//! against a local database with the simulated invoice provider.

use serde::Deserialize;

/// Runtime configuration of the API server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// JWT signing secret
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub jwt_expiration_secs: u64,
    /// PostgreSQL connection string
    pub database_url: String,
    /// Deadline on invoice-provider calls, in milliseconds
    pub provider_timeout_ms: u64,
    /// Issue documents through the simulated provider
    pub mock_invoice_provider: bool,
    /// Log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            jwt_secret: "change-me-in-production".into(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/praxis".into(),
            provider_timeout_ms: 30_000,
            mock_invoice_provider: true,
            log_level: "info".into(),
        }
    }
}

impl ApiConfig {
    /// Reads `API_*` environment variables over the defaults
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// The host:port pair to bind
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
