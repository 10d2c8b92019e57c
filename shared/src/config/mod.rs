//! Configuration module with business-specific sub-modules
//!
//! - `auth` - JWT signing and per-service HMAC secrets
//! - `database` - Database connection and pool configuration
//! - `environment` - Environment detection
//! - `server` - HTTP server and CORS configuration

pub mod auth;
pub mod database;
pub mod environment;
pub mod server;

use thiserror::Error;

pub use auth::{AuthConfig, JwtConfig, WebhookSecrets};
pub use database::DatabaseConfig;
pub use environment::Environment;
pub use server::{CorsConfig, ServerConfig};

/// Errors raised while loading configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    Missing(String),

    #[error("Environment variable {name} has invalid value '{value}'")]
    Invalid { name: String, value: String },
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Service authentication configuration
    pub auth: AuthConfig,

    /// CORS configuration
    pub cors: CorsConfig,
}

impl AppConfig {
    /// Load configuration from environment.
    ///
    /// `service_ids` lists the services whose webhook secrets should be read.
    pub fn from_env<'a>(service_ids: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(service_ids)?,
            cors: CorsConfig::from_env(),
        })
    }
}
