//! Shared configuration and wire types for the MCP hub
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types
//! - The error envelope and error codes

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, ConfigError, CorsConfig, DatabaseConfig, Environment, JwtConfig,
    ServerConfig, WebhookSecrets,
};
pub use errors::{error_codes, ErrorBody, ErrorEnvelope};
