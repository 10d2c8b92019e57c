//! Service authentication configuration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ConfigError;

/// Environment variable holding the HS256 signing key
pub const JWT_SECRET_ENV: &str = "MCP_JWT_SECRET";

/// Prefix of the per-service HMAC secret variables
pub const WEBHOOK_SECRET_PREFIX: &str = "WEBHOOK_SECRET_";

/// JWT signing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// HS256 signing secret
    #[serde(skip_serializing)]
    pub secret: String,

    /// Access token lifetime in seconds
    pub access_token_expiry: i64,

    /// Refresh token lifetime in seconds
    pub refresh_token_expiry: i64,

    /// `iss` claim
    pub issuer: String,

    /// `aud` claim
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            access_token_expiry: 900,     // 15 minutes
            refresh_token_expiry: 604800, // 7 days
            issuer: String::from("mcp-auth"),
            audience: String::from("central-hub"),
        }
    }
}

impl JwtConfig {
    /// Create a JWT configuration with the given secret and default lifetimes
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set access token expiry in minutes
    pub fn with_access_expiry_minutes(mut self, minutes: i64) -> Self {
        self.access_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }
}

/// Shared HMAC secrets, one per calling service
#[derive(Debug, Clone, Default)]
pub struct WebhookSecrets {
    secrets: HashMap<String, String>,
}

impl WebhookSecrets {
    /// Build an empty secret set
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret for a service id (e.g. `minu-find`)
    pub fn with_secret(mut self, service_id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.secrets.insert(service_id.into(), secret.into());
        self
    }

    /// Read `WEBHOOK_SECRET_<SERVICE_ID>` for each given service id.
    ///
    /// Services without a variable are left unprovisioned; issuance for them
    /// fails with a configuration error rather than refusing to boot.
    pub fn from_env<'a>(service_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut secrets = HashMap::new();
        for service_id in service_ids {
            if let Ok(secret) = std::env::var(Self::env_var_name(service_id)) {
                if !secret.is_empty() {
                    secrets.insert(service_id.to_string(), secret);
                }
            }
        }
        Self { secrets }
    }

    /// `minu-find` -> `WEBHOOK_SECRET_MINU_FIND`
    pub fn env_var_name(service_id: &str) -> String {
        format!(
            "{}{}",
            WEBHOOK_SECRET_PREFIX,
            service_id.replace('-', "_").to_uppercase()
        )
    }

    /// Secret for a service, if provisioned
    pub fn get(&self, service_id: &str) -> Option<&str> {
        self.secrets.get(service_id).map(String::as_str)
    }

    /// Number of provisioned services
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

/// Complete service authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,

    /// Accepted clock skew for `X-Timestamp`, in seconds
    pub timestamp_tolerance_seconds: i64,

    /// Per-service HMAC secrets
    pub webhook_secrets: WebhookSecrets,
}

impl AuthConfig {
    /// Create from environment variables.
    ///
    /// `MCP_JWT_SECRET` is mandatory.
    pub fn from_env<'a>(service_ids: impl IntoIterator<Item = &'a str>) -> Result<Self, ConfigError> {
        let secret = std::env::var(JWT_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Missing(JWT_SECRET_ENV.to_string()))?;

        let defaults = JwtConfig::default();
        let access_token_expiry = parse_env("MCP_ACCESS_TOKEN_EXPIRY", defaults.access_token_expiry)?;
        let refresh_token_expiry = parse_env("MCP_REFRESH_TOKEN_EXPIRY", defaults.refresh_token_expiry)?;
        let timestamp_tolerance_seconds = parse_env("MCP_TIMESTAMP_TOLERANCE_SECONDS", 300)?;

        Ok(Self {
            jwt: JwtConfig {
                secret,
                access_token_expiry,
                refresh_token_expiry,
                ..defaults
            },
            timestamp_tolerance_seconds,
            webhook_secrets: WebhookSecrets::from_env(service_ids),
        })
    }

    /// Configuration for tests and local tooling
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt: JwtConfig::new(secret),
            timestamp_tolerance_seconds: 300,
            webhook_secrets: WebhookSecrets::new(),
        }
    }

    /// Replace the webhook secret set
    pub fn with_webhook_secrets(mut self, secrets: WebhookSecrets) -> Self {
        self.webhook_secrets = secrets;
        self
    }
}

fn parse_env(name: &str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
