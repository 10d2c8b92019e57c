//! HMAC-signed service credential verification for token issuance.

use chrono::{DateTime, Utc};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use mcp_shared::config::{AuthConfig, WebhookSecrets};
use sha2::Sha256;

use crate::domain::entities::service::ServiceId;
use crate::errors::{AuthError, DomainError};

type HmacSha256 = Hmac<Sha256>;

/// Header names carrying the credentials
pub const SERVICE_ID_HEADER: &str = "X-Service-Id";
pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Values above this are read as unix milliseconds
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Raw credential material from a token request
#[derive(Debug, Clone, Copy)]
pub struct ServiceCredentials<'a> {
    pub service_id: Option<&'a str>,
    pub signature: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    /// Request body exactly as received
    pub body: &'a [u8],
}

/// Verifies `X-Signature = hex(HMAC-SHA256(secret, raw body))`
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    secrets: WebhookSecrets,
    timestamp_tolerance_seconds: i64,
}

impl CredentialVerifier {
    pub fn new(secrets: WebhookSecrets, timestamp_tolerance_seconds: i64) -> Self {
        Self {
            secrets,
            timestamp_tolerance_seconds,
        }
    }

    pub fn from_auth_config(config: &AuthConfig) -> Self {
        Self::new(
            config.webhook_secrets.clone(),
            config.timestamp_tolerance_seconds,
        )
    }

    /// Check credentials in order: service id, signature presence,
    /// timestamp window, secret provisioning, signature match.
    pub fn verify(
        &self,
        credentials: &ServiceCredentials<'_>,
        now: DateTime<Utc>,
    ) -> Result<ServiceId, DomainError> {
        let raw_service_id = credentials
            .service_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::MissingHeader {
                header: SERVICE_ID_HEADER.to_string(),
            })?;
        let service_id: ServiceId =
            raw_service_id
                .parse()
                .map_err(|_| AuthError::InvalidService {
                    service_id: raw_service_id.to_string(),
                })?;

        let signature = credentials
            .signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::MissingHeader {
                header: SIGNATURE_HEADER.to_string(),
            })?;

        if let Some(raw) = credentials.timestamp.map(str::trim).filter(|s| !s.is_empty()) {
            let timestamp = parse_timestamp(raw).ok_or(AuthError::InvalidTimestamp)?;
            let skew = (now - timestamp).num_seconds().abs();
            if skew > self.timestamp_tolerance_seconds {
                tracing::debug!(service_id = %service_id, skew, "Token request outside timestamp window");
                return Err(AuthError::InvalidTimestamp.into());
            }
        }

        let secret = self
            .secrets
            .get(service_id.as_str())
            .ok_or_else(|| AuthError::ConfigurationError {
                service_id: service_id.to_string(),
            })?;

        if !signature_matches(secret.as_bytes(), credentials.body, signature) {
            tracing::warn!(service_id = %service_id, "Token request signature mismatch");
            return Err(AuthError::InvalidSignature.into());
        }

        Ok(service_id)
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`
pub fn sign(secret: &[u8], body: &[u8]) -> String {
    hex::encode(compute_mac(secret, body))
}

fn compute_mac(secret: &[u8], body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

fn signature_matches(secret: &[u8], body: &[u8], provided: &str) -> bool {
    let provided = provided
        .strip_prefix("sha256=")
        .unwrap_or(provided)
        .to_ascii_lowercase();
    let provided = match hex::decode(provided) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let expected = compute_mac(secret, body);
    !expected.is_empty() && constant_time_eq(&expected, &provided)
}

/// Unix seconds, unix milliseconds or RFC 3339
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(value) = raw.parse::<i64>() {
        return if value > MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(value)
        } else {
            DateTime::from_timestamp(value, 0)
        };
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
