//! Service token entities for the access/refresh token lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::service::ServiceId;

/// Access token lifetime (15 minutes)
pub const ACCESS_TOKEN_EXPIRY_SECONDS: i64 = 900;

/// Refresh token lifetime (7 days)
pub const REFRESH_TOKEN_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// JWT issuer
pub const JWT_ISSUER: &str = "mcp-auth";

/// JWT audience
pub const JWT_AUDIENCE: &str = "central-hub";

/// Prefix that marks an opaque string as a refresh token
pub const REFRESH_TOKEN_PREFIX: &str = "mcp_rt_";

/// Grant type accepted by the issuer
pub const GRANT_SERVICE_CREDENTIALS: &str = "service_credentials";

/// Grant type accepted by the refresher
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Kind of stored token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenType::Access),
            "refresh" => Ok(TokenType::Refresh),
            _ => Err(format!("Unknown token type: {}", s)),
        }
    }
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer (`mcp-auth`)
    pub iss: String,

    /// Subject: the calling service id
    pub sub: String,

    /// Audience (`central-hub`)
    pub aud: String,

    /// Issued at (unix seconds)
    pub iat: i64,

    /// Expiration (unix seconds)
    pub exp: i64,

    /// JWT ID, unique per token
    pub jti: String,

    /// Granted scopes
    pub scope: Vec<String>,

    /// Caller-supplied client identifier
    pub client_id: String,
}

impl Claims {
    /// Creates claims for a fresh access token
    ///
    /// # Arguments
    ///
    /// * `service_id` - The authenticated service
    /// * `client_id` - Client identifier from the token request
    /// * `scope` - Granted scopes
    /// * `issued_at` - Issue time taken from the service clock
    /// * `lifetime_seconds` - Seconds until expiry
    pub fn new_access_token(
        service_id: ServiceId,
        client_id: impl Into<String>,
        scope: Vec<String>,
        issued_at: DateTime<Utc>,
        lifetime_seconds: i64,
    ) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: JWT_ISSUER.to_string(),
            sub: service_id.as_str().to_string(),
            aud: JWT_AUDIENCE.to_string(),
            iat,
            exp: iat + lifetime_seconds,
            jti: Uuid::new_v4().to_string(),
            scope,
            client_id: client_id.into(),
        }
    }

    /// Checks if the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Whether every required scope is granted
    pub fn has_scopes<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .all(|r| self.scope.iter().any(|s| s == r.as_ref()))
    }

    /// Parses the subject as a known service
    pub fn service_id(&self) -> Option<ServiceId> {
        self.sub.parse().ok()
    }
}

/// Persisted record of an issued token. Only the hash of the raw token is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceToken {
    pub id: Uuid,
    pub service_id: ServiceId,
    pub client_id: String,

    /// SHA-256 hex digest of the raw token
    pub token_hash: String,

    pub token_type: TokenType,
    pub scope: Vec<String>,

    /// JWT ID (access tokens only)
    pub jti: Option<String>,

    /// Refresh token this pair was rotated from
    pub parent_token_id: Option<Uuid>,

    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,

    /// Single-use flag (refresh tokens only)
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ServiceToken {
    fn new(
        service_id: ServiceId,
        client_id: impl Into<String>,
        token_hash: String,
        token_type: TokenType,
        scope: Vec<String>,
        created_at: DateTime<Utc>,
        lifetime_seconds: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_id,
            client_id: client_id.into(),
            token_hash,
            token_type,
            scope,
            jti: None,
            parent_token_id: None,
            expires_at: created_at + Duration::seconds(lifetime_seconds),
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            used: false,
            used_at: None,
            ip_address: None,
            user_agent: None,
            created_at,
        }
    }

    /// Row for an access token described by `claims`
    pub fn access(claims: &Claims, service_id: ServiceId, token_hash: String) -> Self {
        let created_at = DateTime::from_timestamp(claims.iat, 0).unwrap_or_else(Utc::now);
        let mut token = Self::new(
            service_id,
            claims.client_id.clone(),
            token_hash,
            TokenType::Access,
            claims.scope.clone(),
            created_at,
            claims.exp - claims.iat,
        );
        token.jti = Some(claims.jti.clone());
        token
    }

    /// Row for an opaque refresh token
    pub fn refresh(
        service_id: ServiceId,
        client_id: impl Into<String>,
        token_hash: String,
        scope: Vec<String>,
        created_at: DateTime<Utc>,
        lifetime_seconds: i64,
    ) -> Self {
        Self::new(
            service_id,
            client_id,
            token_hash,
            TokenType::Refresh,
            scope,
            created_at,
            lifetime_seconds,
        )
    }

    /// Record the refresh token this one was rotated from
    pub fn with_parent(mut self, parent_token_id: Option<Uuid>) -> Self {
        self.parent_token_id = parent_token_id;
        self
    }

    /// Attach request metadata
    pub fn with_request_context(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Mark revoked. A token that is already revoked keeps its original timestamp and reason.
    pub fn revoke(&mut self, reason: impl Into<String>, at: DateTime<Utc>) {
        if self.is_revoked {
            return;
        }
        self.is_revoked = true;
        self.revoked_at = Some(at);
        self.revoked_reason = Some(reason.into());
    }

    /// Mark a refresh token consumed
    pub fn mark_used(&mut self, at: DateTime<Utc>) {
        self.used = true;
        self.used_at = Some(at);
    }
}

/// Identity of a row touched by revocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedToken {
    pub id: Uuid,
    /// Effective revocation time (the original one if it was already revoked)
    pub revoked_at: DateTime<Utc>,
}

/// Advisory retry hint returned to callers. The hub never re-drives on their behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: String,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: "exponential".to_string(),
            base_delay_ms: 1000,
        }
    }
}

/// Token endpoint response for issuance and rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub token_type: String,
    pub scope: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub retry_policy: RetryPolicy,
}

/// Outcome of a successful access token verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenVerification {
    pub service_id: ServiceId,
    pub client_id: String,
    pub scope: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    #[serde(skip)]
    pub token_id: Uuid,
    #[serde(skip)]
    pub jti: String,
}

/// Revocation response. Unknown tokens produce the same shape as known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevocationResult {
    pub revoked: bool,
    pub revoked_at: DateTime<Utc>,
}

/// Scope as sent by callers: a JSON array or a space-delimited string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeParam {
    List(Vec<String>),
    Delimited(String),
}

impl ScopeParam {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            ScopeParam::List(list) => list,
            ScopeParam::Delimited(s) => s.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Body of `POST /mcp-auth/token`, parsed after the signature check
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub scope: Option<ScopeParam>,
}
