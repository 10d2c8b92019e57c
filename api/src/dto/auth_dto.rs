use serde::{Deserialize, Serialize};
use validator::Validate;

use mcp_core::domain::entities::token::{ScopeParam, TokenVerification};

/// Body of `POST /mcp-auth/verify`
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyTokenRequest {
    #[serde(default)]
    pub token: String,
    /// A single scope, a space-delimited list or a JSON array
    #[serde(default)]
    pub required_scope: Option<ScopeParam>,
}

impl VerifyTokenRequest {
    pub fn required_scopes(&self) -> Vec<String> {
        self.required_scope
            .clone()
            .map(ScopeParam::into_vec)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyTokenResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub verification: TokenVerification,
}

/// Verification failure; the status code carries the error class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenFailure {
    pub valid: bool,
    pub error: String,
    pub message: String,
}

/// Body of `POST /mcp-auth/refresh`; both fields are checked by the service
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body of `POST /mcp-auth/revoke`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RevokeTokenRequest {
    #[validate(length(min = 1, max = 4096))]
    pub token: String,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub token_type_hint: Option<String>,
    // The revoker's id is appended before storage
    #[serde(default)]
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}
