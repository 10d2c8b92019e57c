//! Main token service implementation

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::entities::audit::{AuditEventType, RequestContext};
use crate::domain::entities::service::{scopes, ServiceId};
use crate::domain::entities::token::{
    Claims, IssuedTokens, RetryPolicy, RevocationResult, ServiceToken, TokenRequest, TokenType,
    TokenVerification, GRANT_REFRESH_TOKEN, GRANT_SERVICE_CREDENTIALS, REFRESH_TOKEN_PREFIX,
};
use crate::errors::{AuthError, DomainError, TokenError};
use crate::repositories::TokenRepository;
use crate::services::audit::AuditService;
use crate::services::clock::Clock;

use super::config::TokenServiceConfig;
use super::credentials::{CredentialVerifier, ServiceCredentials};

/// Reason stored on rows revoked by reuse detection
pub const REUSE_REVOCATION_REASON: &str = "refresh_token_reuse";

/// Token hint values accepted on revocation
const TOKEN_TYPE_HINTS: [&str; 2] = ["access_token", "refresh_token"];

/// Width of the stored `client_id` column
const MAX_CLIENT_ID_LEN: usize = 255;

/// A freshly minted pair with the rows that describe it
struct MintedPair {
    access_row: ServiceToken,
    refresh_row: ServiceToken,
    issued: IssuedTokens,
}

/// Caller identity learned while processing a request, for auditing
type Subject = Option<(ServiceId, String)>;

/// Service for issuing, verifying, rotating and revoking service tokens
pub struct TokenService {
    repository: Arc<dyn TokenRepository>,
    credentials: CredentialVerifier,
    audit: Arc<AuditService>,
    clock: Arc<dyn Clock>,
    config: TokenServiceConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Creates a new token service instance
    ///
    /// # Arguments
    ///
    /// * `repository` - Token repository for persistence
    /// * `credentials` - Verifier for HMAC-signed token requests
    /// * `audit` - Audit service receiving every outcome
    /// * `clock` - Time source for issuance and expiry decisions
    /// * `config` - Token service configuration
    pub fn new(
        repository: Arc<dyn TokenRepository>,
        credentials: CredentialVerifier,
        audit: Arc<AuditService>,
        clock: Arc<dyn Clock>,
        config: TokenServiceConfig,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        // Expiry is checked against the injected clock, not the system time
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_exp = false;
        validation.validate_nbf = false;

        Self {
            repository,
            credentials,
            audit,
            clock,
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Issues an access/refresh pair to a service proving its shared secret
    ///
    /// # Arguments
    ///
    /// * `credentials` - Headers and raw body of the token request
    /// * `ctx` - Request metadata for auditing
    ///
    /// # Returns
    ///
    /// * `Ok(IssuedTokens)` - Both tokens were persisted (as hashes)
    /// * `Err(DomainError)` - Rejected before any side effect
    pub async fn issue_tokens(
        &self,
        credentials: &ServiceCredentials<'_>,
        ctx: &RequestContext,
    ) -> Result<IssuedTokens, DomainError> {
        let mut subject: Subject = None;
        let result = self.issue_inner(credentials, ctx, &mut subject).await;

        let (service_id, client_id) = audit_identity(&subject, credentials.service_id);
        self.audit
            .record_outcome(
                ctx,
                AuditEventType::TokenIssued,
                AuditEventType::TokenIssueFailure,
                service_id,
                client_id,
                &result,
                None,
            )
            .await;

        result
    }

    async fn issue_inner(
        &self,
        credentials: &ServiceCredentials<'_>,
        ctx: &RequestContext,
        subject: &mut Subject,
    ) -> Result<IssuedTokens, DomainError> {
        let now = self.clock.now();
        let service_id = self.credentials.verify(credentials, now)?;

        let request: TokenRequest =
            serde_json::from_slice(credentials.body).map_err(|e| AuthError::InvalidRequest {
                reason: format!("Malformed JSON body: {}", e),
            })?;

        match request.grant_type.as_deref() {
            Some(GRANT_SERVICE_CREDENTIALS) => {}
            other => {
                return Err(AuthError::UnsupportedGrantType {
                    grant_type: other.unwrap_or_default().to_string(),
                }
                .into())
            }
        }

        let client_id = request
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest {
                reason: "client_id is required".to_string(),
            })?
            .to_string();
        if client_id.len() > MAX_CLIENT_ID_LEN {
            return Err(AuthError::InvalidRequest {
                reason: format!("client_id exceeds {} characters", MAX_CLIENT_ID_LEN),
            }
            .into());
        }
        *subject = Some((service_id, client_id.clone()));

        let scope = match request.scope {
            None => scopes::default_scopes(),
            Some(requested) => {
                let granted = scopes::filter_known(&requested.into_vec());
                if granted.is_empty() {
                    return Err(AuthError::InvalidScope.into());
                }
                granted
            }
        };

        let pair = self.mint_pair(service_id, &client_id, scope, None, ctx, now)?;
        self.repository
            .save_token_pair(&pair.access_row, &pair.refresh_row)
            .await
            .map_err(|e| {
                tracing::error!(service_id = %service_id, error = %e, "Failed to persist token pair");
                DomainError::Token(TokenError::TokenGenerationFailed)
            })?;

        tracing::info!(
            service_id = %service_id,
            client_id = %client_id,
            access = short_hash(&pair.access_row.token_hash),
            refresh = short_hash(&pair.refresh_row.token_hash),
            "Issued service token pair"
        );

        Ok(pair.issued)
    }

    /// Verifies an access token and, optionally, its scopes
    ///
    /// This is the single verification path for every bearer-protected
    /// operation, including the revocation store check.
    ///
    /// # Arguments
    ///
    /// * `token` - The raw JWT
    /// * `required_scopes` - Scopes that must all be granted
    ///
    /// # Returns
    ///
    /// * `Ok(TokenVerification)` - Identity, scopes and remaining lifetime
    /// * `Err(TokenError)` - invalid, expired, revoked or insufficient scope
    pub async fn verify_access_token<S: AsRef<str>>(
        &self,
        token: &str,
        required_scopes: &[S],
    ) -> Result<TokenVerification, DomainError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TokenError::InvalidToken.into());
        }

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected malformed access token");
                DomainError::Token(TokenError::InvalidToken)
            })?
            .claims;

        let service_id = claims
            .service_id()
            .ok_or(DomainError::Token(TokenError::InvalidToken))?;

        let now = self.clock.now();
        if claims.is_expired_at(now) {
            return Err(TokenError::TokenExpired.into());
        }

        let token_hash = hash_token(token);
        let row = self
            .repository
            .find_by_hash(&token_hash)
            .await?
            .filter(|row| row.token_type == TokenType::Access)
            .ok_or_else(|| {
                tracing::warn!(service_id = %service_id, token = short_hash(&token_hash), "Signed token has no stored row");
                DomainError::Token(TokenError::InvalidToken)
            })?;

        if row.is_revoked {
            return Err(TokenError::TokenRevoked.into());
        }

        if !claims.has_scopes(required_scopes) {
            let missing: Vec<&str> = required_scopes
                .iter()
                .map(AsRef::as_ref)
                .filter(|scope| !claims.scope.iter().any(|s| s == scope))
                .collect();
            return Err(TokenError::InsufficientScope {
                missing: missing.join(" "),
            }
            .into());
        }

        let expires_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(row.expires_at);
        Ok(TokenVerification {
            service_id,
            client_id: claims.client_id,
            scope: claims.scope,
            expires_at,
            remaining_seconds: (claims.exp - now.timestamp()).max(0),
            token_id: row.id,
            jti: claims.jti,
        })
    }

    /// `verify_access_token` with an audit entry, for the verify endpoint
    pub async fn verify<S: AsRef<str>>(
        &self,
        token: &str,
        required_scopes: &[S],
        ctx: &RequestContext,
    ) -> Result<TokenVerification, DomainError> {
        let result = self.verify_access_token(token, required_scopes).await;

        let (service_id, client_id) = match &result {
            Ok(v) => (Some(v.service_id.to_string()), Some(v.client_id.clone())),
            Err(_) => (None, None),
        };
        self.audit
            .record_outcome(
                ctx,
                AuditEventType::TokenVerified,
                AuditEventType::TokenVerificationFailure,
                service_id,
                client_id,
                &result,
                None,
            )
            .await;

        result
    }

    /// Bearer check shared by every protected route.
    ///
    /// Only failures are audited here; the route records its own outcome.
    pub async fn authenticate<S: AsRef<str>>(
        &self,
        token: &str,
        required_scopes: &[S],
        ctx: &RequestContext,
    ) -> Result<TokenVerification, DomainError> {
        let result = self.verify_access_token(token, required_scopes).await;

        if let Err(error) = &result {
            tracing::info!(code = error.code(), endpoint = %ctx.endpoint, "Bearer authentication failed");
            let entry = self
                .audit
                .entry(AuditEventType::AuthenticationFailure, ctx)
                .with_status(error.status_code())
                .with_error_code(error.code());
            self.audit.record(entry).await;
        }

        result
    }

    /// Rotates a refresh token into a new pair
    ///
    /// A token presented after it was already used is treated as stolen:
    /// every token of its service is revoked and `refresh_token_reuse` is
    /// returned.
    ///
    /// # Arguments
    ///
    /// * `grant_type` - Must be `refresh_token`
    /// * `refresh_token` - The raw refresh token
    /// * `ctx` - Request metadata for auditing
    pub async fn refresh_tokens(
        &self,
        grant_type: Option<&str>,
        refresh_token: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<IssuedTokens, DomainError> {
        let mut subject: Subject = None;
        let result = self
            .refresh_inner(grant_type, refresh_token, ctx, &mut subject)
            .await;

        let failure_type = match &result {
            Err(DomainError::Token(TokenError::RefreshTokenReuse)) => AuditEventType::RefreshTokenReuse,
            _ => AuditEventType::TokenRefreshFailure,
        };
        let (service_id, client_id) = audit_identity(&subject, None);
        self.audit
            .record_outcome(
                ctx,
                AuditEventType::TokenRefreshed,
                failure_type,
                service_id,
                client_id,
                &result,
                None,
            )
            .await;

        result
    }

    async fn refresh_inner(
        &self,
        grant_type: Option<&str>,
        refresh_token: Option<&str>,
        ctx: &RequestContext,
        subject: &mut Subject,
    ) -> Result<IssuedTokens, DomainError> {
        match grant_type {
            Some(GRANT_REFRESH_TOKEN) => {}
            other => {
                return Err(AuthError::UnsupportedGrantType {
                    grant_type: other.unwrap_or_default().to_string(),
                }
                .into())
            }
        }

        let raw = refresh_token
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::InvalidRequest {
                reason: "refresh_token is required".to_string(),
            })?;

        let token_hash = hash_token(raw);
        let now = self.clock.now();

        let old = self
            .repository
            .find_refresh_token(&token_hash)
            .await?
            .ok_or(DomainError::Token(TokenError::InvalidToken))?;
        *subject = Some((old.service_id, old.client_id.clone()));

        if old.is_revoked {
            return Err(TokenError::TokenRevoked.into());
        }
        if old.is_expired_at(now) {
            return Err(TokenError::TokenExpired.into());
        }
        if old.used {
            return Err(self.revoke_after_reuse(&old, now).await);
        }

        let pair = self.mint_pair(
            old.service_id,
            &old.client_id,
            old.scope.clone(),
            Some(old.id),
            ctx,
            now,
        )?;

        let rotated = self
            .repository
            .rotate_refresh_token(&token_hash, now, &pair.access_row, &pair.refresh_row)
            .await
            .map_err(|e| {
                tracing::error!(service_id = %old.service_id, error = %e, "Failed to rotate refresh token");
                DomainError::Token(TokenError::TokenGenerationFailed)
            })?;

        if !rotated {
            // Another request changed the row between the read and the update
            let current = self.repository.find_refresh_token(&token_hash).await?;
            return match current {
                Some(row) if row.used => Err(self.revoke_after_reuse(&row, now).await),
                _ => Err(TokenError::TokenRevoked.into()),
            };
        }

        tracing::info!(
            service_id = %old.service_id,
            rotated_from = short_hash(&token_hash),
            refresh = short_hash(&pair.refresh_row.token_hash),
            "Rotated refresh token"
        );

        Ok(pair.issued)
    }

    /// Revoke every token of the service that presented a consumed refresh token
    async fn revoke_after_reuse(&self, reused: &ServiceToken, now: DateTime<Utc>) -> DomainError {
        match self
            .repository
            .revoke_all_service_tokens(reused.service_id, REUSE_REVOCATION_REASON, now)
            .await
        {
            Ok(count) => {
                tracing::warn!(
                    service_id = %reused.service_id,
                    token = short_hash(&reused.token_hash),
                    revoked = count,
                    "Refresh token reuse detected; revoked all service tokens"
                );
                TokenError::RefreshTokenReuse.into()
            }
            Err(e) => {
                tracing::error!(service_id = %reused.service_id, error = %e, "Failed to revoke tokens after reuse");
                e
            }
        }
    }

    /// Revokes a token on behalf of an authenticated caller
    ///
    /// Unknown tokens produce the same response as known ones. Any
    /// authenticated service may revoke any token.
    ///
    /// # Arguments
    ///
    /// * `token` - Raw access or refresh token
    /// * `token_type_hint` - `access_token` or `refresh_token`; advisory
    /// * `reason` - Free-form reason stored on the row
    /// * `caller` - The verified identity of the revoking service
    /// * `ctx` - Request metadata for auditing
    pub async fn revoke_token(
        &self,
        token: &str,
        token_type_hint: Option<&str>,
        reason: Option<&str>,
        caller: &TokenVerification,
        ctx: &RequestContext,
    ) -> Result<RevocationResult, DomainError> {
        let raw = token.trim();
        let now = self.clock.now();

        let result = if raw.is_empty() {
            Err(AuthError::InvalidRequest {
                reason: "token is required".to_string(),
            }
            .into())
        } else {
            if let Some(hint) = token_type_hint {
                if !TOKEN_TYPE_HINTS.contains(&hint) {
                    tracing::debug!(hint, "Ignoring unknown token_type_hint");
                }
            }

            let reason = format!(
                "{}; revoked_by={}",
                reason.map(str::trim).filter(|r| !r.is_empty()).unwrap_or("revoked"),
                caller.service_id
            );
            self.repository
                .revoke_token(&hash_token(raw), &reason, now)
                .await
        };

        let details = match &result {
            Ok(found) => Some(serde_json::json!({
                "found": found.is_some(),
                "token_id": found.as_ref().map(|r| r.id.to_string()),
                "token_type_hint": token_type_hint,
            })),
            Err(_) => None,
        };
        self.audit
            .record_outcome(
                ctx,
                AuditEventType::TokenRevoked,
                AuditEventType::TokenRevoked,
                Some(caller.service_id.to_string()),
                Some(caller.client_id.clone()),
                &result,
                details,
            )
            .await;

        let revoked = result?;
        Ok(RevocationResult {
            revoked: true,
            revoked_at: revoked.map(|r| r.revoked_at).unwrap_or(now),
        })
    }

    /// Mints an access JWT and an opaque refresh token with their rows
    fn mint_pair(
        &self,
        service_id: ServiceId,
        client_id: &str,
        scope: Vec<String>,
        parent_token_id: Option<Uuid>,
        ctx: &RequestContext,
        now: DateTime<Utc>,
    ) -> Result<MintedPair, DomainError> {
        let mut claims = Claims::new_access_token(
            service_id,
            client_id,
            scope.clone(),
            now,
            self.config.access_token_expiry_seconds,
        );
        claims.iss = self.config.issuer.clone();
        claims.aud = self.config.audience.clone();

        let access_token = self.encode_jwt(&claims)?;
        let refresh_token = generate_refresh_token();

        let access_row = ServiceToken::access(&claims, service_id, hash_token(&access_token))
            .with_parent(parent_token_id)
            .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone());
        let refresh_row = ServiceToken::refresh(
            service_id,
            client_id,
            hash_token(&refresh_token),
            scope.clone(),
            now,
            self.config.refresh_token_expiry_seconds,
        )
        .with_parent(parent_token_id)
        .with_request_context(ctx.ip_address.clone(), ctx.user_agent.clone());

        Ok(MintedPair {
            access_row,
            refresh_row,
            issued: IssuedTokens {
                access_token,
                refresh_token,
                expires_in: self.config.access_token_expiry_seconds,
                refresh_expires_in: self.config.refresh_token_expiry_seconds,
                token_type: "Bearer".to_string(),
                scope,
                issued_at: now,
                retry_policy: RetryPolicy::default(),
            },
        })
    }

    /// Encodes claims into a JWT
    pub(crate) fn encode_jwt(&self, claims: &Claims) -> Result<String, DomainError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|_| DomainError::Token(TokenError::TokenGenerationFailed))
    }
}

/// SHA-256 hex digest used as the storage key of a raw token
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `mcp_rt_` followed by 256 bits of OS randomness in hex
fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    format!("{}{}", REFRESH_TOKEN_PREFIX, hex::encode(bytes))
}

/// First 8 hex chars, enough to correlate log lines
fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

fn audit_identity(subject: &Subject, claimed_service: Option<&str>) -> (Option<String>, Option<String>) {
    match subject {
        Some((service_id, client_id)) => (Some(service_id.to_string()), Some(client_id.clone())),
        None => (claimed_service.map(str::to_string), None),
    }
}
