//! Token repository trait defining the interface for service token persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::service::ServiceId;
use crate::domain::entities::token::{RevokedToken, ServiceToken};
use crate::errors::DomainError;

/// Repository trait for ServiceToken persistence operations
///
/// Rows are keyed by the SHA-256 hash of the raw token. Implementations never
/// see raw tokens and never physically delete rows.
///
/// # Concurrency
/// - `save_token_pair` and `rotate_refresh_token` must be atomic
/// - `rotate_refresh_token` must succeed for at most one caller per refresh token
/// - revocation must be monotonic
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a freshly issued access/refresh pair
    ///
    /// # Arguments
    /// * `access` - Access token row
    /// * `refresh` - Refresh token row
    ///
    /// # Returns
    /// * `Ok(())` - Both rows stored
    /// * `Err(DomainError)` - Neither row stored (e.g., duplicate hash)
    async fn save_token_pair(
        &self,
        access: &ServiceToken,
        refresh: &ServiceToken,
    ) -> Result<(), DomainError>;

    /// Find a token of any type by its hash
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ServiceToken>, DomainError>;

    /// Find a refresh token by its hash. Access rows are not returned.
    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<ServiceToken>, DomainError>;

    /// Consume a refresh token and store its successor pair in one step
    ///
    /// The old row is marked used only if it is still unused and not revoked.
    ///
    /// # Returns
    /// * `Ok(true)` - Rotation committed
    /// * `Ok(false)` - Token was consumed or revoked concurrently; nothing stored
    /// * `Err(DomainError)` - Storage failure; nothing stored
    async fn rotate_refresh_token(
        &self,
        old_token_hash: &str,
        used_at: DateTime<Utc>,
        new_access: &ServiceToken,
        new_refresh: &ServiceToken,
    ) -> Result<bool, DomainError>;

    /// Revoke a single token
    ///
    /// # Returns
    /// * `Ok(Some(RevokedToken))` - Token exists; `revoked_at` is the effective
    ///   timestamp, which stays the original one when it was already revoked
    /// * `Ok(None)` - No token with this hash
    async fn revoke_token(
        &self,
        token_hash: &str,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<RevokedToken>, DomainError>;

    /// Revoke every token issued to a service
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of rows newly revoked
    async fn revoke_all_service_tokens(
        &self,
        service_id: ServiceId,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<usize, DomainError>;
}
