//! In-memory implementation of TokenRepository for tests and local runs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::service::ServiceId;
use crate::domain::entities::token::{RevokedToken, ServiceToken, TokenType};
use crate::errors::DomainError;

use super::TokenRepository;

/// Mock token repository. A single write lock makes pair inserts and
/// rotations atomic, mirroring the database transaction.
#[derive(Clone)]
pub struct MockTokenRepository {
    tokens: Arc<RwLock<HashMap<String, ServiceToken>>>,
}

impl MockTokenRepository {
    /// Create a new mock repository
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Snapshot of every stored row
    pub async fn all_tokens(&self) -> Vec<ServiceToken> {
        self.tokens.read().await.values().cloned().collect()
    }
}

impl Default for MockTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_absent(
    tokens: &HashMap<String, ServiceToken>,
    rows: [&ServiceToken; 2],
) -> Result<(), DomainError> {
    if rows[0].token_hash == rows[1].token_hash
        || rows.iter().any(|row| tokens.contains_key(&row.token_hash))
    {
        return Err(DomainError::Validation {
            message: "Token already exists".to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl TokenRepository for MockTokenRepository {
    async fn save_token_pair(
        &self,
        access: &ServiceToken,
        refresh: &ServiceToken,
    ) -> Result<(), DomainError> {
        let mut tokens = self.tokens.write().await;
        ensure_absent(&tokens, [access, refresh])?;

        tokens.insert(access.token_hash.clone(), access.clone());
        tokens.insert(refresh.token_hash.clone(), refresh.clone());
        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ServiceToken>, DomainError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<ServiceToken>, DomainError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .get(token_hash)
            .filter(|t| t.token_type == TokenType::Refresh)
            .cloned())
    }

    async fn rotate_refresh_token(
        &self,
        old_token_hash: &str,
        used_at: DateTime<Utc>,
        new_access: &ServiceToken,
        new_refresh: &ServiceToken,
    ) -> Result<bool, DomainError> {
        let mut tokens = self.tokens.write().await;

        let claimable = matches!(
            tokens.get(old_token_hash),
            Some(t) if t.token_type == TokenType::Refresh && !t.used && !t.is_revoked
        );
        if !claimable {
            return Ok(false);
        }
        ensure_absent(&tokens, [new_access, new_refresh])?;

        if let Some(old) = tokens.get_mut(old_token_hash) {
            old.mark_used(used_at);
        }
        tokens.insert(new_access.token_hash.clone(), new_access.clone());
        tokens.insert(new_refresh.token_hash.clone(), new_refresh.clone());
        Ok(true)
    }

    async fn revoke_token(
        &self,
        token_hash: &str,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<RevokedToken>, DomainError> {
        let mut tokens = self.tokens.write().await;

        Ok(tokens.get_mut(token_hash).map(|token| {
            token.revoke(reason, revoked_at);
            RevokedToken {
                id: token.id,
                revoked_at: token.revoked_at.unwrap_or(revoked_at),
            }
        }))
    }

    async fn revoke_all_service_tokens(
        &self,
        service_id: ServiceId,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let mut tokens = self.tokens.write().await;
        let mut count = 0;

        for token in tokens.values_mut() {
            if token.service_id == service_id && !token.is_revoked {
                token.revoke(reason, revoked_at);
                count += 1;
            }
        }

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn pair(service_id: ServiceId, suffix: &str, now: DateTime<Utc>) -> (ServiceToken, ServiceToken) {
        let access = ServiceToken::refresh(
            service_id,
            "client",
            format!("access-{}", suffix),
            vec![],
            now,
            900,
        );
        let access = ServiceToken {
            token_type: TokenType::Access,
            ..access
        };
        let refresh = ServiceToken::refresh(
            service_id,
            "client",
            format!("refresh-{}", suffix),
            vec![],
            now,
            3600,
        );
        (access, refresh)
    }

    #[tokio::test]
    async fn test_save_pair_rejects_duplicates() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let (access, refresh) = pair(ServiceId::MinuFind, "1", now);

        repo.save_token_pair(&access, &refresh).await.unwrap();
        assert!(repo.save_token_pair(&access, &refresh).await.is_err());
        assert_eq!(repo.all_tokens().await.len(), 2);
    }

    #[tokio::test]
    async fn test_find_refresh_token_ignores_access_rows() {
        let repo = MockTokenRepository::new();
        let (access, refresh) = pair(ServiceId::MinuFind, "1", Utc::now());
        repo.save_token_pair(&access, &refresh).await.unwrap();

        assert!(repo.find_refresh_token("access-1").await.unwrap().is_none());
        assert!(repo.find_refresh_token("refresh-1").await.unwrap().is_some());
        assert!(repo.find_by_hash("access-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rotation_succeeds_once() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let (a1, r1) = pair(ServiceId::MinuBuild, "1", now);
        let (a2, r2) = pair(ServiceId::MinuBuild, "2", now);
        let (a3, r3) = pair(ServiceId::MinuBuild, "3", now);
        repo.save_token_pair(&a1, &r1).await.unwrap();

        assert!(repo.rotate_refresh_token("refresh-1", now, &a2, &r2).await.unwrap());
        assert!(!repo.rotate_refresh_token("refresh-1", now, &a3, &r3).await.unwrap());

        let old = repo.find_by_hash("refresh-1").await.unwrap().unwrap();
        assert!(old.used);
        assert!(repo.find_by_hash("refresh-3").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_keeps_first_timestamp() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let (access, refresh) = pair(ServiceId::MinuKeep, "1", now);
        repo.save_token_pair(&access, &refresh).await.unwrap();

        let first = repo.revoke_token("access-1", "manual", now).await.unwrap().unwrap();
        let second = repo
            .revoke_token("access-1", "again", now + Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second);
        assert!(repo.revoke_token("missing", "manual", now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_all_is_scoped_to_service() {
        let repo = MockTokenRepository::new();
        let now = Utc::now();
        let (a1, r1) = pair(ServiceId::MinuFind, "find", now);
        let (a2, r2) = pair(ServiceId::MinuFrame, "frame", now);
        repo.save_token_pair(&a1, &r1).await.unwrap();
        repo.save_token_pair(&a2, &r2).await.unwrap();

        let count = repo
            .revoke_all_service_tokens(ServiceId::MinuFind, "refresh_token_reuse", now)
            .await
            .unwrap();

        assert_eq!(count, 2);
        for token in repo.all_tokens().await {
            assert_eq!(token.is_revoked, token.service_id == ServiceId::MinuFind);
        }
    }
}
