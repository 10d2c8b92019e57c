//! MySQL implementation of the TokenRepository trait.
//!
//! Stores service token rows keyed by the SHA-256 hash of the raw token.
//! Rotation runs in one transaction guarded by a conditional update so that
//! at most one caller can consume a refresh token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, Transaction};

use mcp_core::domain::entities::service::ServiceId;
use mcp_core::domain::entities::token::{RevokedToken, ServiceToken, TokenType};
use mcp_core::errors::DomainError;
use mcp_core::repositories::TokenRepository;

use super::{column, db_error, is_unique_violation, parse_enum, parse_uuid};

const TOKEN_COLUMNS: &str = r#"
    id, service_id, client_id, token_hash, token_type, scope, jti, parent_token_id,
    expires_at, is_revoked, revoked_at, revoked_reason, used, used_at,
    ip_address, user_agent, created_at
"#;

/// MySQL implementation of TokenRepository
pub struct MySqlTokenRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlTokenRepository {
    /// Create a new MySQL token repository
    ///
    /// # Arguments
    /// * `pool` - MySQL connection pool from SQLx
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to ServiceToken entity
    fn row_to_token(row: &sqlx::mysql::MySqlRow) -> Result<ServiceToken, DomainError> {
        let id: String = column(row, "id")?;
        let service_id: String = column(row, "service_id")?;
        let token_type: String = column(row, "token_type")?;
        let scope: String = column(row, "scope")?;
        let parent_token_id: Option<String> = column(row, "parent_token_id")?;

        Ok(ServiceToken {
            id: parse_uuid(&id)?,
            service_id: parse_enum::<ServiceId>(&service_id)?,
            client_id: column(row, "client_id")?,
            token_hash: column(row, "token_hash")?,
            token_type: parse_enum::<TokenType>(&token_type)?,
            scope: serde_json::from_str(&scope).map_err(|e| DomainError::Internal {
                message: format!("Invalid scope column: {}", e),
            })?,
            jti: column(row, "jti")?,
            parent_token_id: parent_token_id.as_deref().map(parse_uuid).transpose()?,
            expires_at: column(row, "expires_at")?,
            is_revoked: column(row, "is_revoked")?,
            revoked_at: column(row, "revoked_at")?,
            revoked_reason: column(row, "revoked_reason")?,
            used: column(row, "used")?,
            used_at: column(row, "used_at")?,
            ip_address: column(row, "ip_address")?,
            user_agent: column(row, "user_agent")?,
            created_at: column(row, "created_at")?,
        })
    }

    async fn insert(
        tx: &mut Transaction<'_, MySql>,
        token: &ServiceToken,
    ) -> Result<(), DomainError> {
        let query = r#"
            INSERT INTO mcp_service_tokens (
                id, service_id, client_id, token_hash, token_type, scope, jti, parent_token_id,
                expires_at, is_revoked, revoked_at, revoked_reason, used, used_at,
                ip_address, user_agent, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;

        let scope = serde_json::to_string(&token.scope).map_err(|e| DomainError::Internal {
            message: format!("Failed to encode scope: {}", e),
        })?;

        sqlx::query(query)
            .bind(token.id.to_string())
            .bind(token.service_id.as_str())
            .bind(&token.client_id)
            .bind(&token.token_hash)
            .bind(token.token_type.as_str())
            .bind(scope)
            .bind(&token.jti)
            .bind(token.parent_token_id.map(|id| id.to_string()))
            .bind(token.expires_at)
            .bind(token.is_revoked)
            .bind(token.revoked_at)
            .bind(&token.revoked_reason)
            .bind(token.used)
            .bind(token.used_at)
            .bind(&token.ip_address)
            .bind(&token.user_agent)
            .bind(token.created_at)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::Validation {
                        message: "Token already exists".to_string(),
                    }
                } else {
                    db_error("Failed to save service token", e)
                }
            })?;

        Ok(())
    }

    async fn find_one(&self, query: &str, token_hash: &str) -> Result<Option<ServiceToken>, DomainError> {
        let result = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find service token", e))?;

        result.as_ref().map(Self::row_to_token).transpose()
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn save_token_pair(
        &self,
        access: &ServiceToken,
        refresh: &ServiceToken,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        Self::insert(&mut tx, access).await?;
        Self::insert(&mut tx, refresh).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit token pair", e))
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<ServiceToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM mcp_service_tokens WHERE token_hash = ? LIMIT 1",
            TOKEN_COLUMNS
        );
        self.find_one(&query, token_hash).await
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<ServiceToken>, DomainError> {
        let query = format!(
            "SELECT {} FROM mcp_service_tokens WHERE token_hash = ? AND token_type = 'refresh' LIMIT 1",
            TOKEN_COLUMNS
        );
        self.find_one(&query, token_hash).await
    }

    async fn rotate_refresh_token(
        &self,
        old_token_hash: &str,
        used_at: DateTime<Utc>,
        new_access: &ServiceToken,
        new_refresh: &ServiceToken,
    ) -> Result<bool, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // Only one transaction can flip `used`; the loser sees zero rows affected
        let claimed = sqlx::query(
            r#"
            UPDATE mcp_service_tokens
            SET used = TRUE, used_at = ?
            WHERE token_hash = ? AND token_type = 'refresh'
                AND used = FALSE AND is_revoked = FALSE
            "#,
        )
        .bind(used_at)
        .bind(old_token_hash)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to consume refresh token", e))?;

        if claimed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back rotation", e))?;
            return Ok(false);
        }

        Self::insert(&mut tx, new_access).await?;
        Self::insert(&mut tx, new_refresh).await?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit rotation", e))?;
        Ok(true)
    }

    async fn revoke_token(
        &self,
        token_hash: &str,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<Option<RevokedToken>, DomainError> {
        // First revocation wins; later calls keep the original timestamp and reason
        sqlx::query(
            r#"
            UPDATE mcp_service_tokens
            SET is_revoked = TRUE, revoked_at = ?, revoked_reason = ?
            WHERE token_hash = ? AND is_revoked = FALSE
            "#,
        )
        .bind(revoked_at)
        .bind(reason)
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to revoke token", e))?;

        let row = sqlx::query(
            "SELECT id, revoked_at FROM mcp_service_tokens WHERE token_hash = ? LIMIT 1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to read revoked token", e))?;

        match row {
            Some(row) => {
                let id: String = column(&row, "id")?;
                let effective: Option<DateTime<Utc>> = column(&row, "revoked_at")?;
                Ok(Some(RevokedToken {
                    id: parse_uuid(&id)?,
                    revoked_at: effective.unwrap_or(revoked_at),
                }))
            }
            None => Ok(None),
        }
    }

    async fn revoke_all_service_tokens(
        &self,
        service_id: ServiceId,
        reason: &str,
        revoked_at: DateTime<Utc>,
    ) -> Result<usize, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE mcp_service_tokens
            SET is_revoked = TRUE, revoked_at = ?, revoked_reason = ?
            WHERE service_id = ? AND is_revoked = FALSE
            "#,
        )
        .bind(revoked_at)
        .bind(reason)
        .bind(service_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to revoke service tokens", e))?;

        Ok(result.rows_affected() as usize)
    }
}
