//! Service token route handlers
//!
//! - Issuance from signed service credentials
//! - Verification for downstream services
//! - Refresh token rotation
//! - Revocation

pub mod refresh;
pub mod revoke;
pub mod token;
pub mod verify;

use actix_web::{http::header, HttpResponse};

use mcp_core::domain::entities::token::IssuedTokens;

/// Token responses must never be cached
pub(crate) fn token_response(tokens: &IssuedTokens) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .insert_header((header::PRAGMA, "no-cache"))
        .json(tokens)
}
