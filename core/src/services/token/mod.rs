//! Token service module for service-to-service authentication
//!
//! This module handles:
//! - HMAC verification of token requests
//! - HS256 access token generation and verification
//! - Refresh token rotation with reuse detection
//! - Token revocation

mod config;
mod credentials;
mod service;


pub use config::TokenServiceConfig;
pub use credentials::{
    sign, CredentialVerifier, ServiceCredentials, SERVICE_ID_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
pub use service::{hash_token, TokenService, REUSE_REVOCATION_REASON};
