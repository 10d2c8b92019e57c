pub mod auth_dto;

pub use auth_dto::{
    RefreshTokenRequest, RevokeTokenRequest, VerifyTokenFailure, VerifyTokenRequest,
    VerifyTokenResponse,
};
