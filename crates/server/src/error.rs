use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lookup failures of the in-memory stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("identity not found")]
    IdentityNotFound,
    /// Never issued, already consumed or expired. Callers cannot tell which.
    #[error("authorization code not found")]
    CodeNotFound,
}

/// Reasons a bearer token failed verification.
///
/// Only used for logging; clients always see `invalid_token`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token is expired")]
    Expired,
}

/// Protocol-level errors surfaced to OAuth2 clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OAuthError {
    #[error("invalid_request")]
    InvalidRequest,
    #[error("unsupported_response_type")]
    UnsupportedResponseType,
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    #[error("access_denied")]
    AccessDenied,
    #[error("invalid_token")]
    InvalidToken,
    /// Internal failure unrelated to the request, e.g. token signing.
    #[error("server_error")]
    ServerError,
}

impl OAuthError {
    /// The `error` value sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest => "invalid_request",
            OAuthError::UnsupportedResponseType => "unsupported_response_type",
            OAuthError::UnsupportedGrantType => "unsupported_grant_type",
            OAuthError::AccessDenied => "access_denied",
            OAuthError::InvalidToken => "invalid_token",
            OAuthError::ServerError => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OAuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            OAuthError::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<TokenError> for OAuthError {
    fn from(_: TokenError) -> Self {
        OAuthError::InvalidToken
    }
}

/// JSON error body for the token and userinfo endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<OAuthError> for ErrorResponse {
    fn from(error: OAuthError) -> Self {
        Self {
            error: error.code().to_string(),
        }
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::from(self))).into_response()
    }
}
