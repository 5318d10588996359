//! Common error types for the authentication gateway and its microservices.
//!
//! Every token failure is distinct here so callers can log the precise
//! reason, while [`ErrorResponse`] collapses them into a single external
//! category so clients cannot tell an expired token from a forged one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Authentication-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Submitted credentials do not match a known identity.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The request carried no usable bearer token.
    #[error("No bearer token")]
    NoToken,

    /// The token could not be split or decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token is intact but past its validity window.
    #[error("Token expired")]
    TokenExpired,

    /// No candidate key reproduces the token signature.
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token creation failed: {0}")]
    TokenCreationFailed(String),

    /// Authenticated, but refused by an application policy.
    #[error("Forbidden")]
    Forbidden,
}

impl AuthError {
    /// True for every failure of the token verification path.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            AuthError::NoToken
                | AuthError::MalformedToken(_)
                | AuthError::TokenExpired
                | AuthError::InvalidSignature
        )
    }

    /// HTTP status code for this error.
    ///
    /// Authentication failures are 401, authorization failures 403.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::InvalidCredentials => 401,
            AuthError::NoToken
            | AuthError::MalformedToken(_)
            | AuthError::TokenExpired
            | AuthError::InvalidSignature => 401,
            AuthError::Forbidden => 403,
            AuthError::TokenCreationFailed(_) => 500,
        }
    }

    /// Short machine-readable name of the internal reason, for logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::NoToken => "no_token",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenCreationFailed(_) => "token_creation_failed",
            AuthError::Forbidden => "forbidden",
        }
    }
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::Auth(err) => err.status_code(),
            AppError::Validation(_) => 400,
        }
    }
}

/// Error response for API clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&AuthError> for ErrorResponse {
    fn from(err: &AuthError) -> Self {
        let (code, message) = match err {
            AuthError::InvalidCredentials => ("AUTH_INVALID_CREDENTIALS", "Invalid credentials"),
            AuthError::NoToken
            | AuthError::MalformedToken(_)
            | AuthError::TokenExpired
            | AuthError::InvalidSignature => ("AUTH_UNAUTHENTICATED", "Authentication required"),
            AuthError::TokenCreationFailed(_) => ("AUTH_TOKEN_CREATION_FAILED", "Failed to create token"),
            AuthError::Forbidden => ("AUTH_FORBIDDEN", "Access forbidden"),
        };
        Self::new(code, message)
    }
}

impl From<AuthError> for ErrorResponse {
    fn from(err: AuthError) -> Self {
        Self::from(&err)
    }
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        match err {
            AppError::Auth(auth) => Self::from(auth),
            AppError::Validation(msg) => Self::new("VALIDATION_FAILED", "Invalid request").with_details(msg.clone()),
        }
    }
}
