use rust_common::PlatformError;
use thiserror::Error;

/// Errors raised by the token lifecycle.
///
/// Only [`TokenError::InvalidToken`] and [`TokenError::ExpiredToken`] are
/// meant to reach end users, as an authorization failure. The other
/// variants carry internal detail and should be logged, not echoed.
#[derive(Error, Debug)]
pub enum TokenError {
    /// Bad signature, unknown token or malformed input.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token record found but past its expiry.
    #[error("Token expired")]
    ExpiredToken,

    /// JWT encoding failed.
    #[error("Token signing error: {0}")]
    Signing(String),

    /// Credential store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Session-presence cache failure.
    #[error("Presence cache error: {0}")]
    Presence(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or invariant failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Create an invalid-token error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    /// Create a signing error.
    pub fn signing(msg: impl Into<String>) -> Self {
        Self::Signing(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a presence-cache error.
    pub fn presence(msg: impl Into<String>) -> Self {
        Self::Presence(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller should see this as an authorization failure.
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::InvalidToken(_) | Self::ExpiredToken)
    }

    /// Stable error code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => TOKEN_INVALID,
            Self::ExpiredToken => TOKEN_EXPIRED,
            Self::Signing(_) => TOKEN_SIGNING_ERROR,
            Self::Storage(_) => TOKEN_STORAGE_ERROR,
            Self::Presence(_) => TOKEN_PRESENCE_ERROR,
            Self::Config(_) => TOKEN_CONFIG_ERROR,
            Self::Internal(_) => TOKEN_INTERNAL_ERROR,
        }
    }

    /// Message safe to return to a client.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidToken(_) => "Invalid token",
            Self::ExpiredToken => "Token expired",
            _ => "Internal server error",
        }
    }
}

impl From<redis::RedisError> for TokenError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<PlatformError> for TokenError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::InvalidInput(msg) => Self::Config(msg),
            PlatformError::TracingInit(msg) => Self::Config(msg),
            PlatformError::Unavailable(msg) => Self::Presence(msg),
            PlatformError::Internal(msg) => Self::Internal(msg),
        }
    }
}

// Error codes for API responses
pub const TOKEN_INVALID: &str = "TOKEN_INVALID";
pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
pub const TOKEN_SIGNING_ERROR: &str = "TOKEN_SIGNING_ERROR";
pub const TOKEN_STORAGE_ERROR: &str = "TOKEN_STORAGE_ERROR";
pub const TOKEN_PRESENCE_ERROR: &str = "TOKEN_PRESENCE_ERROR";
pub const TOKEN_CONFIG_ERROR: &str = "TOKEN_CONFIG_ERROR";
pub const TOKEN_INTERNAL_ERROR: &str = "TOKEN_INTERNAL_ERROR";
