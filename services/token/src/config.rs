//! Centralized configuration for the token lifecycle.
//!
//! All configuration is loaded from environment variables (optionally via a
//! `.env` file) and validated at startup.

use crate::error::TokenError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rust_common::{CacheClientConfig, TracingConfig};
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Order of the two writes in a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPolicy {
    /// Issue the new pair, then revoke the old one. A crash in between
    /// leaves the old pair usable.
    #[default]
    IssueThenRevoke,
    /// Revoke the old pair, then issue. A crash in between leaves the
    /// principal logged out, but a refresh token can never be exchanged
    /// twice.
    RevokeThenIssue,
}

impl FromStr for RotationPolicy {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "issue-then-revoke" => Ok(Self::IssueThenRevoke),
            "revoke-then-issue" => Ok(Self::RevokeThenIssue),
            _ => Err(TokenError::config(format!("Invalid ROTATION_POLICY: {}", s))),
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IssueThenRevoke => "issue-then-revoke",
            Self::RevokeThenIssue => "revoke-then-issue",
        }
    }
}

/// Where token records and presence markers live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local maps; records vanish on restart.
    Memory,
    /// Redis, shared by all instances.
    Redis {
        /// Connection URL
        url: String,
    },
}

/// Secrets, lifetimes and policy for issued tokens.
#[derive(Debug)]
pub struct TokenSettings {
    /// Signs access tokens
    pub access_secret: SecretString,
    /// Signs refresh tokens; independent of the access secret
    pub refresh_secret: SecretString,
    /// Access token TTL
    pub access_ttl: Duration,
    /// Refresh token TTL
    pub refresh_ttl: Duration,
    /// `pv` marker embedded in access tokens
    pub policy_version: u32,
    /// Rotation write order
    pub rotation_policy: RotationPolicy,
}

impl TokenSettings {
    /// Settings with the admin backend's default lifetimes: one day for
    /// access tokens, thirty days for refresh tokens.
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        TokenSettings {
            access_secret: SecretString::from(access_secret.into()),
            refresh_secret: SecretString::from(refresh_secret.into()),
            access_ttl: Duration::from_secs(86_400),
            refresh_ttl: Duration::from_secs(2_592_000),
            policy_version: 1,
            rotation_policy: RotationPolicy::default(),
        }
    }

    #[must_use]
    pub const fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    #[must_use]
    pub const fn with_policy_version(mut self, version: u32) -> Self {
        self.policy_version = version;
        self
    }

    #[must_use]
    pub const fn with_rotation_policy(mut self, policy: RotationPolicy) -> Self {
        self.rotation_policy = policy;
        self
    }

    /// Check the invariants the lifecycle relies on.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] on empty or shared secrets, a zero
    /// access TTL, or a refresh TTL shorter than the access TTL.
    pub fn validate(&self) -> Result<(), TokenError> {
        let access = self.access_secret.expose_secret();
        let refresh = self.refresh_secret.expose_secret();

        if access.is_empty() || refresh.is_empty() {
            return Err(TokenError::config("JWT secrets must not be empty"));
        }
        if access == refresh {
            return Err(TokenError::config(
                "JWT_SECRET and JWT_REFRESH_SECRET must differ",
            ));
        }
        if self.access_ttl.is_zero() {
            return Err(TokenError::config("JWT_EXPIRE must be positive"));
        }
        if self.refresh_ttl < self.access_ttl {
            return Err(TokenError::config(
                "REFRESH_EXPIRE must not be shorter than JWT_EXPIRE",
            ));
        }
        Ok(())
    }
}

/// Token lifecycle configuration.
#[derive(Debug)]
pub struct Config {
    /// Signing and lifetime settings
    pub tokens: TokenSettings,
    /// Record and presence backend
    pub store: StoreBackend,
    /// Key prefix for Redis backends
    pub redis_prefix: String,
    /// In-process presence cache settings (memory backend)
    pub presence: CacheClientConfig,
    /// Read-through cache TTL; zero disables the cache
    pub record_cache_ttl: Duration,
    /// Read-through cache capacity
    pub record_cache_size: NonZeroUsize,
    /// Logging settings
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is malformed or the token settings
    /// are inconsistent.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_source(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_source<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = secret_or_random(&lookup, "JWT_SECRET");
        let refresh_secret = secret_or_random(&lookup, "JWT_REFRESH_SECRET");

        let tokens = TokenSettings {
            access_secret,
            refresh_secret,
            access_ttl: Duration::from_secs(parse_var(&lookup, "JWT_EXPIRE", 86_400)?),
            refresh_ttl: Duration::from_secs(parse_var(&lookup, "REFRESH_EXPIRE", 2_592_000)?),
            policy_version: parse_var(&lookup, "POLICY_VERSION", 1)?,
            rotation_policy: parse_var(&lookup, "ROTATION_POLICY", RotationPolicy::default())?,
        };
        tokens.validate()?;

        let redis_url =
            lookup("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let store = match lookup("TOKEN_STORE")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "redis" => StoreBackend::Redis { url: redis_url },
            other => return Err(TokenError::config(format!("Invalid TOKEN_STORE: {}", other))),
        };
        let redis_prefix = lookup("REDIS_PREFIX").unwrap_or_else(|| "token".to_string());

        let presence = CacheClientConfig::default()
            .with_namespace(lookup("PRESENCE_NAMESPACE").unwrap_or_else(|| "admin".to_string()))
            .with_default_ttl(tokens.access_ttl);

        let record_cache_ttl = Duration::from_secs(parse_var(&lookup, "RECORD_CACHE_TTL", 5)?);
        let record_cache_size = NonZeroUsize::new(parse_var(&lookup, "RECORD_CACHE_SIZE", 1024)?)
            .ok_or_else(|| TokenError::config("RECORD_CACHE_SIZE must be positive"))?;

        let tracing = TracingConfig::default()
            .with_service_name("token-lifecycle")
            .with_log_level(lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()))
            .with_json_output(parse_var(&lookup, "LOG_JSON", false)?);

        Ok(Self {
            tokens,
            store,
            redis_prefix,
            presence,
            record_cache_ttl,
            record_cache_size,
            tracing,
        })
    }
}

/// Parse a variable, falling back to `default` when unset.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {}: {}", name, e))),
        None => Ok(default),
    }
}

/// Read a secret, generating a random one for development when unset.
fn secret_or_random<F>(lookup: &F, name: &str) -> SecretString
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(secret) => SecretString::from(secret),
        None => {
            use rand::RngCore;
            let mut bytes = [0u8; 32];
            rand::thread_rng().fill_bytes(&mut bytes);
            warn!(variable = name, "Secret not set, using a random one; tokens will not survive a restart");
            SecretString::from(STANDARD.encode(bytes))
        }
    }
}
