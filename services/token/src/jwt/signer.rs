//! HS256 signing and verification.
//!
//! Access and refresh tokens each get their own [`TokenSigner`], built from
//! independent secrets, so a refresh token never verifies as an access
//! token and vice versa.

use crate::error::TokenError;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Which half of a token pair a signer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

pub struct TokenSigner {
    kind: TokenKind,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Create an HS256 signer. `exp` is required and checked with the
    /// library's default leeway.
    pub fn hs256(kind: TokenKind, secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        TokenSigner {
            kind,
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::signing(format!("{} token: {}", self.kind.as_str(), e)))
    }

    /// Verify signature and expiry.
    ///
    /// A token whose signature is valid but whose `exp` has passed yields
    /// [`TokenError::ExpiredToken`]; every other failure is
    /// [`TokenError::InvalidToken`]. Callers decide whether the distinction
    /// matters to them.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::invalid(format!("{} token: {}", self.kind.as_str(), e)),
            })
    }
}
