pub mod claims;
pub mod signer;

pub use claims::{AccessClaims, PrincipalId, RefreshClaims};
pub use signer::{TokenKind, TokenSigner};
