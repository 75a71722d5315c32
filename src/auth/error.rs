use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use thiserror::Error;

/// Why a bearer token was rejected.
///
/// Every variant collapses to a 401 at the HTTP boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The `Authorization` header is not `Bearer <token>`.
    #[error("Authorization header format must be Bearer {{token}}")]
    MalformedHeader,

    /// The token could not be decoded.
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// The token header carries no `kid`.
    #[error("Token header is missing the 'kid' claim")]
    MissingKeyId,

    /// The token is signed with an algorithm other than the configured one.
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// No cached signing key matches the token's `kid`.
    #[error("No signing key found for kid '{0}'")]
    KeyNotFound(String),

    /// The signature does not verify against the issuer's key.
    #[error("Invalid token signature")]
    InvalidSignature,

    /// `exp` is in the past or `nbf` is in the future.
    #[error("Token is expired or not yet valid")]
    TokenExpired,

    /// `iss` does not match the configured issuer.
    #[error("Token issuer does not match")]
    IssuerMismatch,

    /// `aud` does not contain the configured audience.
    #[error("Token audience does not match")]
    AudienceMismatch,

    /// The issuer's key set could not be fetched or used.
    #[error("JWKS fetch failed: {0}")]
    JwksFetch(String),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidKeyFormat | ErrorKind::InvalidRsaKey(_) => {
                AuthError::InvalidSignature
            }
            ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => AuthError::TokenExpired,
            ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
            ErrorKind::InvalidAudience => AuthError::AudienceMismatch,
            ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm(e.to_string()),
            ErrorKind::MissingRequiredClaim(claim) => match claim.as_str() {
                "iss" => AuthError::IssuerMismatch,
                "aud" => AuthError::AudienceMismatch,
                other => AuthError::MalformedToken(format!("missing required claim '{other}'")),
            },
            _ => AuthError::MalformedToken(e.to_string()),
        }
    }
}
