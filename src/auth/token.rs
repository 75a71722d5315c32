use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

use super::{error::AuthError, keys::KeyProvider};

/// The only signing algorithm accepted from the issuer.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// The custom claims block carried by admin tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomClaims {
    /// Space-delimited scopes.
    #[serde(default)]
    pub scope: String,
    /// Discrete permissions, in issuer order.
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawClaims {
    iss: String,
    #[serde(default)]
    aud: Option<Audience>,
    exp: i64,
    #[serde(default)]
    nbf: Option<i64>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    permissions: Option<Vec<String>>,
}

/// A token whose signature and registered claims have been checked.
///
/// Produced once per request by [`TokenValidator`] and stored in the
/// request extensions; handlers and guards only ever read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    pub issuer: String,
    pub audience: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub not_before: Option<DateTime<Utc>>,
    pub subject: String,
    pub claims: CustomClaims,
}

impl ValidatedToken {
    /// The scope string split on single spaces.
    pub fn scopes(&self) -> HashSet<&str> {
        self.claims
            .scope
            .split(' ')
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Exact membership of `scope` in the scope set.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes().contains(scope)
    }

    /// Exact membership of `permission` in the permission list.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.claims.permissions.iter().any(|p| p == permission)
    }
}

fn timestamp(seconds: i64, claim: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AuthError::MalformedToken(format!("'{claim}' is out of range")))
}

impl TryFrom<RawClaims> for ValidatedToken {
    type Error = AuthError;

    fn try_from(raw: RawClaims) -> Result<Self, Self::Error> {
        let audience = match raw.aud {
            Some(Audience::One(aud)) => vec![aud],
            Some(Audience::Many(auds)) => auds,
            None => Vec::new(),
        };

        Ok(Self {
            issuer: raw.iss,
            audience,
            expires_at: timestamp(raw.exp, "exp")?,
            not_before: raw.nbf.map(|nbf| timestamp(nbf, "nbf")).transpose()?,
            subject: raw.sub.unwrap_or_default(),
            claims: CustomClaims {
                scope: raw.scope.unwrap_or_default(),
                permissions: raw.permissions.unwrap_or_default(),
            },
        })
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively.
pub fn bearer_token(header_value: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header_value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Verifies bearer tokens against the issuer's keys and registered claims.
pub struct TokenValidator {
    keys: Arc<KeyProvider>,
    issuer: String,
    audience: String,
    validation: Validation,
}

impl TokenValidator {
    /// Creates a validator accepting RS256 tokens from `issuer` for `audience`.
    pub fn new(keys: Arc<KeyProvider>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let audience = audience.into();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_issuer(&[&issuer]);
        validation.set_audience(&[&audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            keys,
            issuer,
            audience,
            validation,
        }
    }

    /// The accepted issuer.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The accepted audience.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Validates a raw token.
    ///
    /// # Arguments
    ///
    /// * `token` - The compact JWT, without the `Bearer` prefix.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `ValidatedToken`.
    pub async fn validate(&self, token: &str) -> Result<ValidatedToken, AuthError> {
        let header = decode_header(token).map_err(|e| AuthError::MalformedToken(e.to_string()))?;

        if header.alg != SIGNING_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }

        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
        let signing_key = self.keys.key_for(&kid).await?;

        let data = decode::<RawClaims>(token, &signing_key.key, &self.validation)?;
        let validated = ValidatedToken::try_from(data.claims)?;

        tracing::debug!("✅ Token validated for subject: {}", validated.subject);
        Ok(validated)
    }

    /// Validates the value of an `Authorization` header.
    pub async fn validate_header(&self, header_value: &str) -> Result<ValidatedToken, AuthError> {
        self.validate(bearer_token(header_value)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_scope(scope: &str, permissions: &[&str]) -> ValidatedToken {
        ValidatedToken {
            issuer: "https://issuer.example/".to_string(),
            audience: vec!["https://api.example".to_string()],
            expires_at: Utc::now(),
            not_before: None,
            subject: "user".to_string(),
            claims: CustomClaims {
                scope: scope.to_string(),
                permissions: permissions.iter().map(|p| p.to_string()).collect(),
            },
        }
    }

    #[test]
    fn bearer_prefix_is_required() {
        assert_eq!(bearer_token("Bearer abc.def.ghi"), Ok("abc.def.ghi"));
        assert_eq!(bearer_token("bearer abc"), Ok("abc"));
        assert_eq!(bearer_token("abc.def.ghi"), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token("Basic abc"), Err(AuthError::MalformedHeader));
        assert_eq!(bearer_token("Bearer "), Err(AuthError::MalformedHeader));
    }

    #[test]
    fn scope_membership_is_exact() {
        let token = token_with_scope("admin:execute other:scope", &[]);
        assert!(token.has_scope("admin:execute"));
        assert!(token.has_scope("other:scope"));
        assert!(!token.has_scope("admin"));
        assert!(!token.has_scope("admin:exec"));
        assert!(!token.has_scope("admin:execute other:scope"));
        assert!(!token.has_scope(""));
    }

    #[test]
    fn permission_membership_is_exact() {
        let token = token_with_scope("", &["write:sessions", "read:sessions"]);
        assert!(token.has_permission("read:sessions"));
        assert!(token.has_permission("write:sessions"));
        assert!(!token.has_permission("read"));
        assert!(!token.has_permission("write:speakers"));
    }

    #[test]
    fn custom_claims_default_to_empty() {
        let raw: RawClaims = sonic_rs::from_str(
            r#"{"iss":"https://issuer.example/","aud":["a","b"],"exp":1900000000,"sub":"u"}"#,
        )
        .unwrap();

        let token = ValidatedToken::try_from(raw).unwrap();
        assert_eq!(token.audience, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(token.claims, CustomClaims::default());
        assert!(token.scopes().is_empty());
    }
}
