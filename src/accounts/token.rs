//! Signed, expiring bearer tokens (HS256 JWT).
//!
//! Validity depends only on the signature and the embedded expiry; nothing is
//! stored server side, so an issued token cannot be revoked before it expires.
//! Keep TTLs short for that reason.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// What a token may be used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Activation,
    Session,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activation => write!(f, "activation"),
            Self::Session => write!(f, "session"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account email.
    pub sub: String,
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
    /// Password-hash fingerprint, present on activation tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<String>,
}

impl Claims {
    #[must_use]
    pub fn new(sub: impl Into<String>, kind: TokenKind, ttl: Duration) -> Self {
        let iat = Utc::now().timestamp();
        Self {
            sub: sub.into(),
            kind,
            iat,
            exp: iat.saturating_add(ttl.num_seconds()),
            stamp: None,
        }
    }

    #[must_use]
    pub fn with_stamp(mut self, stamp: String) -> Self {
        self.stamp = Some(stamp);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token")]
    Signing,
}

/// Issues and verifies tokens with one process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Issue a token for `sub` expiring `ttl` from now.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn issue(&self, sub: &str, kind: TokenKind, ttl: Duration) -> Result<String, TokenError> {
        self.encode(&Claims::new(sub, kind, ttl))
    }

    /// Sign arbitrary claims.
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the claims cannot be encoded.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    /// Verify the signature, then the expiry, then the claim shape.
    ///
    /// # Errors
    /// `InvalidSignature`, `Expired` or `Malformed`.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&SecretString::from(secret.to_string()))
    }

    #[test]
    fn issued_token_decodes_to_same_subject() {
        let codec = codec("top-secret");
        let token = codec
            .issue("a@b.com", TokenKind::Session, Duration::hours(1))
            .unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, "a@b.com");
        assert_eq!(claims.kind, TokenKind::Session);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.stamp, None);
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec("top-secret");
        let token = codec
            .issue("a@b.com", TokenKind::Activation, Duration::seconds(-5))
            .unwrap();
        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn other_secret_is_invalid_signature() {
        let token = codec("one")
            .issue("a@b.com", TokenKind::Session, Duration::hours(1))
            .unwrap();
        assert_eq!(codec("two").decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn bad_signature_wins_over_expiry() {
        let token = codec("one")
            .issue("a@b.com", TokenKind::Session, Duration::seconds(-5))
            .unwrap();
        assert_eq!(codec("two").decode(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec("top-secret");
        assert_eq!(codec.decode(""), Err(TokenError::Malformed));
        assert_eq!(codec.decode("not.a.token"), Err(TokenError::Malformed));
        assert_eq!(codec.decode("abc"), Err(TokenError::Malformed));
    }

    #[test]
    fn wrong_claim_shape_is_malformed() {
        #[derive(Serialize)]
        struct Legacy {
            email: String,
            exp: i64,
        }
        let secret = SecretString::from("top-secret".to_string());
        let token = jsonwebtoken::encode(
            &Header::new(ALGORITHM),
            &Legacy {
                email: "a@b.com".to_string(),
                exp: Utc::now().timestamp() + 60,
            },
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .unwrap();
        assert_eq!(
            TokenCodec::new(&secret).decode(&token),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn stamp_survives_round_trip() {
        let codec = codec("top-secret");
        let claims = Claims::new("a@b.com", TokenKind::Activation, Duration::days(3))
            .with_stamp("abc".to_string());
        let token = codec.encode(&claims).unwrap();
        assert_eq!(codec.decode(&token).unwrap(), claims);
    }
}
