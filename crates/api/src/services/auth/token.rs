//! Signed bearer session tokens.
//!
//! Tokens are HS256 JWTs carrying the owner's `{id, name, email}`. They are
//! verified with nothing but the signing secret: no store lookup, no
//! revocation list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use finvise_core::{Email, UserId};

/// Errors from issuing or verifying a token.
///
/// Callers collapse every verification variant into a single "invalid
/// token" outcome; the distinction exists for logs.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's expiry has passed.
    #[error("token expired")]
    Expired,

    /// The signature does not match the secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token could not be parsed or its claims are unusable.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signing failed.
    #[error("failed to encode token: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Malformed(err.to_string()),
        }
    }
}

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: UserId,
    pub name: String,
    pub email: Email,
}

/// On-the-wire claim set.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    #[serde(flatten)]
    identity: TokenClaims,
    iat: i64,
    exp: i64,
    /// Unique per issuance, so tokens minted in the same second differ.
    jti: Uuid,
}

/// How long issued tokens stay valid. One value per deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TokenDuration {
    /// `15m`
    FifteenMinutes,
    /// `1h`
    OneHour,
    /// `24h`
    #[default]
    OneDay,
    /// `7d`
    SevenDays,
}

impl TokenDuration {
    /// The duration as a `chrono` delta.
    #[must_use]
    pub fn as_delta(self) -> TimeDelta {
        match self {
            Self::FifteenMinutes => TimeDelta::minutes(15),
            Self::OneHour => TimeDelta::hours(1),
            Self::OneDay => TimeDelta::hours(24),
            Self::SevenDays => TimeDelta::days(7),
        }
    }

    /// The configuration spelling (`15m`, `1h`, `24h`, `7d`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FifteenMinutes => "15m",
            Self::OneHour => "1h",
            Self::OneDay => "24h",
            Self::SevenDays => "7d",
        }
    }
}

impl fmt::Display for TokenDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported token duration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported token duration {0:?} (expected 15m, 1h, 24h or 7d)")]
pub struct ParseTokenDurationError(String);

impl FromStr for TokenDuration {
    type Err = ParseTokenDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "15m" => Ok(Self::FifteenMinutes),
            "1h" => Ok(Self::OneHour),
            "24h" => Ok(Self::OneDay),
            "7d" => Ok(Self::SevenDays),
            other => Err(ParseTokenDurationError(other.to_owned())),
        }
    }
}

/// Issues and verifies session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: TokenDuration,
}

impl TokenCodec {
    /// Create a codec signing with `secret`; tokens live for `lifetime`.
    #[must_use]
    pub fn new(secret: &SecretString, lifetime: TokenDuration) -> Self {
        let secret = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        }
    }

    /// Configured token lifetime.
    #[must_use]
    pub const fn lifetime(&self) -> TokenDuration {
        self.lifetime
    }

    /// Issue a token valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        self.issue_at(claims, Utc::now())
    }

    /// Issue a token as if at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_at(
        &self,
        claims: &TokenClaims,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = issued_at + self.lifetime.as_delta();
        let jwt_claims = JwtClaims {
            identity: claims.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &jwt_claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Check signature and expiry and return the identity.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Expired`, `TokenError::InvalidSignature` or
    /// `TokenError::Malformed`.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)?;
        let identity = data.claims.identity;

        if !identity.id.is_assigned() {
            return Err(TokenError::Malformed(format!(
                "token carries unusable user id {}",
                identity.id
            )));
        }

        Ok(identity)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"[REDACTED]")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}
