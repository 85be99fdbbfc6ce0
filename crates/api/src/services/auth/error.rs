//! Session error types.

use thiserror::Error;

use super::token::TokenError;
use crate::db::RepositoryError;
use crate::error::ErrorKind;

/// Errors that can occur during session operations.
///
/// The `Display` text of every non-internal variant is safe to show to clients.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration with an email that is already taken.
    #[error("User with this email already exists")]
    EmailTaken,

    /// Registration where the confirmation differs from the password.
    #[error("Passwords do not match")]
    PasswordMismatch,

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The bearer token failed verification.
    #[error("Invalid token")]
    InvalidToken(#[source] TokenError),

    /// The identity in a valid token (or a looked-up ID) no longer resolves.
    #[error("User not found")]
    UserNotFound,

    /// Input failed a field rule.
    #[error("{0}")]
    Validation(String),

    /// Password hashing failed or its worker was lost.
    #[error("password hashing failed")]
    PasswordHash,

    /// A token could not be signed.
    #[error("token issuance failed: {0}")]
    TokenIssue(#[source] TokenError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// Classify for the request layer.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmailTaken | Self::PasswordMismatch => ErrorKind::Conflict,
            Self::InvalidCredentials => ErrorKind::Unauthorized,
            Self::InvalidToken(_) => ErrorKind::InvalidToken,
            Self::UserNotFound => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::PasswordHash | Self::TokenIssue(_) | Self::Repository(_) => ErrorKind::Internal,
        }
    }
}
