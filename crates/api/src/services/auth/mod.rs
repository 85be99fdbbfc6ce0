//! Session service.
//!
//! Registration, login, logout and identification over a [`UserStore`].
//!
//! # Token model
//!
//! Each successful register or login issues a fresh bearer token and records
//! it as the user's current token. The recorded token is advisory: `identify`
//! and `authenticate` check only signature and expiry, so a token stays
//! usable until it expires even after logout or a later login.

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::CredentialHasher;
pub use token::{ParseTokenDurationError, TokenClaims, TokenCodec, TokenDuration, TokenError};

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use finvise_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{AuthSession, NewUser, User, UserRecord};

/// Minimum display name length, in characters.
const MIN_NAME_LENGTH: usize = 3;

/// Minimum password length, in characters.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration input.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub password_confirmation: SecretString,
}

/// Login input.
#[derive(Debug, Clone)]
pub struct LoginUser {
    pub email: String,
    pub password: SecretString,
}

/// Session lifecycle over a user store.
///
/// Cheap to clone; clones share the store, hasher and codec.
#[derive(Clone)]
pub struct SessionService {
    inner: Arc<SessionServiceInner>,
}

struct SessionServiceInner {
    users: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    tokens: TokenCodec,
}

impl SessionService {
    /// Create a new session service.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, hasher: CredentialHasher, tokens: TokenCodec) -> Self {
        Self {
            inner: Arc::new(SessionServiceInner {
                users,
                hasher,
                tokens,
            }),
        }
    }

    /// The token codec, for request-layer verification.
    #[must_use]
    pub fn tokens(&self) -> &TokenCodec {
        &self.inner.tokens
    }

    /// Register a new user and log them in.
    ///
    /// The username is the local part of the email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if a field rule fails.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn register(&self, input: RegisterUser) -> Result<AuthSession, AuthError> {
        let RegisterUser {
            name,
            email,
            password,
            password_confirmation,
        } = input;

        validate_name(&name)?;
        let email = parse_email(&email)?;
        validate_password(&password)?;
        validate_password(&password_confirmation)?;

        if self.inner.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        if password.expose_secret() != password_confirmation.expose_secret() {
            return Err(AuthError::PasswordMismatch);
        }

        let password_hash = self.hash_password(password).await?;
        let username = email.local_part().to_owned();

        let record = self
            .inner
            .users
            .insert(NewUser {
                name,
                email,
                username,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Repository(other),
            })?;

        let session = self.start_session(record).await?;
        tracing::info!(user_id = %session.user.id, "user registered");

        Ok(session)
    }

    /// Log in with email and password.
    ///
    /// Earlier tokens for the same user stay valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` if a field rule fails.
    /// Returns `AuthError::InvalidCredentials` if the email is unknown or the
    /// password is wrong.
    #[instrument(skip_all, fields(email = %input.email))]
    pub async fn login(&self, input: LoginUser) -> Result<AuthSession, AuthError> {
        let LoginUser { email, password } = input;

        let email = parse_email(&email)?;
        if password.expose_secret().is_empty() {
            return Err(AuthError::Validation("Password is required".to_owned()));
        }

        let Some(record) = self.inner.users.find_by_email(&email).await? else {
            tracing::warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(password, record.password_hash.clone())
            .await?
        {
            tracing::warn!("login failed");
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.start_session(record).await?;
        tracing::info!(user_id = %session.user.id, "user logged in");

        Ok(session)
    }

    /// Clear the caller's recorded current token.
    ///
    /// The token itself is not revoked and keeps verifying until it expires.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token fails verification.
    /// Returns `AuthError::UserNotFound` if its user no longer exists.
    #[instrument(skip_all)]
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.authenticate(token)?;

        if self.inner.users.find_by_id(claims.id).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        self.inner
            .users
            .update_current_token(claims.id, None)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %claims.id, "user logged out");
        Ok(())
    }

    /// Resolve a token to its user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token fails verification.
    /// Returns `AuthError::UserNotFound` if its user no longer exists.
    #[instrument(skip_all)]
    pub async fn identify(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.authenticate(token)?;
        self.get_user(claims.id).await
    }

    /// Fetch a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no user has this ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<User, AuthError> {
        self.inner
            .users
            .find_by_id(id)
            .await?
            .map(User::from)
            .ok_or(AuthError::UserNotFound)
    }

    /// Verify a token without touching the store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token fails verification.
    pub fn authenticate(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.inner.tokens.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            AuthError::InvalidToken(e)
        })
    }

    /// Issue a token for `record`, record it as current and build the session.
    async fn start_session(&self, record: UserRecord) -> Result<AuthSession, AuthError> {
        let claims = TokenClaims {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
        };
        let token = self
            .inner
            .tokens
            .issue(&claims)
            .map_err(AuthError::TokenIssue)?;

        self.inner
            .users
            .update_current_token(record.id, Some(&token))
            .await?;

        Ok(AuthSession {
            user: User::from(record),
            token,
        })
    }

    async fn hash_password(&self, password: SecretString) -> Result<String, AuthError> {
        let hasher = self.inner.hasher.clone();

        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing task failed");
                AuthError::PasswordHash
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "password hashing failed");
                AuthError::PasswordHash
            })
    }

    async fn verify_password(
        &self,
        password: SecretString,
        digest: String,
    ) -> Result<bool, AuthError> {
        let hasher = self.inner.hasher.clone();

        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password verification task failed");
                AuthError::PasswordHash
            })
    }
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> Result<(), AuthError> {
    if name.chars().count() < MIN_NAME_LENGTH {
        return Err(AuthError::Validation(format!(
            "Name must be at least {MIN_NAME_LENGTH} characters long"
        )));
    }
    Ok(())
}

fn parse_email(email: &str) -> Result<Email, AuthError> {
    Email::parse(email).map_err(|_| AuthError::Validation("Invalid email address".to_owned()))
}

fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    Ok(())
}
