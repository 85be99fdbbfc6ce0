//! User persistence.

use async_trait::async_trait;
use sqlx::PgPool;

use finvise_core::{Email, UserId};

use super::RepositoryError;
use crate::models::{NewUser, UserRecord};

/// Message carried by the conflict raised on a duplicate email.
pub(crate) const DUPLICATE_EMAIL: &str = "email already registered";

/// Storage of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact (case-sensitive) email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError>;

    /// Look up a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError>;

    /// Insert a new user with no current token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    /// Replace (or clear) the user's advisory current token.
    ///
    /// Leaves `updated_at` unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has this ID.
    /// Returns `RepositoryError::Database` if the query fails.
    async fn update_current_token(
        &self,
        id: UserId,
        token: Option<&str>,
    ) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed [`UserStore`].
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new user store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, username, password_hash, access_token,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r"
            SELECT id, name, email, username, password_hash, access_token,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        sqlx::query_as::<_, UserRecord>(
            r"
            INSERT INTO users (name, email, username, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, username, password_hash, access_token,
                      created_at, updated_at
            ",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE_EMAIL))
    }

    async fn update_current_token(
        &self,
        id: UserId,
        token: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET access_token = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
