//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use finvise_core::{Email, UserId};

/// A stored user row, including credential material.
///
/// Never serialised and never returned to callers; convert into [`User`] first.
/// `Debug` redacts the password hash and token.
#[derive(Clone, sqlx::FromRow)]
pub struct UserRecord {
    /// Store-assigned ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Unique, case-sensitive email.
    pub email: Email,
    /// Derived from the email local part at registration.
    pub username: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Most recently issued token, cleared on logout. Advisory only.
    #[sqlx(rename = "access_token")]
    pub current_token: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field(
                "current_token",
                &self.current_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A user as exposed to callers: password hash and token stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            username: record.username,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Fields for inserting a new user.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub username: String,
    pub password_hash: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record() -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: UserId::new(3),
            name: "Test User".to_owned(),
            email: Email::parse("test@example.com").unwrap(),
            username: "test".to_owned(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_owned(),
            current_token: Some("header.payload.signature".to_owned()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let debug_output = format!("{:?}", record());

        assert!(debug_output.contains("test@example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("argon2id"));
        assert!(!debug_output.contains("header.payload.signature"));
    }

    #[test]
    fn test_public_user_has_no_credential_fields() {
        let user = User::from(record());
        let json = serde_json::to_value(&user).unwrap();

        assert_eq!(json["username"], "test");
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("currentToken").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
