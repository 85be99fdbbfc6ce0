//! Unified error handling with Sentry integration.
//!
//! Services return their own error types ([`AuthError`], [`CatalogError`]),
//! each classified by an [`ErrorKind`]. A request layer converts them into
//! [`AppError`], which renders the `{"success": false, "message": ...}` body
//! and captures internal failures to Sentry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::AppConfig;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;

/// Client-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Duplicate email or slug, or mismatched password confirmation.
    Conflict,
    /// Bad login credentials or missing authentication.
    Unauthorized,
    /// A bearer token failed verification.
    InvalidToken,
    /// Missing product or user.
    NotFound,
    /// Input failed a field rule.
    Validation,
    /// Anything the client cannot fix.
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind.
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::Conflict => StatusCode::CONFLICT,
            Self::Unauthorized | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Request-layer error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session operation failed.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Catalog operation failed.
    #[error("{0}")]
    Catalog(#[from] CatalogError),

    /// Request lacks usable credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(err) => err.kind(),
            Self::Catalog(err) => err.kind(),
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The message shown to clients.
    ///
    /// Internal details are never exposed.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();

        if kind == ErrorKind::Internal {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "message": self.public_message(),
        });

        (kind.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Initialize Sentry error tracking from `SENTRY_DSN`.
///
/// Returns `None` when no DSN is configured. The guard must be kept alive
/// for events to be flushed.
#[must_use]
pub fn init_sentry(config: &AppConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}
