//! Authentication extractors.
//!
//! Provide bearer-token authentication to route handlers. Verification is
//! stateless: only signature and expiry are checked.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::TokenClaims;
use crate::state::AppState;

const AUTHENTICATION_REQUIRED: &str = "Authentication required";
const AUTHENTICATION_FAILED: &str = "Authentication failed";

/// Extractor for the raw token in `Authorization: Bearer <token>`.
///
/// Rejects with 401 "Authentication required" if the header is missing, uses
/// another scheme, or carries an empty token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized(AUTHENTICATION_REQUIRED.to_owned()))?;

        Ok(Self(token.to_owned()))
    }
}

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireUser(claims): RequireUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireUser(pub TokenClaims);

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);

        let claims = app_state.sessions().authenticate(&token).map_err(|e| {
            tracing::warn!(error = %e, "Authentication error");
            AppError::Unauthorized(AUTHENTICATION_FAILED.to_owned())
        })?;

        set_sentry_user(&claims.id, Some(claims.email.as_str()));

        Ok(Self(claims))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request;
    use secrecy::SecretString;

    use finvise_core::{Email, UserId};

    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::{CacheConfig, SessionConfig};
    use crate::db::{MemoryProductStore, MemoryUserStore};
    use crate::error::ErrorKind;
    use crate::services::auth::TokenDuration;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn state() -> AppState {
        AppState::from_parts(
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryProductStore::new()),
            Arc::new(MemoryCache::new(10)),
            &SessionConfig {
                jwt_secret: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%"),
                token_duration: TokenDuration::OneHour,
            },
            CacheConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_bearer_token_extracted() {
        let BearerToken(token) = BearerToken::from_request_parts(&mut parts(Some("Bearer abc")), &())
            .await
            .unwrap();
        assert_eq!(token, "abc");
    }

    #[tokio::test]
    async fn test_bearer_token_required() {
        for header in [None, Some("Basic abc"), Some("Bearer "), Some("bearer abc")] {
            let err = BearerToken::from_request_parts(&mut parts(header), &())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unauthorized);
            assert_eq!(err.public_message(), "Authentication required");
        }
    }

    #[tokio::test]
    async fn test_require_user_accepts_valid_token() {
        let state = state();
        let claims = TokenClaims {
            id: UserId::new(1),
            name: "Test User".to_owned(),
            email: Email::parse("a@b.com").unwrap(),
        };
        let token = state.sessions().tokens().issue(&claims).unwrap();

        let header = format!("Bearer {token}");
        let RequireUser(extracted) = RequireUser::from_request_parts(&mut parts(Some(&header)), &state)
            .await
            .unwrap();
        assert_eq!(extracted, claims);
    }

    #[tokio::test]
    async fn test_require_user_rejects_bad_token() {
        let state = state();
        let err = RequireUser::from_request_parts(&mut parts(Some("Bearer nope")), &state)
            .await
            .unwrap_err();
        assert_eq!(err.public_message(), "Authentication failed");
    }
}
