//! Identity extractors.
//!
//! Requests authenticate with `Authorization: Bearer <token>`. The extractors
//! never reject a request for a missing or unknown token; they hand the
//! handler an `Option` and leave the decision to the authorization gate.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use addressbook_core::UserId;

use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

/// The raw bearer token, if the request carried one.
///
/// # Example
///
/// ```rust,ignore
/// async fn logout(BearerToken(token): BearerToken) -> impl IntoResponse { ... }
/// ```
pub struct BearerToken(pub Option<String>);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(bearer_token(parts).map(str::to_owned)))
    }
}

/// The user behind the bearer token; `None` when absent, unknown or expired.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(
///     State(state): State<AppState>,
///     CallerIdentity(identity): CallerIdentity,
/// ) -> Result<Json<Firm>, AppError> {
///     state.gate().authorize(identity, "view_firms").await?;
///     ...
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity(pub Option<UserId>);

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        let identity = state.auth().resolve_token(token).await?;
        if let Some(user) = identity {
            tracing::Span::current().record("user_id", user.as_i64());
            set_sentry_user(&user);
        }

        Ok(Self(identity))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc123"))), Some("abc123"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc123"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer   "))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
