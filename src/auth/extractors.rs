use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::debug;

use crate::auth::{repo_types::User, services::authenticate};
use crate::error::AppError;
use crate::state::AppState;

/// The user owning the request's bearer token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AppError::NotAuthenticated)?;

        // "Bearer <key>", or "Token <key>" as older clients send it
        let key = bearer_key(auth).ok_or_else(|| {
            debug!("unsupported auth scheme");
            AppError::InvalidToken
        })?;

        let user = authenticate(state.tokens.as_ref(), key).await?;
        Ok(CurrentUser(user))
    }
}

fn bearer_key(header: &str) -> Option<&str> {
    let (scheme, key) = header.split_once(' ')?;
    let key = key.trim();
    let known = scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token");
    (known && !key.is_empty()).then_some(key)
}
