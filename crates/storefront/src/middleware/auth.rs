//! Bearer token extractors.
//!
//! Handlers take [`RequireAuth`] or [`RequireAdmin`] to gate access. Both
//! read `Authorization: Bearer <token>`, verify it with the application's
//! token keys and reject with a JSON error body.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::AuthUser;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn my_orders(RequireAuth(caller): RequireAuth) -> impl IntoResponse {
///     format!("Orders for {}", caller.email)
/// }
/// ```
pub struct RequireAuth(pub AuthUser);

/// Extractor that requires a valid bearer token carrying the admin role.
pub struct RequireAdmin(pub AuthUser);

/// Pull the token out of an `Authorization` header value.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AuthUser, AppError> {
    let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
    let caller = state.tokens().verify(token)?;

    tracing::Span::current().record("user_id", caller.id.as_i32());
    set_sentry_user(&caller.id, Some(&caller.email));
    Ok(caller)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(Self)
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = authenticate(parts, state)?;
        if !caller.is_admin() {
            return Err(AuthError::AdminOnly.into());
        }
        Ok(Self(caller))
    }
}
