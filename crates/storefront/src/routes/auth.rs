//! Registration, login and password reset handlers.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;

use crate::db::{PendingUserRepository, UserRepository};
use crate::error::Result;
use crate::middleware::ApiJson;
use crate::models::UserProfile;
use crate::services::auth::{AuthService, OTP_TTL_MINUTES, RegisterInput};
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// OTP confirmation payload.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

/// Forgot password payload.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

/// Reset password payload.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

/// Register and activate an account in one step.
#[tracing::instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let pending = PendingUserRepository::new(state.pool());
    let service = auth_service(&state, &users, &pending);

    let user = service.register(&input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserProfile::from(&user),
        })),
    ))
}

/// Start an OTP registration by emailing a code.
#[tracing::instrument(skip_all)]
pub async fn request_otp(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let pending = PendingUserRepository::new(state.pool());
    let service = auth_service(&state, &users, &pending);

    service.request_otp(&input).await?;
    Ok(Json(json!({
        "message": format!("OTP sent to your email. It is valid for {OTP_TTL_MINUTES} minutes."),
    })))
}

/// Finish an OTP registration.
#[tracing::instrument(skip_all)]
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<VerifyOtpForm>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let pending = PendingUserRepository::new(state.pool());
    let service = auth_service(&state, &users, &pending);

    let user = service.verify_otp(&form.email, &form.otp).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": UserProfile::from(&user),
        })),
    ))
}

/// Exchange credentials for a bearer token.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<LoginForm>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let pending = PendingUserRepository::new(state.pool());
    let service = auth_service(&state, &users, &pending);

    let login = service.login(&form.email, &form.password).await?;
    Ok(Json(json!({
        "message": "Login successful",
        "token": login.token,
        "user": {
            "id": login.user.id,
            "name": login.user.name,
            "email": login.user.email,
            "role": login.user.role,
        },
    })))
}

/// Email a reset link. Always answers the same way.
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<ForgotPasswordForm>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let pending = PendingUserRepository::new(state.pool());
    let service = auth_service(&state, &users, &pending);

    service.forgot_password(&form.email).await?;
    Ok(Json(json!({
        "message": "If that email is registered, a reset link has been sent.",
    })))
}

/// Set a new password with an emailed token.
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<ResetPasswordForm>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let pending = PendingUserRepository::new(state.pool());
    let service = auth_service(&state, &users, &pending);

    service.reset_password(&form.token, &form.password).await?;
    Ok(Json(json!({ "message": "Password has been reset" })))
}

fn auth_service<'a>(
    state: &'a AppState,
    users: &'a UserRepository<'a>,
    pending: &'a PendingUserRepository<'a>,
) -> AuthService<'a> {
    AuthService::new(
        users,
        pending,
        state.notifier(),
        state.tokens(),
        &state.config().frontend_url,
    )
}
