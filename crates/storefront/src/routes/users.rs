//! Account and address book handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use hoi_core::UserId;

use crate::db::{UserRepository, UserStore};
use crate::error::{AppError, Result};
use crate::middleware::{ApiJson, RequireAdmin, RequireAuth};
use crate::models::{AddressInput, UserProfile};
use crate::services::addresses::AddressService;
use crate::state::AppState;

/// Profile of the calling account.
pub async fn userdata(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = UserRepository::new(state.pool())
        .find_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "User data fetched successfully",
        "user": UserProfile::from(&user),
    })))
}

/// Every account, for the admin dashboard.
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool()).list().await?;
    let profiles: Vec<UserProfile> = users.iter().map(UserProfile::from).collect();
    Ok(Json(profiles))
}

/// Delete an account.
#[tracing::instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<impl IntoResponse> {
    if !UserRepository::new(state.pool()).delete(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %id, "User deleted");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

// =============================================================================
// Address book
// =============================================================================

pub async fn list_addresses(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let book = AddressService::new(&users).list(caller.id).await?;
    Ok(Json(book))
}

pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiJson(input): ApiJson<AddressInput>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let book = AddressService::new(&users).add(caller.id, &input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(address_id): Path<Uuid>,
    ApiJson(input): ApiJson<AddressInput>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let book = AddressService::new(&users)
        .update(caller.id, address_id, &input)
        .await?;
    Ok(Json(book))
}

pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let book = AddressService::new(&users)
        .remove(caller.id, address_id)
        .await?;
    Ok(Json(book))
}

pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(address_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let users = UserRepository::new(state.pool());
    let book = AddressService::new(&users)
        .set_default(caller.id, address_id)
        .await?;
    Ok(Json(book))
}
