//! Profile handlers

use axum::{extract::State, Json};
use serde_json::{json, Value};
use shared::Account;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::auth::{ChangePasswordInput, UpdateProfileInput};
use crate::services::AuthService;
use crate::AppState;

/// Get the current farmer's profile
pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Account>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let account = auth_service.get_profile(user.farmer_id).await?;

    Ok(Json(account))
}

/// Update the current farmer's profile
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<Account>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let account = auth_service.update_profile(user.farmer_id, body).await?;

    Ok(Json(account))
}

/// Change the current farmer's password
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<ChangePasswordInput>,
) -> Result<Json<Value>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    auth_service.change_password(user.farmer_id, body).await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}
