use axum::{Extension, Json, extract::State};
use tracing::info;

use tally_db::UsernameChange;
use tally_types::api::{MessageResponse, UpdatePasswordRequest, UpdateUsernameRequest, UserInfoResponse};

use crate::auth::{AppState, hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;

const MIN_PASSWORD_LEN: usize = 6;

pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserInfoResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(auth.id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserInfoResponse {
        id: user.id,
        username: user.username,
    }))
}

pub async fn update_username(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdateUsernameRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.new_username.is_empty() {
        return Err(ApiError::validation("Field 'new_username' must not be empty"));
    }

    if state.db.username_taken(&req.new_username, auth.id)? {
        return Err(ApiError::Conflict("Username already exists".into()));
    }

    match state.db.update_username(auth.id, &req.new_username)? {
        UsernameChange::Changed => {}
        UsernameChange::UserMissing => return Err(ApiError::not_found("User not found")),
        UsernameChange::Taken => {
            return Err(ApiError::Conflict("Username already exists".into()));
        }
    }

    info!("User {} renamed '{}' -> '{}'", auth.id, auth.username, req.new_username);
    Ok(Json(MessageResponse::new("Username updated successfully")))
}

pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = state
        .db
        .get_user_by_id(auth.id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(&req.old_password, &user.password)? {
        return Err(ApiError::unauthorized("Invalid old password"));
    }

    let password_hash = hash_password(&req.new_password)?;
    if !state.db.update_password(auth.id, &password_hash)? {
        return Err(ApiError::not_found("User not found"));
    }

    info!("User {} changed password", auth.id);
    Ok(Json(MessageResponse::new("Password updated successfully")))
}
