use std::sync::Arc;

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State};
use chrono::TimeDelta;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::{info, warn};

use tally_db::Database;
use tally_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::ApiError;
use crate::extract::ApiJson;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    /// Lifetime of tokens issued at login.
    pub token_ttl: TimeDelta,
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    if !verify_password(&req.password, &user.password)? {
        warn!("Failed login for '{}'", req.username);
        return Err(ApiError::unauthorized("Invalid username or password"));
    }

    let token = create_token(&state.jwt_secret, user.id, &user.username, state.token_ttl)?;

    info!("User '{}' logged in", user.username);
    Ok(Json(LoginResponse {
        token,
        username: user.username,
    }))
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Errors only if `hash` is not a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow!("Stored password hash is invalid: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    username: &str,
    ttl: TimeDelta,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Creates the initial account when the users table is empty.
/// Returns true if a user was created.
pub fn bootstrap_default_user(db: &Database, username: &str, password: &str) -> anyhow::Result<bool> {
    if db.count_users()? > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(password)?;
    db.create_user(username, &password_hash)?;

    warn!("Created default user '{}'; change its password after first login", username);
    Ok(true)
}
