use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use tally_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Extract and validate JWT from Authorization header.
/// Rejects with 401 before the handler (and the store) is reached.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let user = verify_token(&state.jwt_secret, token)
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired token"))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub fn verify_token(secret: &str, token: &str) -> Option<AuthUser> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()?;

    let claims = token_data.claims;
    Some(AuthUser {
        id: claims.user_id()?,
        username: claims.username,
    })
}
