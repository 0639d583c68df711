use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
};

use crate::auth::{self, AppState};
use crate::backup;
use crate::error::ApiError;
use crate::middleware::require_auth;
use crate::resources;
use crate::user;

/// Restores carry a whole export, so they get far more room than the
/// 2 MB default that every other route keeps.
pub const RESTORE_BODY_LIMIT: usize = 256 * 1024 * 1024;

/// The full JSON API, mounted under `/api`. Everything except login
/// sits behind `require_auth`.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new().route("/login", post(auth::login));

    let protected_routes = Router::new()
        .route(
            "/resources",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route(
            "/resources/{id}",
            put(resources::update_resource).delete(resources::delete_resource),
        )
        .route("/resources/{id}/renew", patch(resources::renew_resource))
        .route("/groups", get(resources::list_groups))
        .route("/backup", get(backup::export_backup))
        .route(
            "/backup/restore",
            post(backup::restore_backup).layer(DefaultBodyLimit::max(RESTORE_BODY_LIMIT)),
        )
        .route("/user", get(user::get_current_user))
        .route("/user/username", put(user::update_username))
        .route("/user/password", put(user::update_password))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(api_not_found)
        .with_state(state);

    Router::new().nest("/api", api)
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("Not found")
}
