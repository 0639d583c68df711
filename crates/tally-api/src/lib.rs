pub mod auth;
pub mod backup;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod resources;
pub mod routes;
pub mod user;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::build_router;
