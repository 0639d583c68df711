use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
/// `sub` carries the numeric user id as a decimal string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
}

// -- Resources --

/// Body of `POST /resources`. Required fields are checked by the handler so
/// a missing field gets a readable message instead of a serde error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateResourceRequest {
    pub name: Option<String>,
    pub group: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expire_at: Option<DateTime<Utc>>,
}

/// Partial update. An absent field keeps its stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateResourceRequest {
    pub name: Option<String>,
    pub group: Option<String>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expire_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenewRequest {
    pub days: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expire_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub id: i64,
    pub name: String,
    pub group: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expire_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub remaining_days: i64,
}

// -- User --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfoResponse {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub new_username: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
