#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{TimeDelta, Utc};
use serde_json::Value;
use tower::ServiceExt;

use tally_api::auth::{create_token, hash_password};
use tally_api::{AppState, AppStateInner, build_router};
use tally_db::Database;

pub const SECRET: &str = "test-secret";
pub const DAY: i64 = 86_400;

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub token: String,
}

impl TestApp {
    /// Fresh in-memory store with one user `admin`. The stored hash is not a
    /// real password; use `with_password` for tests that log in.
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let user_id = db.create_user("admin", "unused").unwrap();
        Self::from_db(db, user_id)
    }

    pub fn with_password(password: &str) -> Self {
        let db = Database::open_in_memory().unwrap();
        let user_id = db
            .create_user("admin", &hash_password(password).unwrap())
            .unwrap();
        Self::from_db(db, user_id)
    }

    fn from_db(db: Database, user_id: i64) -> Self {
        let state: AppState = Arc::new(AppStateInner {
            db,
            jwt_secret: SECRET.to_string(),
            token_ttl: TimeDelta::hours(1),
        });
        let token = create_token(SECRET, user_id, "admin", TimeDelta::hours(1)).unwrap();
        Self {
            router: build_router(state.clone()),
            state,
            token,
        }
    }

    /// Send a request and return (status, JSON body). An empty body is `Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None, Some(&self.token)).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body), Some(&self.token)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body), Some(&self.token)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(body), Some(&self.token)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None, Some(&self.token)).await
    }

    /// Create a resource and return its id.
    pub async fn create(&self, name: &str, group: &str, expire_at: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/resources",
                serde_json::json!({ "name": name, "group": group, "expire_at": expire_at }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["id"].as_i64().unwrap()
    }

    pub async fn list(&self) -> Vec<Value> {
        let (status, body) = self.get("/api/resources").await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().unwrap().clone()
    }
}

pub fn now() -> i64 {
    Utc::now().timestamp()
}
