use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use tally_db::models::{NewResource, ResourceRow};
use tally_types::api::{
    CreateResourceRequest, MessageResponse, RenewRequest, ResourceResponse,
    UpdateResourceRequest,
};
use tally_types::lifecycle::{Renewal, remaining_days};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};

/// Stored seconds to an instant. Out-of-range values only come from a
/// hand-edited database; they are logged and shown as the epoch.
pub(crate) fn instant(secs: i64, field: &str, id: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_else(|| {
        warn!("Corrupt {} '{}' on resource {}", field, secs, id);
        DateTime::default()
    })
}

pub fn to_response(row: ResourceRow, now: DateTime<Utc>) -> ResourceResponse {
    let expire_at = instant(row.expire_at, "expire_at", row.id);
    ResourceResponse {
        id: row.id,
        created_at: instant(row.created_at, "created_at", row.id),
        remaining_days: remaining_days(expire_at, now),
        expire_at,
        name: row.name,
        group: row.group_name,
    }
}

fn require_name(name: &str) -> Result<(), ApiError> {
    if name.is_empty() {
        return Err(ApiError::validation("Field 'name' must not be empty"));
    }
    Ok(())
}

/// GET /resources — every resource, soonest expiration first.
pub async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResourceResponse>>, ApiError> {
    let rows = state.db.list_resources()?;

    let now = Utc::now();
    let resources = rows.into_iter().map(|row| to_response(row, now)).collect();
    Ok(Json(resources))
}

pub async fn create_resource(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateResourceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req
        .name
        .ok_or_else(|| ApiError::validation("Field 'name' is required"))?;
    require_name(&name)?;
    let expire_at = req
        .expire_at
        .ok_or_else(|| ApiError::validation("Field 'expire_at' is required"))?;

    let now = Utc::now();
    let row = state.db.insert_resource(&NewResource {
        name,
        group_name: req.group.unwrap_or_default(),
        expire_at: expire_at.timestamp(),
        created_at: now.timestamp(),
    })?;

    info!("Resource {} '{}' created", row.id, row.name);
    Ok((StatusCode::CREATED, Json(to_response(row, now))))
}

/// PUT /resources/{id} — partial update; absent fields are kept.
pub async fn update_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateResourceRequest>,
) -> Result<Json<ResourceResponse>, ApiError> {
    if let Some(name) = &req.name {
        require_name(name)?;
    }

    let mut row = state
        .db
        .get_resource(id)?
        .ok_or_else(|| ApiError::not_found("Resource not found"))?;

    if let Some(name) = req.name {
        row.name = name;
    }
    if let Some(group) = req.group {
        row.group_name = group;
    }
    if let Some(expire_at) = req.expire_at {
        row.expire_at = expire_at.timestamp();
    }

    if !state.db.update_resource(&row)? {
        return Err(ApiError::not_found("Resource not found"));
    }

    Ok(Json(to_response(row, Utc::now())))
}

/// PATCH /resources/{id}/renew — `expire_at` sets the date outright,
/// `days` extends it from the current expiration or from now if already expired.
pub async fn renew_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RenewRequest>,
) -> Result<Json<ResourceResponse>, ApiError> {
    let renewal = Renewal::from_parts(req.days, req.expire_at)
        .ok_or_else(|| ApiError::validation("Must provide either 'days' or 'expire_at'"))?;

    let mut row = state
        .db
        .get_resource(id)?
        .ok_or_else(|| ApiError::not_found("Resource not found"))?;

    let now = Utc::now();
    let current = instant(row.expire_at, "expire_at", row.id);
    let renewed = renewal
        .apply(current, now)
        .ok_or_else(|| ApiError::validation("Renewed expiration is out of range"))?;
    row.expire_at = renewed.timestamp();

    if !state.db.update_resource(&row)? {
        return Err(ApiError::not_found("Resource not found"));
    }

    info!("Resource {} '{}' renewed until {}", row.id, row.name, renewed);
    Ok(Json(to_response(row, now)))
}

/// DELETE /resources/{id} — succeeds whether or not the row existed.
pub async fn delete_resource(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.delete_resource(id)?;
    Ok(Json(MessageResponse::new("Resource deleted")))
}

/// GET /groups — distinct non-empty group labels, `[]` when there are none.
pub async fn list_groups(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.db.list_groups()?))
}
