use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use tally_db::ImportOutcome;
use tally_db::models::NewResource;
use tally_types::backup::{
    BACKUP_VERSION, BackupData, BackupResource, RestoreMode, RestoreRequest, RestoreResponse,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;

/// GET /backup — point-in-time snapshot of every resource, ids dropped.
pub async fn export_backup(State(state): State<AppState>) -> Result<Json<BackupData>, ApiError> {
    let rows = state.db.list_resources_by_id()?;

    let resources = rows
        .into_iter()
        .map(|row| BackupResource {
            name: row.name,
            group: row.group_name,
            expire_at: row.expire_at,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(BackupData {
        version: BACKUP_VERSION.to_string(),
        export_at: Utc::now().timestamp(),
        resources,
    }))
}

/// Checks every entry before anything is written. A `created_at` of zero or
/// less is replaced by `now`.
fn prepare_entries(entries: Vec<BackupResource>, now: i64) -> Result<Vec<NewResource>, ApiError> {
    entries
        .into_iter()
        .map(|entry| {
            if DateTime::from_timestamp(entry.expire_at, 0).is_none() {
                return Err(ApiError::validation(format!(
                    "Resource '{}' has an invalid expire_at",
                    entry.name
                )));
            }
            let created_at = if entry.created_at > 0 {
                if DateTime::from_timestamp(entry.created_at, 0).is_none() {
                    return Err(ApiError::validation(format!(
                        "Resource '{}' has an invalid created_at",
                        entry.name
                    )));
                }
                entry.created_at
            } else {
                now
            };
            Ok(NewResource {
                name: entry.name,
                group_name: entry.group,
                expire_at: entry.expire_at,
                created_at,
            })
        })
        .collect()
}

/// POST /backup/restore — all-or-nothing import in `overwrite` or `append` mode.
pub async fn restore_backup(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(req): ApiJson<RestoreRequest>,
) -> Result<Json<RestoreResponse>, ApiError> {
    let mode: RestoreMode = req
        .mode
        .parse()
        .map_err(|e| {
            warn!("Restore rejected: {}", e);
            ApiError::validation("Mode must be 'overwrite' or 'append'")
        })?;

    if req.data.version != BACKUP_VERSION {
        warn!(
            "Restoring snapshot version '{}' (expected '{}')",
            req.data.version, BACKUP_VERSION
        );
    }

    let entries = prepare_entries(req.data.resources, Utc::now().timestamp())?;

    // Bulk insert runs off the async runtime
    let db = state.clone();
    let outcome = tokio::task::spawn_blocking(move || db.db.import_resources(mode, &entries))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.into())
        })??;

    match outcome {
        ImportOutcome::Imported(imported) => {
            info!(
                "Backup restored by '{}': {} resources ({} mode)",
                user.username, imported, mode
            );
            Ok(Json(RestoreResponse {
                message: "Backup restored successfully".to_string(),
                imported,
                mode: mode.to_string(),
            }))
        }
        ImportOutcome::Aborted { name, imported } => {
            Err(ApiError::ImportAborted { name, imported })
        }
    }
}
