use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Snapshot format version written by export.
pub const BACKUP_VERSION: &str = "1.0";

/// One resource inside a snapshot. Ids are not carried; restore assigns new ones.
/// Instants are Unix seconds; a `created_at` of zero or less means "unknown".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupResource {
    pub name: String,
    #[serde(default)]
    pub group: String,
    pub expire_at: i64,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupData {
    /// Empty when a hand-written snapshot leaves it out.
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export_at: i64,
    #[serde(default)]
    pub resources: Vec<BackupResource>,
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub mode: String,
    pub data: BackupData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RestoreResponse {
    pub message: String,
    pub imported: usize,
    pub mode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMode {
    /// Delete every stored resource, then insert the snapshot.
    Overwrite,
    /// Insert the snapshot next to what is already stored.
    Append,
}

impl RestoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreMode::Overwrite => "overwrite",
            RestoreMode::Append => "append",
        }
    }
}

impl fmt::Display for RestoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown restore mode '{0}'")]
pub struct UnknownRestoreMode(pub String);

impl FromStr for RestoreMode {
    type Err = UnknownRestoreMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(RestoreMode::Overwrite),
            "append" => Ok(RestoreMode::Append),
            other => Err(UnknownRestoreMode(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_mode_parses_only_known_values() {
        assert_eq!("overwrite".parse(), Ok(RestoreMode::Overwrite));
        assert_eq!("append".parse(), Ok(RestoreMode::Append));
        assert!("Overwrite".parse::<RestoreMode>().is_err());
        assert!("".parse::<RestoreMode>().is_err());
    }

    #[test]
    fn unknown_mode_error_names_the_value() {
        let err = "replace".parse::<RestoreMode>().unwrap_err();
        assert_eq!(err.to_string(), "unknown restore mode 'replace'");
    }

    #[test]
    fn snapshot_header_fields_are_optional() {
        let data: BackupData =
            serde_json::from_str(r#"{"resources":[{"name":"vps","expire_at":5}]}"#).unwrap();
        assert_eq!(data.version, "");
        assert_eq!(data.export_at, 0);
        assert_eq!(data.resources.len(), 1);
    }

    #[test]
    fn snapshot_entry_defaults_optional_fields() {
        let entry: BackupResource =
            serde_json::from_str(r#"{"name":"example.com","expire_at":1700000000}"#).unwrap();
        assert_eq!(entry.group, "");
        assert_eq!(entry.created_at, 0);
    }

    #[test]
    fn snapshot_serializes_wire_field_names() {
        let data = BackupData {
            version: BACKUP_VERSION.into(),
            export_at: 42,
            resources: vec![BackupResource {
                name: "vps".into(),
                group: "servers".into(),
                expire_at: 100,
                created_at: 50,
            }],
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["export_at"], 42);
        assert_eq!(value["resources"][0]["group"], "servers");
        assert_eq!(value["resources"][0]["expire_at"], 100);
    }
}
