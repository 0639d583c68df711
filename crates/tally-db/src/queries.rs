use crate::models::{NewResource, ResourceRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};
use tally_types::backup::RestoreMode;
use tracing::warn;

/// Result of a bulk import. An aborted import has been rolled back in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(usize),
    Aborted {
        /// Name of the entry whose insert failed.
        name: String,
        /// Entries inserted before the failure. They were rolled back.
        imported: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameChange {
    Changed,
    UserMissing,
    Taken,
}

const RESOURCE_COLUMNS: &str = "id, name, group_name, expire_at, created_at";

impl Database {
    // -- Users --

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }

    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// True if a user other than `user_id` already owns `username`.
    pub fn username_taken(&self, username: &str, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT id FROM users WHERE username = ?1 AND id != ?2",
                    rusqlite::params![username, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// A rename that collides with another user's name, even one taken
    /// after `username_taken` was checked, comes back as `Taken`.
    pub fn update_username(&self, user_id: i64, username: &str) -> Result<UsernameChange> {
        self.with_conn(|conn| {
            let result = conn.execute(
                "UPDATE users SET username = ?1 WHERE id = ?2",
                rusqlite::params![username, user_id],
            );
            match result {
                Ok(0) => Ok(UsernameChange::UserMissing),
                Ok(_) => Ok(UsernameChange::Changed),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(UsernameChange::Taken)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Returns false if no such user exists.
    pub fn update_password(&self, user_id: i64, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET password = ?1 WHERE id = ?2",
                rusqlite::params![password_hash, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Resources --

    /// All resources, soonest expiration first. Ties keep id order.
    pub fn list_resources(&self) -> Result<Vec<ResourceRow>> {
        self.with_conn(|conn| query_resources(conn, "ORDER BY expire_at ASC, id ASC"))
    }

    /// All resources in insertion order, as written to backups.
    pub fn list_resources_by_id(&self) -> Result<Vec<ResourceRow>> {
        self.with_conn(|conn| query_resources(conn, "ORDER BY id ASC"))
    }

    pub fn get_resource(&self, id: i64) -> Result<Option<ResourceRow>> {
        self.with_conn(|conn| query_resource(conn, id))
    }

    pub fn insert_resource(&self, resource: &NewResource) -> Result<ResourceRow> {
        self.with_conn(|conn| {
            let id = insert_resource_row(conn, resource)?;
            Ok(ResourceRow {
                id,
                name: resource.name.clone(),
                group_name: resource.group_name.clone(),
                expire_at: resource.expire_at,
                created_at: resource.created_at,
            })
        })
    }

    /// Writes the mutable columns of `resource`. `created_at` is left alone.
    /// Returns false if the row no longer exists.
    pub fn update_resource(&self, resource: &ResourceRow) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE resources SET name = ?1, group_name = ?2, expire_at = ?3 WHERE id = ?4",
                rusqlite::params![
                    resource.name,
                    resource.group_name,
                    resource.expire_at,
                    resource.id
                ],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deleting a missing id is not an error.
    pub fn delete_resource(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM resources WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Distinct non-empty group labels, sorted.
    pub fn list_groups(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT group_name FROM resources
                 WHERE group_name != ''
                 ORDER BY group_name ASC",
            )?;
            let groups = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(groups)
        })
    }

    /// Imports `resources` in order inside one transaction. Overwrite mode
    /// clears the table first, in the same transaction. The first failing
    /// insert rolls everything back, including the clear.
    pub fn import_resources(
        &self,
        mode: RestoreMode,
        resources: &[NewResource],
    ) -> Result<ImportOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if mode == RestoreMode::Overwrite {
                tx.execute("DELETE FROM resources", [])?;
            }

            for (imported, resource) in resources.iter().enumerate() {
                if let Err(e) = insert_resource_row(&tx, resource) {
                    warn!(
                        "Import aborted at entry {} ('{}'): {}",
                        imported, resource.name, e
                    );
                    tx.rollback()?;
                    return Ok(ImportOutcome::Aborted {
                        name: resource.name.clone(),
                        imported,
                    });
                }
            }

            tx.commit()?;
            Ok(ImportOutcome::Imported(resources.len()))
        })
    }
}

fn insert_resource_row(conn: &Connection, resource: &NewResource) -> Result<i64> {
    conn.execute(
        "INSERT INTO resources (name, group_name, expire_at, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            resource.name,
            resource.group_name,
            resource.expire_at,
            resource.created_at
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, value: P) -> Result<Option<UserRow>> {
    let sql = format!("SELECT id, username, password, created_at FROM users WHERE {}", filter);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn resource_from_row(row: &Row<'_>) -> rusqlite::Result<ResourceRow> {
    Ok(ResourceRow {
        id: row.get(0)?,
        name: row.get(1)?,
        group_name: row.get(2)?,
        expire_at: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn query_resources(conn: &Connection, order: &str) -> Result<Vec<ResourceRow>> {
    let sql = format!("SELECT {} FROM resources {}", RESOURCE_COLUMNS, order);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], resource_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_resource(conn: &Connection, id: i64) -> Result<Option<ResourceRow>> {
    let sql = format!("SELECT {} FROM resources WHERE id = ?1", RESOURCE_COLUMNS);
    let row = conn.query_row(&sql, [id], resource_from_row).optional()?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_resource(name: &str, group: &str, expire_at: i64) -> NewResource {
        NewResource {
            name: name.to_string(),
            group_name: group.to_string(),
            expire_at,
            created_at: 1_000,
        }
    }

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_resource(&new_resource("late", "domains", 300)).unwrap();
        db.insert_resource(&new_resource("early", "", 100)).unwrap();
        db.insert_resource(&new_resource("middle", "licenses", 200)).unwrap();
        db
    }

    #[test]
    fn list_is_sorted_by_expiration() {
        let db = seeded();
        let names: Vec<_> = db
            .list_resources()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["early", "middle", "late"]);
    }

    #[test]
    fn equal_expirations_keep_id_order() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_resource(&new_resource("a", "", 50)).unwrap();
        let b = db.insert_resource(&new_resource("b", "", 50)).unwrap();
        let ids: Vec<_> = db.list_resources().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, [a.id, b.id]);
    }

    #[test]
    fn update_leaves_created_at_untouched() {
        let db = seeded();
        let mut row = db.list_resources().unwrap().remove(0);
        row.name = "renamed".into();
        row.created_at = 9_999;
        assert!(db.update_resource(&row).unwrap());

        let stored = db.get_resource(row.id).unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.created_at, 1_000);
    }

    #[test]
    fn update_of_missing_row_reports_false() {
        let db = Database::open_in_memory().unwrap();
        let row = ResourceRow {
            id: 42,
            name: "ghost".into(),
            group_name: String::new(),
            expire_at: 1,
            created_at: 1,
        };
        assert!(!db.update_resource(&row).unwrap());
    }

    #[test]
    fn delete_is_idempotent() {
        let db = seeded();
        let id = db.list_resources().unwrap()[0].id;
        db.delete_resource(id).unwrap();
        db.delete_resource(id).unwrap();
        assert!(db.get_resource(id).unwrap().is_none());
        assert_eq!(db.list_resources().unwrap().len(), 2);
    }

    #[test]
    fn groups_skip_empty_labels() {
        let db = seeded();
        db.insert_resource(&new_resource("again", "domains", 400)).unwrap();
        assert_eq!(db.list_groups().unwrap(), ["domains", "licenses"]);

        let empty = Database::open_in_memory().unwrap();
        assert!(empty.list_groups().unwrap().is_empty());
    }

    #[test]
    fn append_import_keeps_existing_rows() {
        let db = seeded();
        let outcome = db
            .import_resources(
                RestoreMode::Append,
                &[new_resource("x", "", 10), new_resource("y", "", 20)],
            )
            .unwrap();
        assert_eq!(outcome, ImportOutcome::Imported(2));
        assert_eq!(db.list_resources().unwrap().len(), 5);
    }

    #[test]
    fn overwrite_import_replaces_rows() {
        let db = seeded();
        let outcome = db
            .import_resources(RestoreMode::Overwrite, &[new_resource("only", "", 10)])
            .unwrap();
        assert_eq!(outcome, ImportOutcome::Imported(1));

        let rows = db.list_resources().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "only");
    }

    #[test]
    fn failed_import_rolls_back_everything() {
        let db = seeded();
        let outcome = db
            .import_resources(
                RestoreMode::Overwrite,
                &[new_resource("ok", "", 10), new_resource("", "", 20)],
            )
            .unwrap();
        assert_eq!(
            outcome,
            ImportOutcome::Aborted {
                name: String::new(),
                imported: 1
            }
        );

        let names: Vec<_> = db
            .list_resources()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, ["early", "middle", "late"]);
    }

    #[test]
    fn username_checks_exclude_self() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "hash").unwrap();
        let bob = db.create_user("bob", "hash").unwrap();

        assert!(!db.username_taken("alice", alice).unwrap());
        assert!(db.username_taken("alice", bob).unwrap());
        assert_eq!(db.update_username(bob, "robert").unwrap(), UsernameChange::Changed);
        assert_eq!(db.update_username(999, "nobody").unwrap(), UsernameChange::UserMissing);
        assert_eq!(db.get_user_by_id(bob).unwrap().unwrap().username, "robert");
        assert!(!db.update_password(999, "hash").unwrap());
        assert_eq!(db.count_users().unwrap(), 2);
    }

    #[test]
    fn rename_onto_existing_name_is_taken() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", "hash").unwrap();
        let bob = db.create_user("bob", "hash").unwrap();

        // Skips the username_taken pre-check, as a concurrent writer would
        assert_eq!(db.update_username(bob, "alice").unwrap(), UsernameChange::Taken);
        assert_eq!(db.get_user_by_id(bob).unwrap().unwrap().username, "bob");
    }
}
