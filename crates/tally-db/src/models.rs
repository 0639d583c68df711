/// Database row types. These map directly to SQLite rows and stay
/// independent of the tally-types wire models.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRow {
    pub id: i64,
    pub name: String,
    pub group_name: String,
    /// Unix seconds
    pub expire_at: i64,
    /// Unix seconds, never updated after insert
    pub created_at: i64,
}

/// A resource that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResource {
    pub name: String,
    pub group_name: String,
    pub expire_at: i64,
    pub created_at: i64,
}
