use crate::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A uniqueness rule was violated (same id, or same natural key such as
    /// one registration per player and session).
    #[error("duplicate {kind}: {detail}")]
    Duplicate { kind: EntityKind, detail: String },

    #[error("corrupt {kind} data: {detail}")]
    Corrupt { kind: EntityKind, detail: String },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
