//! Entity persistence for jdr-tables.
//!
//! [`EntityStore`] is the one contract the scheduler talks to. Two backends
//! implement it: [`SqliteStore`] (canonical) and [`JsonStore`] (flat files,
//! able to ingest data written by the old flat-file layout).

mod error;
pub mod json;
pub mod legacy;
mod record;
pub mod sqlite;

use jdrtables_runtime_config::{StorageBackend, StorageSettings};

pub use error::{Result, StoreError};
pub use json::JsonStore;
pub use record::{EntityKind, Record};
pub use sqlite::SqliteStore;

/// Uniform whole-record persistence contract.
///
/// Callers read a record, modify it and write it back; no backend offers
/// partial updates. `update` and `delete` fail with [`StoreError::NotFound`]
/// when no record with that id exists.
pub trait EntityStore: Send + Sync {
    fn get_all<R: Record>(&self) -> Result<Vec<R>>;
    fn get_by_id<R: Record>(&self, id: &str) -> Result<Option<R>>;
    fn create<R: Record>(&self, record: R) -> Result<R>;
    fn update<R: Record>(&self, record: R) -> Result<R>;
    fn delete<R: Record>(&self, id: &str) -> Result<()>;

    /// Run `f` as one unit of work: if it returns an error, none of the
    /// writes it made survive. A call made inside `f` joins the outer unit.
    ///
    /// Units are not isolated from concurrent writers; callers serialize
    /// their writes.
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>;
}

/// The backend selected by configuration.
pub enum Backend {
    Sqlite(SqliteStore),
    Json(JsonStore),
}

impl Backend {
    pub fn open(settings: &StorageSettings, legacy_session_hours: u32) -> Result<Self> {
        let backend = match settings.backend {
            StorageBackend::Sqlite => {
                let path = settings.data_dir.join(sqlite::DB_FILE_NAME);
                Self::Sqlite(SqliteStore::open(&path)?)
            }
            StorageBackend::Json => {
                Self::Json(JsonStore::open(&settings.data_dir, legacy_session_hours)?)
            }
        };
        tracing::info!(
            "Opened {} store in {}",
            settings.backend.as_str(),
            settings.data_dir.display()
        );
        Ok(backend)
    }

    pub fn kind(&self) -> StorageBackend {
        match self {
            Self::Sqlite(_) => StorageBackend::Sqlite,
            Self::Json(_) => StorageBackend::Json,
        }
    }
}

impl EntityStore for Backend {
    fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        match self {
            Self::Sqlite(s) => s.get_all(),
            Self::Json(s) => s.get_all(),
        }
    }

    fn get_by_id<R: Record>(&self, id: &str) -> Result<Option<R>> {
        match self {
            Self::Sqlite(s) => s.get_by_id(id),
            Self::Json(s) => s.get_by_id(id),
        }
    }

    fn create<R: Record>(&self, record: R) -> Result<R> {
        match self {
            Self::Sqlite(s) => s.create(record),
            Self::Json(s) => s.create(record),
        }
    }

    fn update<R: Record>(&self, record: R) -> Result<R> {
        match self {
            Self::Sqlite(s) => s.update(record),
            Self::Json(s) => s.update(record),
        }
    }

    fn delete<R: Record>(&self, id: &str) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.delete::<R>(id),
            Self::Json(s) => s.delete::<R>(id),
        }
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        match self {
            Self::Sqlite(s) => s.in_transaction(|| f(self)),
            Self::Json(s) => s.in_transaction(|| f(self)),
        }
    }
}
