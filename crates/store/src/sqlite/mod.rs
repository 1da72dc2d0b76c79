//! SQLite backend. One table per record kind, queries built with sea-query.

mod migrations;
pub mod query;
mod rows;
pub mod tables;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params_from_iter};
use sea_query::{Iden, Order, SimpleExpr};

use crate::{EntityKind, EntityStore, Record, Result, StoreError};

pub use migrations::{MIGRATIONS, Migration};
pub use rows::format_ts;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "jdrtables.db";

/// Table mapping for a record kind.
pub trait SqlRecord: Sized {
    type Column: Iden + Copy + 'static;

    fn table() -> Self::Column;
    fn id_column() -> Self::Column;
    /// All columns, primary key first.
    fn columns() -> Vec<Self::Column>;
    /// Column values in `columns()` order.
    fn values(&self) -> Vec<SimpleExpr>;
    fn order_by() -> (Self::Column, Order);
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;
}

/// Convert `sea_query::Values` into rusqlite bind params.
pub fn bind_values(values: &sea_query::Values) -> Vec<SqlValue> {
    use sea_query::Value;
    values
        .0
        .iter()
        .map(|v| match v {
            Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            Value::TinyInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::SmallInt(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            Value::BigInt(Some(i)) => SqlValue::Integer(*i),
            Value::TinyUnsigned(Some(u)) => SqlValue::Integer(i64::from(*u)),
            Value::SmallUnsigned(Some(u)) => SqlValue::Integer(i64::from(*u)),
            Value::Unsigned(Some(u)) => SqlValue::Integer(i64::from(*u)),
            Value::BigUnsigned(Some(u)) => SqlValue::Integer(i64::try_from(*u).unwrap_or(i64::MAX)),
            Value::Float(Some(f)) => SqlValue::Real(f64::from(*f)),
            Value::Double(Some(f)) => SqlValue::Real(*f),
            Value::String(Some(s)) => SqlValue::Text(s.to_string()),
            Value::Char(Some(c)) => SqlValue::Text(c.to_string()),
            Value::Bytes(Some(b)) => SqlValue::Blob(b.to_vec()),
            _ => SqlValue::Null,
        })
        .collect()
}

/// Relational entity store. A single connection behind a mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file, enable WAL and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// BEGIN/COMMIT around `f` on the shared connection, ROLLBACK when it
    /// fails. Joins an already open transaction.
    pub(crate) fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let autocommit = self.conn().is_autocommit();
        if !autocommit {
            return f();
        }

        self.conn().execute_batch("BEGIN IMMEDIATE")?;
        let result = f().and_then(|value| {
            self.conn().execute_batch("COMMIT")?;
            Ok(value)
        });
        if result.is_err() {
            if let Err(e) = self.conn().execute_batch("ROLLBACK") {
                tracing::error!("rollback failed: {e}");
            }
        }
        result
    }

    /// Names of the migrations applied to this database, oldest first.
    pub fn applied_migrations(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM _migrations ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if !already_applied {
            conn.execute_batch(sql)?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

/// Map unique/primary-key violations to `Duplicate`; everything else stays a
/// plain SQLite error.
fn write_error(kind: EntityKind, err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
            let primary = e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY;
            let unique = e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE;
            if primary || unique {
                StoreError::Duplicate {
                    kind,
                    detail: msg.clone().unwrap_or_else(|| e.to_string()),
                }
            } else {
                StoreError::Sqlite(err)
            }
        }
        _ => StoreError::Sqlite(err),
    }
}

impl EntityStore for SqliteStore {
    fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let (sql, values) = query::select_all::<R>();
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(bind_values(&values)), R::from_row)?
            .collect::<rusqlite::Result<Vec<R>>>()?;
        Ok(records)
    }

    fn get_by_id<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let (sql, values) = query::select_by_id::<R>(id);
        let record = self
            .conn()
            .query_row(&sql, params_from_iter(bind_values(&values)), R::from_row)
            .optional()?;
        Ok(record)
    }

    fn create<R: Record>(&self, record: R) -> Result<R> {
        let (sql, values) = query::insert(&record);
        self.conn()
            .execute(&sql, params_from_iter(bind_values(&values)))
            .map_err(|e| write_error(R::KIND, e))?;
        Ok(record)
    }

    fn update<R: Record>(&self, record: R) -> Result<R> {
        let (sql, values) = query::update(&record, record.id());
        let changed = self
            .conn()
            .execute(&sql, params_from_iter(bind_values(&values)))
            .map_err(|e| write_error(R::KIND, e))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: R::KIND,
                id: record.id().to_string(),
            });
        }
        Ok(record)
    }

    fn delete<R: Record>(&self, id: &str) -> Result<()> {
        let (sql, values) = query::delete::<R>(id);
        let changed = self
            .conn()
            .execute(&sql, params_from_iter(bind_values(&values)))?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.in_transaction(|| f(self))
    }
}
