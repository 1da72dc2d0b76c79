//! Flat-file backend: one pretty-printed JSON array per record kind.
//!
//! All files are loaded on open and cached; every mutation rewrites the
//! affected file through a temp file + rename. Inside a transaction the
//! rewrites are deferred and each touched file is written once at the end.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use jdrtables_core::{Campaign, EventLog, Invitation, Registration, Session};
use serde_json::Value;

use crate::legacy::{self, ARCHIVES_FILE_NAME};
use crate::{EntityKind, EntityStore, Record, Result, StoreError};

type State = HashMap<EntityKind, Vec<Value>>;

pub struct JsonStore {
    dir: PathBuf,
    state: Mutex<State>,
    /// Kinds written during the open transaction, if any.
    pending: Mutex<Option<HashSet<EntityKind>>>,
}

impl JsonStore {
    /// Open the data directory, translating any legacy-shaped data.
    ///
    /// `legacy_session_hours` is the length given to legacy sessions, which
    /// only recorded a start.
    pub fn open(dir: &Path, legacy_session_hours: u32) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let mut state = HashMap::new();
        for kind in EntityKind::ALL {
            state.insert(kind, load_file(kind, &dir.join(kind.file_name()))?);
        }

        let store = Self {
            dir: dir.to_path_buf(),
            state: Mutex::new(state),
            pending: Mutex::new(None),
        };
        store.ingest_legacy(legacy_session_hours)?;
        store.check_all()?;
        Ok(store)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("json store mutex poisoned")
    }

    fn pending(&self) -> MutexGuard<'_, Option<HashSet<EntityKind>>> {
        self.pending.lock().expect("json store mutex poisoned")
    }

    /// Run `f` with file writes deferred. On success every touched kind is
    /// written once; on failure the cache goes back to its state before `f`.
    pub(crate) fn in_transaction<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        {
            let mut pending = self.pending();
            if pending.is_some() {
                drop(pending);
                return f();
            }
            *pending = Some(HashSet::new());
        }
        let snapshot = self.state().clone();

        let outcome = f();
        let dirty = self.pending().take().unwrap_or_default();
        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                *self.state() = snapshot;
                return Err(e);
            }
        };

        if let Err(e) = self.flush(&dirty) {
            *self.state() = snapshot;
            if let Err(restore) = self.flush(&dirty) {
                tracing::error!("restoring files after failed transaction: {restore}");
            }
            return Err(e);
        }
        Ok(value)
    }

    fn flush(&self, kinds: &HashSet<EntityKind>) -> Result<()> {
        let state = self.state();
        for kind in kinds {
            let records = state.get(kind).map(Vec::as_slice).unwrap_or_default();
            self.persist(*kind, records)?;
        }
        Ok(())
    }

    fn ingest_legacy(&self, session_hours: u32) -> Result<()> {
        let now = Utc::now();
        let archives_path = self.dir.join(ARCHIVES_FILE_NAME);
        let archived = if archives_path.exists() {
            load_file(EntityKind::Session, &archives_path)?
        } else {
            Vec::new()
        };

        let mut state = self.state();
        let mut dirty: Vec<EntityKind> = Vec::new();

        let campaign_values = state.remove(&EntityKind::Campaign).unwrap_or_default();
        let mut campaigns: Vec<Campaign> = Vec::with_capacity(campaign_values.len());
        let mut translated_campaigns = 0usize;
        for value in campaign_values {
            let campaign = if legacy::is_legacy_campaign(&value) {
                translated_campaigns += 1;
                legacy::translate_campaign(value, now).map_err(|detail| StoreError::Corrupt {
                    kind: EntityKind::Campaign,
                    detail,
                })?
            } else {
                decode(value)?
            };
            campaigns.push(campaign);
        }
        if translated_campaigns > 0 {
            dirty.push(EntityKind::Campaign);
        }

        let mut sessions = state.remove(&EntityKind::Session).unwrap_or_default();
        let mut registrations = state.remove(&EntityKind::Registration).unwrap_or_default();
        let mut translated_sessions = 0usize;
        let mut next: Vec<Value> = Vec::with_capacity(sessions.len() + archived.len());
        let pending = sessions
            .drain(..)
            .map(|v| (v, false))
            .chain(archived.into_iter().map(|v| (v, true)));
        for (value, from_archive) in pending {
            if !legacy::is_legacy_session(&value) {
                next.push(value);
                continue;
            }
            let translated =
                legacy::translate_session(value, &campaigns, from_archive, session_hours, now)
                    .map_err(|detail| StoreError::Corrupt {
                        kind: EntityKind::Session,
                        detail,
                    })?;
            let id = translated.session.id.clone();
            if next.iter().any(|v| id_of(v) == Some(id.as_str())) {
                tracing::warn!("Skipping legacy session {id}: already present");
                continue;
            }
            translated_sessions += 1;
            next.push(serde_json::to_value(&translated.session)?);
            for registration in translated.registrations {
                registrations.push(serde_json::to_value(&registration)?);
            }
        }
        if translated_sessions > 0 {
            dirty.extend([EntityKind::Session, EntityKind::Registration]);
        }

        let campaign_values = campaigns
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        state.insert(EntityKind::Campaign, campaign_values);
        state.insert(EntityKind::Session, next);
        state.insert(EntityKind::Registration, registrations);

        for kind in dirty {
            let records = state.get(&kind).map(Vec::as_slice).unwrap_or_default();
            self.persist(kind, records)?;
        }
        if archives_path.exists() {
            std::fs::rename(
                &archives_path,
                self.dir.join(format!("{ARCHIVES_FILE_NAME}.migrated")),
            )?;
        }
        if translated_campaigns + translated_sessions > 0 {
            tracing::info!(
                "Imported legacy data: {translated_campaigns} campaigns, {translated_sessions} sessions"
            );
        }
        Ok(())
    }

    /// Every cached record must decode as its kind.
    fn check_all(&self) -> Result<()> {
        self.get_all::<Session>()?;
        self.get_all::<Campaign>()?;
        self.get_all::<Registration>()?;
        self.get_all::<Invitation>()?;
        self.get_all::<EventLog>()?;
        Ok(())
    }

    /// Caller holds the state lock.
    fn persist(&self, kind: EntityKind, records: &[Value]) -> Result<()> {
        if let Some(dirty) = self.pending().as_mut() {
            dirty.insert(kind);
            return Ok(());
        }
        write_file(&self.dir.join(kind.file_name()), records)
    }
}

fn load_file(kind: EntityKind, path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&raw)? {
        Value::Array(items) => Ok(items),
        _ => Err(StoreError::Corrupt {
            kind,
            detail: format!("{} is not a JSON array", path.display()),
        }),
    }
}

fn write_file(path: &Path, records: &[Value]) -> Result<()> {
    let body = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn decode<R: Record>(value: Value) -> Result<R> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        kind: R::KIND,
        detail: e.to_string(),
    })
}

fn id_of(value: &Value) -> Option<&str> {
    value.get("id").and_then(Value::as_str)
}

/// Reject `record` if another record (other than `skip`) shares its natural key.
fn check_unique<R: Record>(records: &[Value], record: &R, skip: Option<usize>) -> Result<()> {
    let Some(key) = record.unique_key() else {
        return Ok(());
    };
    for (idx, value) in records.iter().enumerate() {
        if Some(idx) == skip {
            continue;
        }
        let existing: R = decode(value.clone())?;
        if existing.unique_key().as_deref() == Some(key.as_str()) {
            return Err(StoreError::Duplicate {
                kind: R::KIND,
                detail: key,
            });
        }
    }
    Ok(())
}

impl EntityStore for JsonStore {
    fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let state = self.state();
        state
            .get(&R::KIND)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|v| decode(v.clone()))
            .collect()
    }

    fn get_by_id<R: Record>(&self, id: &str) -> Result<Option<R>> {
        let state = self.state();
        state
            .get(&R::KIND)
            .and_then(|records| records.iter().find(|v| id_of(v) == Some(id)))
            .map(|v| decode(v.clone()))
            .transpose()
    }

    fn create<R: Record>(&self, record: R) -> Result<R> {
        let mut state = self.state();
        let records = state.entry(R::KIND).or_default();
        if records.iter().any(|v| id_of(v) == Some(record.id())) {
            return Err(StoreError::Duplicate {
                kind: R::KIND,
                detail: format!("id {}", record.id()),
            });
        }
        check_unique(records, &record, None)?;

        records.push(serde_json::to_value(&record)?);
        if let Err(e) = self.persist(R::KIND, records) {
            records.pop();
            return Err(e);
        }
        Ok(record)
    }

    fn update<R: Record>(&self, record: R) -> Result<R> {
        let mut state = self.state();
        let records = state.entry(R::KIND).or_default();
        let Some(idx) = records.iter().position(|v| id_of(v) == Some(record.id())) else {
            return Err(StoreError::NotFound {
                kind: R::KIND,
                id: record.id().to_string(),
            });
        };
        check_unique(records, &record, Some(idx))?;

        let previous = std::mem::replace(&mut records[idx], serde_json::to_value(&record)?);
        if let Err(e) = self.persist(R::KIND, records) {
            records[idx] = previous;
            return Err(e);
        }
        Ok(record)
    }

    fn delete<R: Record>(&self, id: &str) -> Result<()> {
        let mut state = self.state();
        let records = state.entry(R::KIND).or_default();
        let Some(idx) = records.iter().position(|v| id_of(v) == Some(id)) else {
            return Err(StoreError::NotFound {
                kind: R::KIND,
                id: id.to_string(),
            });
        };
        let removed = records.remove(idx);
        if let Err(e) = self.persist(R::KIND, records) {
            records.insert(idx, removed);
            return Err(e);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_array_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sessions.json"), r#"{"id": "x"}"#).unwrap();
        let err = JsonStore::open(dir.path(), 4).err().expect("open must fail");
        assert!(matches!(err, StoreError::Corrupt { kind: EntityKind::Session, .. }));
    }

    #[test]
    fn test_empty_directory_opens_clean() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path(), 4).unwrap();
        assert!(store.get_all::<Session>().unwrap().is_empty());
        // Nothing is written until the first mutation.
        assert!(!dir.path().join("sessions.json").exists());
    }
}
