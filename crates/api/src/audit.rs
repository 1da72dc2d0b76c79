//! Fire-and-forget audit trail.
//!
//! Scheduler operations report what they did through an [`AuditSink`]. A
//! sink failure never fails the operation that triggered it: the scheduler
//! passes every `record` result through [`best_effort`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jdrtables_core::{Actor, EventLog, new_id};
use jdrtables_store::EntityStore;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    CampaignCreated,
    CampaignUpdated,
    CampaignDeleted,
    SessionCreated,
    SessionUpdated,
    SessionSoftDeleted,
    SessionRestored,
    SessionPermanentlyDeleted,
    SessionDuplicated,
    SessionsArchived,
    RegistrationCreated,
    PlayerPreregistered,
    RegistrationCancelled,
    PlayerRemoved,
    InvitationSent,
    InvitationResponded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CampaignCreated => "campaign_created",
            Self::CampaignUpdated => "campaign_updated",
            Self::CampaignDeleted => "campaign_deleted",
            Self::SessionCreated => "session_created",
            Self::SessionUpdated => "session_updated",
            Self::SessionSoftDeleted => "session_soft_deleted",
            Self::SessionRestored => "session_restored",
            Self::SessionPermanentlyDeleted => "session_permanently_deleted",
            Self::SessionDuplicated => "session_duplicated",
            Self::SessionsArchived => "sessions_archived",
            Self::RegistrationCreated => "registration_created",
            Self::PlayerPreregistered => "player_preregistered",
            Self::RegistrationCancelled => "registration_cancelled",
            Self::PlayerRemoved => "player_removed",
            Self::InvitationSent => "invitation_sent",
            Self::InvitationResponded => "invitation_responded",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One state change, before it is stamped and stored.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub event_type: EventType,
    pub user_id: Option<String>,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<String>,
    pub details: Value,
}

impl AuditEvent {
    pub fn new(event_type: EventType, actor: &Actor) -> Self {
        Self {
            event_type,
            user_id: Some(actor.user_id.clone()),
            entity_type: None,
            entity_id: None,
            details: Value::Object(Default::default()),
        }
    }

    pub fn entity(mut self, entity_type: &'static str, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn into_log(self, at: DateTime<Utc>) -> EventLog {
        EventLog {
            id: new_id(),
            user_id: self.user_id,
            event_type: self.event_type.as_str().to_string(),
            entity_type: self.entity_type.map(str::to_string),
            entity_id: self.entity_id,
            details: self.details,
            created_at: at,
        }
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent, at: DateTime<Utc>) -> jdrtables_store::Result<()>;
}

/// Persists events as `EventLog` records.
pub struct StoreAuditSink<S> {
    store: Arc<S>,
}

impl<S: EntityStore> StoreAuditSink<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: EntityStore> AuditSink for StoreAuditSink<S> {
    fn record(&self, event: AuditEvent, at: DateTime<Utc>) -> jdrtables_store::Result<()> {
        self.store.create(event.into_log(at))?;
        Ok(())
    }
}

/// Only writes events to the tracing log.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent, _at: DateTime<Utc>) -> jdrtables_store::Result<()> {
        tracing::info!(
            event = event.event_type.as_str(),
            user = event.user_id.as_deref().unwrap_or("-"),
            entity = event.entity_id.as_deref().unwrap_or("-"),
            "audit"
        );
        Ok(())
    }
}

/// Run a side effect whose failure must not fail the caller. Errors are
/// logged at `warn` and dropped.
pub fn best_effort<T, E: fmt::Display>(what: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("{what} failed (ignored): {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdrtables_store::SqliteStore;

    #[test]
    fn store_sink_persists_event_logs() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let sink = StoreAuditSink::new(store.clone());
        let actor = Actor::game_master("alice");
        let event = AuditEvent::new(EventType::SessionCreated, &actor)
            .entity("session", "s1")
            .details(serde_json::json!({"title": "Strahd"}));
        sink.record(event, jdrtables_core::testing::at(0, 9, 0))
            .unwrap();

        let logs: Vec<EventLog> = store.get_all().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event_type, "session_created");
        assert_eq!(logs[0].user_id.as_deref(), Some("alice"));
        assert_eq!(logs[0].entity_id.as_deref(), Some("s1"));
        assert_eq!(logs[0].details["title"], "Strahd");
    }

    #[test]
    fn best_effort_swallows_errors() {
        let failed: Result<u32, String> = Err("disk full".into());
        assert_eq!(best_effort("audit", failed), None);
        assert_eq!(best_effort::<_, String>("audit", Ok(3)), Some(3));
    }
}
