//! The record kinds the store knows how to persist.

use jdrtables_core::{
    Campaign, EventLog, Invitation, InvitationStatus, InvitationTarget, Registration, Session,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sqlite::SqlRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Session,
    Campaign,
    Registration,
    Invitation,
    EventLog,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        Self::Session,
        Self::Campaign,
        Self::Registration,
        Self::Invitation,
        Self::EventLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Campaign => "campaign",
            Self::Registration => "registration",
            Self::Invitation => "invitation",
            Self::EventLog => "event_log",
        }
    }

    /// File name used by the JSON backend.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Session => "sessions.json",
            Self::Campaign => "campaigns.json",
            Self::Registration => "registrations.json",
            Self::Invitation => "invitations.json",
            Self::EventLog => "event_logs.json",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistable record. Every backend stores whole records keyed by `id`.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + SqlRecord + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Natural key that must be unique among stored records of this kind,
    /// if any. The SQLite schema carries the same rule as a unique index.
    fn unique_key(&self) -> Option<String> {
        None
    }
}

impl Record for Session {
    const KIND: EntityKind = EntityKind::Session;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Campaign {
    const KIND: EntityKind = EntityKind::Campaign;

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}/{}", self.gm_id, Campaign::name_key(&self.name)))
    }
}

impl Record for Registration {
    const KIND: EntityKind = EntityKind::Registration;

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_key(&self) -> Option<String> {
        Some(format!("{}/{}", self.session_id, self.player_id))
    }
}

impl Record for Invitation {
    const KIND: EntityKind = EntityKind::Invitation;

    fn id(&self) -> &str {
        &self.id
    }

    fn unique_key(&self) -> Option<String> {
        if self.status != InvitationStatus::Pending {
            return None;
        }
        let target = match &self.target {
            InvitationTarget::Campaign { campaign_id } => format!("campaign:{campaign_id}"),
            InvitationTarget::Session { session_id } => format!("session:{session_id}"),
        };
        Some(format!("{target}/{}", self.invited_player))
    }
}

impl Record for EventLog {
    const KIND: EntityKind = EntityKind::EventLog;

    fn id(&self) -> &str {
        &self.id
    }
}
