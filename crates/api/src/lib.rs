//! Shared API types and the scheduling service for jdr-tables.
//!
//! This crate is the single source of truth for request/response shapes.
//! TypeScript types are generated via `ts-rs` behind the `ts` feature:
//!   cargo test -p jdrtables-api --features ts -- export_typescript --nocapture

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
pub mod audit;
#[cfg(feature = "backend")]
pub mod service;
pub mod views;

pub use jdrtables_core::validate::ValidationError;
pub use jdrtables_core::{
    Actor, Campaign, EventLog, GameType, Invitation, InvitationStatus, InvitationTarget,
    Registration, RegistrationStatus, Session, SessionStatus, UserRole,
};

// ─── Campaigns ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub trigger_warnings: Vec<String>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub system: Option<String>,
    pub trigger_warnings: Option<Vec<String>>,
}

// ─── Sessions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CreateSessionRequest {
    pub game_type: GameType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub session_number: Option<i64>,
    pub starts_at: DateTime<Utc>,
    /// Defaults to `starts_at` plus the configured session length.
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_players: Option<i64>,
    #[serde(default)]
    pub max_players: Option<i64>,
    #[serde(default)]
    pub trigger_warnings: Vec<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    /// Players seated at creation time.
    #[serde(default)]
    pub preregistered_players: Vec<String>,
}

/// Partial update; absent fields are left unchanged. An empty
/// `external_url` clears the link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UpdateSessionRequest {
    pub game_type: Option<GameType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub system: Option<String>,
    pub campaign_id: Option<String>,
    pub session_number: Option<i64>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub min_players: Option<i64>,
    pub max_players: Option<i64>,
    pub trigger_warnings: Option<Vec<String>>,
    pub external_url: Option<String>,
    pub status: Option<SessionStatus>,
}

/// A session as presented to callers: the stored record plus values derived
/// from live registrations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub current_players: u32,
    pub available_slots: u32,
    /// Confirmed player ids in registration order.
    pub players: Vec<String>,
    /// `None` for one-shots and for dangling campaign references.
    pub campaign_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SessionListResponse {
    pub active: Vec<SessionView>,
    pub archived: Vec<SessionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ArchiveSweepResponse {
    pub archived_count: u32,
}

// ─── Registrations ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct JoinRequest {
    #[serde(default)]
    pub character_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RegisterPlayerRequest {
    pub player_id: String,
    #[serde(default)]
    pub character_id: Option<String>,
}

// ─── Invitations ────────────────────────────────────────────────────────────

/// Exactly one of `campaign_id` / `session_id` must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct InviteRequest {
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    pub invited_player: String,
    #[serde(default)]
    pub message: String,
}

impl InviteRequest {
    pub fn target(&self) -> Result<InvitationTarget, ServiceError> {
        match (&self.campaign_id, &self.session_id) {
            (Some(campaign_id), None) => Ok(InvitationTarget::Campaign {
                campaign_id: campaign_id.clone(),
            }),
            (None, Some(session_id)) => Ok(InvitationTarget::Session {
                session_id: session_id.clone(),
            }),
            _ => Err(ServiceError::Validation(
                "exactly one of campaign_id or session_id is required".into(),
            )),
        }
    }
}

// ─── Schedule checks ────────────────────────────────────────────────────────

/// Whose calendar a schedule check looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSubject {
    GameMaster,
    Player,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct DmScheduleRequest {
    pub dm_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// The session being edited, so it does not conflict with itself.
    #[serde(default)]
    pub exclude_session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PlayerScheduleRequest {
    pub player_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub exclude_session_id: Option<String>,
}

/// Result of a schedule check. Nothing is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ScheduleCheckResponse {
    pub has_conflict: bool,
    pub conflict_session: Option<Session>,
}

// ─── Events ─────────────────────────────────────────────────────────────────

/// Default and maximum number of events returned by one listing.
pub const EVENT_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct EventQuery {
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub entity_type: Option<String>,
    pub limit: Option<u32>,
}

// ─── Misc ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct TriggerWarningInfo {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl From<&jdrtables_core::trigger_warnings::TriggerWarning> for TriggerWarningInfo {
    fn from(tw: &jdrtables_core::trigger_warnings::TriggerWarning) -> Self {
        Self {
            id: tw.id.to_string(),
            label: tw.label.to_string(),
            description: tw.description.to_string(),
        }
    }
}

/// One entry of a fixed lookup list (game types, session statuses).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LookupEntry {
    pub id: String,
    pub label: String,
}

impl From<GameType> for LookupEntry {
    fn from(game_type: GameType) -> Self {
        Self {
            id: game_type.as_str().to_string(),
            label: game_type.label().to_string(),
        }
    }
}

impl From<SessionStatus> for LookupEntry {
    fn from(status: SessionStatus) -> Self {
        Self {
            id: status.as_str().to_string(),
            label: status.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}

// ─── Service Error ──────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code. The server converts this into
/// its own response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    NotFound(String),
    Validation(String),
    ScheduleConflict(String),
    Full(String),
    AlreadyRegistered(String),
    InvalidState(String),
    DuplicatePending(String),
    NameTaken(String),
    Unauthorized(String),
    Forbidden(String),
    /// Details are for the log only.
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::ScheduleConflict(_)
            | Self::Full(_)
            | Self::AlreadyRegistered(_)
            | Self::InvalidState(_)
            | Self::DuplicatePending(_)
            | Self::NameTaken(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::ScheduleConflict(_) => "schedule_conflict",
            Self::Full(_) => "full",
            Self::AlreadyRegistered(_) => "already_registered",
            Self::InvalidState(_) => "invalid_state",
            Self::DuplicatePending(_) => "duplicate_pending",
            Self::NameTaken(_) => "name_taken",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Internal(_) => "internal",
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::Validation(m)
            | Self::ScheduleConflict(m)
            | Self::Full(m)
            | Self::AlreadyRegistered(m)
            | Self::InvalidState(m)
            | Self::DuplicatePending(m)
            | Self::NameTaken(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<Vec<ValidationError>> for ServiceError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::Validation(jdrtables_core::validate::describe(&errors))
    }
}

#[cfg(feature = "backend")]
impl From<jdrtables_store::StoreError> for ServiceError {
    fn from(e: jdrtables_store::StoreError) -> Self {
        use jdrtables_store::{EntityKind, StoreError};
        match e {
            StoreError::NotFound { kind, id } => Self::NotFound(format!("{kind} not found: {id}")),
            // Uniqueness rules the service checks first; reaching the store
            // means a concurrent writer got there first.
            StoreError::Duplicate {
                kind: EntityKind::Registration,
                ..
            } => Self::AlreadyRegistered("player is already registered for this session".into()),
            StoreError::Duplicate {
                kind: EntityKind::Campaign,
                ..
            } => Self::NameTaken("you already have a campaign with this name".into()),
            StoreError::Duplicate {
                kind: EntityKind::Invitation,
                ..
            } => Self::DuplicatePending("a pending invitation already exists".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

// ─── Error (JSON shape) ─────────────────────────────────────────────────────

/// JSON error shape `{ "error": "..." }` returned by all error responses.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ApiError {
    pub error: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message().to_string(),
        }
    }
}


// ─── TypeScript generation ───────────────────────────────────────────────────
