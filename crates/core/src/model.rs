//! Canonical records: sessions, campaigns, registrations, invitations and
//! event log entries, plus the caller identity handed to every operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Enums ──────────────────────────────────────────────────────────────────

/// Whether a session belongs to a campaign or stands alone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum GameType {
    Campaign,
    Oneshot,
}

impl GameType {
    pub const ALL: [GameType; 2] = [Self::Campaign, Self::Oneshot];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Campaign => "campaign",
            Self::Oneshot => "oneshot",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "campaign" => Some(Self::Campaign),
            "oneshot" => Some(Self::Oneshot),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Campaign => "Campaign",
            Self::Oneshot => "One-shot",
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a session. Soft deletion is tracked separately.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum SessionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 4] = [
        Self::Scheduled,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Scheduled => "Scheduled",
            Self::InProgress => "In progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// `completed` and `cancelled` end the normal flow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a player's seat. Only `confirmed` seats count toward capacity
/// and schedule conflicts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum RegistrationStatus {
    #[default]
    Confirmed,
    Tentative,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Tentative => "tentative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(Self::Confirmed),
            "tentative" => Some(Self::Tentative),
            _ => None,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of an invitation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role supplied by the identity provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum UserRole {
    #[default]
    Player,
    #[serde(alias = "mj", alias = "gm")]
    GameMaster,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::GameMaster => "game_master",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "player" => Some(Self::Player),
            "game_master" | "gm" | "mj" => Some(Self::GameMaster),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

// ─── Actor ──────────────────────────────────────────────────────────────────

/// The caller of an operation, as vouched for by the identity provider.
/// The scheduler never authenticates; it only evaluates ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn player(user_id: impl Into<String>) -> Self {
        Self::new(user_id, UserRole::Player)
    }

    pub fn game_master(user_id: impl Into<String>) -> Self {
        Self::new(user_id, UserRole::GameMaster)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// True when the actor owns a record (by GM id) or is an admin.
    pub fn can_manage(&self, owner_id: &str) -> bool {
        self.is_admin() || self.user_id == owner_id
    }
}

// ─── Records ────────────────────────────────────────────────────────────────

/// One scheduled play occurrence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Session {
    pub id: String,
    pub game_type: GameType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub session_number: u32,
    pub dm_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub min_players: u32,
    pub max_players: u32,
    #[serde(default)]
    pub trigger_warnings: Vec<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SessionStatus::Cancelled
    }
}

/// A recurring series of sessions under one game master.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub gm_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub trigger_warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Key under which campaign names collide within one GM's campaigns:
    /// the trimmed name, lowercased with full Unicode case mapping.
    pub fn name_key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}

/// A player's seat in a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Registration {
    pub id: String,
    pub session_id: String,
    pub player_id: String,
    #[serde(default)]
    pub character_id: Option<String>,
    #[serde(default)]
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_confirmed(&self) -> bool {
        self.status == RegistrationStatus::Confirmed
    }
}

/// What an invitation points at. Exactly one target, enforced by the type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub enum InvitationTarget {
    Campaign { campaign_id: String },
    Session { session_id: String },
}

impl InvitationTarget {
    pub fn campaign_id(&self) -> Option<&str> {
        match self {
            Self::Campaign { campaign_id } => Some(campaign_id),
            Self::Session { .. } => None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::Session { session_id } => Some(session_id),
            Self::Campaign { .. } => None,
        }
    }
}

/// An invitation from a game master to a player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Invitation {
    pub id: String,
    #[serde(flatten)]
    pub target: InvitationTarget,
    pub invited_by: String,
    pub invited_player: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub responded_at: Option<DateTime<Utc>>,
}

/// One audit entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct EventLog {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub event_type: String,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "ts", ts(type = "unknown"))]
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Generate a fresh opaque record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_round_trip_through_parse() {
        for status in SessionStatus::ALL {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        for game_type in GameType::ALL {
            assert_eq!(GameType::parse(game_type.as_str()), Some(game_type));
        }
        assert_eq!(SessionStatus::parse("archived"), None);
    }

    #[test]
    fn test_role_accepts_legacy_gm_spelling() {
        assert_eq!(UserRole::parse("MJ"), Some(UserRole::GameMaster));
        let role: UserRole = serde_json::from_str("\"mj\"").unwrap();
        assert_eq!(role, UserRole::GameMaster);
    }

    #[test]
    fn test_campaign_name_key_folds_unicode_case() {
        assert_eq!(Campaign::name_key("Écho"), Campaign::name_key("écho"));
        assert_eq!(Campaign::name_key("  STRAHD "), "strahd");
        assert_ne!(Campaign::name_key("Echo"), Campaign::name_key("Écho"));
    }

    #[test]
    fn test_actor_can_manage() {
        assert!(Actor::game_master("alice").can_manage("alice"));
        assert!(!Actor::game_master("bob").can_manage("alice"));
        assert!(Actor::admin("root").can_manage("alice"));
    }

    #[test]
    fn test_invitation_target_serializes_flat() {
        let inv = Invitation {
            id: "i1".into(),
            target: InvitationTarget::Session {
                session_id: "s1".into(),
            },
            invited_by: "alice".into(),
            invited_player: "bob".into(),
            message: String::new(),
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
            responded_at: None,
        };
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert!(json.get("campaign_id").is_none());

        let back: Invitation = serde_json::from_value(json).unwrap();
        assert_eq!(back.target.session_id(), Some("s1"));
    }
}
