use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::trigger_warnings;
use crate::{GameType, Session, SessionStatus};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_NAME_LEN: usize = 120;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
    #[error("ends_at must be after starts_at")]
    InvalidTimeWindow,
    #[error("session_number must be a non-negative integer, got {value}")]
    NegativeSessionNumber { value: i64 },
    #[error("{field} must be at most {max}, got {value}", max = u32::MAX)]
    OutOfRange { field: String, value: i64 },
    #[error("{field} must be a positive integer, got {value}")]
    NonPositivePlayers { field: String, value: i64 },
    #[error("min_players ({min}) must not exceed max_players ({max})")]
    PlayerRange { min: i64, max: i64 },
    #[error("campaign sessions require a campaign_id")]
    MissingCampaign,
    #[error("unknown trigger warning: {tag}")]
    UnknownTriggerWarning { tag: String },
    #[error("max_players ({max}) is below the {current} confirmed registrations")]
    CapacityBelowRegistrations { max: u32, current: usize },
    #[error("cannot change status from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// Join a batch of validation errors into one human-readable message.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Unchecked session fields as they arrive from a caller, with integers still
/// signed so that negative input can be reported instead of wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionDraft {
    pub game_type: GameType,
    pub title: String,
    pub description: String,
    pub system: String,
    pub campaign_id: Option<String>,
    pub session_number: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub min_players: i64,
    pub max_players: i64,
    pub trigger_warnings: Vec<String>,
    pub external_url: Option<String>,
}

impl SessionDraft {
    /// Draft describing an existing session, used as the base for patches.
    pub fn from_session(session: &Session) -> Self {
        Self {
            game_type: session.game_type,
            title: session.title.clone(),
            description: session.description.clone(),
            system: session.system.clone(),
            campaign_id: session.campaign_id.clone(),
            session_number: i64::from(session.session_number),
            starts_at: session.starts_at,
            ends_at: session.ends_at,
            min_players: i64::from(session.min_players),
            max_players: i64::from(session.max_players),
            trigger_warnings: session.trigger_warnings.clone(),
            external_url: session.external_url.clone(),
        }
    }
}

/// Session fields that passed validation and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidSession {
    pub game_type: GameType,
    pub title: String,
    pub description: String,
    pub system: String,
    pub campaign_id: Option<String>,
    pub session_number: u32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub min_players: u32,
    pub max_players: u32,
    pub trigger_warnings: Vec<String>,
    pub external_url: Option<String>,
}

impl ValidSession {
    /// Build a brand-new `scheduled` session owned by `dm_id`.
    pub fn into_session(self, id: String, dm_id: String, now: DateTime<Utc>) -> Session {
        Session {
            id,
            game_type: self.game_type,
            title: self.title,
            description: self.description,
            system: self.system,
            campaign_id: self.campaign_id,
            session_number: self.session_number,
            dm_id,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            min_players: self.min_players,
            max_players: self.max_players,
            trigger_warnings: self.trigger_warnings,
            external_url: self.external_url,
            status: SessionStatus::Scheduled,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable fields of `session`.
    pub fn apply_to(self, session: &mut Session, now: DateTime<Utc>) {
        session.game_type = self.game_type;
        session.title = self.title;
        session.description = self.description;
        session.system = self.system;
        session.campaign_id = self.campaign_id;
        session.session_number = self.session_number;
        session.starts_at = self.starts_at;
        session.ends_at = self.ends_at;
        session.min_players = self.min_players;
        session.max_players = self.max_players;
        session.trigger_warnings = self.trigger_warnings;
        session.external_url = self.external_url;
        session.updated_at = now;
    }
}

/// Validate a draft by composing independent validators. Every problem is
/// reported, not just the first one.
pub fn validate_draft(draft: &SessionDraft) -> Result<ValidSession, Vec<ValidationError>> {
    let validators: &[fn(&SessionDraft) -> Vec<ValidationError>] = &[
        validate_title,
        validate_time_window,
        validate_session_number,
        validate_player_counts,
        validate_campaign_link,
    ];

    let mut errors: Vec<ValidationError> = validators.iter().flat_map(|v| v(draft)).collect();

    let trigger_warnings = match trigger_warnings::normalize(&draft.trigger_warnings) {
        Ok(tags) => tags,
        Err(mut errs) => {
            errors.append(&mut errs);
            Vec::new()
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let campaign_id = match draft.game_type {
        GameType::Campaign => draft.campaign_id.clone(),
        GameType::Oneshot => None,
    };

    Ok(ValidSession {
        game_type: draft.game_type,
        title: draft.title.trim().to_string(),
        description: draft.description.trim().to_string(),
        system: draft.system.trim().to_string(),
        campaign_id,
        session_number: u32::try_from(draft.session_number).unwrap_or(u32::MAX),
        starts_at: draft.starts_at,
        ends_at: draft.ends_at,
        min_players: u32::try_from(draft.min_players).unwrap_or(u32::MAX),
        max_players: u32::try_from(draft.max_players).unwrap_or(u32::MAX),
        trigger_warnings,
        external_url: draft
            .external_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from),
    })
}

fn validate_title(draft: &SessionDraft) -> Vec<ValidationError> {
    validate_label("title", &draft.title, MAX_TITLE_LEN)
        .err()
        .into_iter()
        .collect()
}

fn validate_time_window(draft: &SessionDraft) -> Vec<ValidationError> {
    if draft.ends_at > draft.starts_at {
        vec![]
    } else {
        vec![ValidationError::InvalidTimeWindow]
    }
}

/// Stored counts are `u32`.
const COUNT_LIMIT: i64 = u32::MAX as i64;

fn validate_session_number(draft: &SessionDraft) -> Vec<ValidationError> {
    let value = draft.session_number;
    if value < 0 {
        vec![ValidationError::NegativeSessionNumber { value }]
    } else if value > COUNT_LIMIT {
        vec![ValidationError::OutOfRange {
            field: "session_number".into(),
            value,
        }]
    } else {
        vec![]
    }
}

fn validate_player_counts(draft: &SessionDraft) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = [
        ("min_players", draft.min_players),
        ("max_players", draft.max_players),
    ]
    .into_iter()
    .filter_map(|(field, value)| {
        let field = field.to_string();
        if value <= 0 {
            Some(ValidationError::NonPositivePlayers { field, value })
        } else if value > COUNT_LIMIT {
            Some(ValidationError::OutOfRange { field, value })
        } else {
            None
        }
    })
    .collect();

    if errors.is_empty() && draft.min_players > draft.max_players {
        errors.push(ValidationError::PlayerRange {
            min: draft.min_players,
            max: draft.max_players,
        });
    }
    errors
}

fn validate_campaign_link(draft: &SessionDraft) -> Vec<ValidationError> {
    let missing = draft
        .campaign_id
        .as_deref()
        .is_none_or(|id| id.trim().is_empty());
    if draft.game_type == GameType::Campaign && missing {
        vec![ValidationError::MissingCampaign]
    } else {
        vec![]
    }
}

/// Validate and trim a required short label (titles, campaign names).
pub fn validate_label(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn draft() -> SessionDraft {
        let start = Utc.with_ymd_and_hms(2026, 11, 6, 20, 0, 0).unwrap();
        SessionDraft {
            game_type: GameType::Oneshot,
            title: "  The Sunless Citadel ".into(),
            description: String::new(),
            system: "D&D 5e".into(),
            campaign_id: None,
            session_number: 0,
            starts_at: start,
            ends_at: start + Duration::hours(3),
            min_players: 3,
            max_players: 5,
            trigger_warnings: vec![],
            external_url: None,
        }
    }

    #[test]
    fn test_valid_draft_is_trimmed() {
        let valid = validate_draft(&draft()).unwrap();
        assert_eq!(valid.title, "The Sunless Citadel");
        assert_eq!(valid.max_players, 5);
    }

    #[test]
    fn test_end_must_follow_start() {
        let mut d = draft();
        d.ends_at = d.starts_at;
        let errs = validate_draft(&d).unwrap_err();
        assert_eq!(errs, vec![ValidationError::InvalidTimeWindow]);
    }

    #[test]
    fn test_negative_session_number() {
        let mut d = draft();
        d.session_number = -1;
        let errs = validate_draft(&d).unwrap_err();
        assert!(matches!(
            errs[0],
            ValidationError::NegativeSessionNumber { value: -1 }
        ));
    }

    #[test]
    fn test_oversized_counts_are_out_of_range() {
        let too_big = i64::from(u32::MAX) + 1;
        let mut d = draft();
        d.session_number = too_big;
        let errs = validate_draft(&d).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::OutOfRange {
                field: "session_number".into(),
                value: too_big,
            }]
        );

        let mut d = draft();
        d.session_number = i64::from(u32::MAX);
        d.max_players = too_big;
        let errs = validate_draft(&d).unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::OutOfRange {
                field: "max_players".into(),
                value: too_big,
            }]
        );
        assert!(errs[0].to_string().contains("at most 4294967295"));
    }

    #[test]
    fn test_player_range() {
        let mut d = draft();
        d.min_players = 6;
        let errs = validate_draft(&d).unwrap_err();
        assert_eq!(errs, vec![ValidationError::PlayerRange { min: 6, max: 5 }]);

        d.min_players = 0;
        let errs = validate_draft(&d).unwrap_err();
        assert!(matches!(errs[0], ValidationError::NonPositivePlayers { .. }));
    }

    #[test]
    fn test_campaign_type_requires_link() {
        let mut d = draft();
        d.game_type = GameType::Campaign;
        assert_eq!(
            validate_draft(&d).unwrap_err(),
            vec![ValidationError::MissingCampaign]
        );

        d.campaign_id = Some("c1".into());
        assert_eq!(validate_draft(&d).unwrap().campaign_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_oneshot_drops_campaign_link() {
        let mut d = draft();
        d.campaign_id = Some("c1".into());
        assert_eq!(validate_draft(&d).unwrap().campaign_id, None);
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut d = draft();
        d.title = "   ".into();
        d.ends_at = d.starts_at - Duration::hours(1);
        d.trigger_warnings = vec!["spiders".into()];
        let errs = validate_draft(&d).unwrap_err();
        assert_eq!(errs.len(), 3);
        assert!(describe(&errs).contains("missing required field: title"));
    }

    #[test]
    fn test_validate_label() {
        assert_eq!(validate_label("name", " Strahd ", 10).unwrap(), "Strahd");
        assert!(validate_label("name", "", 10).is_err());
        assert!(validate_label("name", &"x".repeat(11), 10).is_err());
    }
}
