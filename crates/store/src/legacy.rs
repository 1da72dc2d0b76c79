//! Ingestion of the original flat-file layout.
//!
//! Old data stored a session as `date` + `time` + `gm` + `campaign` +
//! `episode` with players inlined as names, and moved past sessions into a
//! separate `archives.json`. These records are translated into canonical
//! sessions, campaigns and registrations when the JSON backend opens.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use jdrtables_core::{
    Campaign, GameType, Registration, RegistrationStatus, Session, SessionStatus, new_id,
};
use serde::Deserialize;
use serde_json::Value;

/// File the old store moved past sessions into.
pub const ARCHIVES_FILE_NAME: &str = "archives.json";

const DEFAULT_TIME: &str = "20:00";
const DEFAULT_MIN_PLAYERS: u32 = 3;
const DEFAULT_MAX_PLAYERS: u32 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySession {
    #[serde(default)]
    id: Option<String>,
    date: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    gm: String,
    #[serde(default)]
    campaign: String,
    #[serde(default)]
    episode: Option<Loose>,
    #[serde(default)]
    min_players: Option<Loose>,
    #[serde(default)]
    max_players: Option<Loose>,
    #[serde(default)]
    players: Players,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCampaign {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    gm: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

/// Numbers were sometimes stored as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(i64),
    Text(String),
}

impl Loose {
    fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Number(n) => u32::try_from(*n).ok(),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Player names, either a list or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Players {
    List(Vec<String>),
    Csv(String),
}

impl Default for Players {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl Players {
    fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::List(items) => items.iter().map(String::as_str).collect(),
            Self::Csv(s) => s.split(',').collect(),
        };
        let mut names: Vec<String> = Vec::new();
        for name in raw.into_iter().map(str::trim).filter(|n| !n.is_empty()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}

/// A legacy session is recognisable by its `date` field.
pub fn is_legacy_session(value: &Value) -> bool {
    value.get("date").is_some() && value.get("starts_at").is_none()
}

/// A legacy campaign names its GM `gm` rather than `gm_id`.
pub fn is_legacy_campaign(value: &Value) -> bool {
    value.get("gm_id").is_none() && value.get("name").is_some()
}

pub fn translate_campaign(value: Value, now: DateTime<Utc>) -> Result<Campaign, String> {
    let legacy: LegacyCampaign = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let created_at = legacy.created_at.unwrap_or(now);
    Ok(Campaign {
        id: legacy.id.unwrap_or_else(new_id),
        name: legacy.name.trim().to_string(),
        gm_id: legacy.gm.trim().to_string(),
        description: legacy.description,
        system: String::new(),
        trigger_warnings: Vec::new(),
        created_at,
        updated_at: created_at,
    })
}

/// A translated legacy session together with the registrations for the
/// players it listed inline.
#[derive(Debug)]
pub struct TranslatedSession {
    pub session: Session,
    pub registrations: Vec<Registration>,
}

/// Translate one legacy session.
///
/// Date and time are read as UTC; the session is given `session_hours` of
/// length. It becomes a campaign session when a campaign with the same name
/// (case-insensitive) and GM exists, otherwise a one-shot titled after the
/// free-text campaign field. Entries from the archives file are completed.
pub fn translate_session(
    value: Value,
    campaigns: &[Campaign],
    archived: bool,
    session_hours: u32,
    now: DateTime<Utc>,
) -> Result<TranslatedSession, String> {
    let legacy: LegacySession = serde_json::from_value(value).map_err(|e| e.to_string())?;

    let date = NaiveDate::parse_from_str(legacy.date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("bad date {:?}: {e}", legacy.date))?;
    let raw_time = legacy.time.as_deref().map(str::trim).unwrap_or(DEFAULT_TIME);
    let raw_time = if raw_time.is_empty() { DEFAULT_TIME } else { raw_time };
    let time = NaiveTime::parse_from_str(raw_time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw_time, "%H:%M:%S"))
        .map_err(|e| format!("bad time {raw_time:?}: {e}"))?;
    let starts_at = date.and_time(time).and_utc();
    let ends_at = starts_at + Duration::hours(i64::from(session_hours.max(1)));

    let gm = legacy.gm.trim().to_string();
    let label = legacy.campaign.trim();
    let campaign = campaigns
        .iter()
        .find(|c| c.gm_id == gm && c.name.eq_ignore_ascii_case(label));

    let (game_type, campaign_id, session_number) = match campaign {
        Some(c) => (
            GameType::Campaign,
            Some(c.id.clone()),
            legacy.episode.as_ref().and_then(Loose::as_u32).unwrap_or(1),
        ),
        None => (GameType::Oneshot, None, 0),
    };
    let title = match campaign {
        Some(c) => c.name.clone(),
        None if label.is_empty() => format!("Session {date}"),
        None => label.to_string(),
    };

    let min_players = legacy
        .min_players
        .as_ref()
        .and_then(Loose::as_u32)
        .unwrap_or(DEFAULT_MIN_PLAYERS)
        .max(1);
    let max_players = legacy
        .max_players
        .as_ref()
        .and_then(Loose::as_u32)
        .unwrap_or(DEFAULT_MAX_PLAYERS)
        .max(min_players);

    let created_at = legacy.created_at.unwrap_or(now);
    let session = Session {
        id: legacy.id.unwrap_or_else(new_id),
        game_type,
        title,
        description: String::new(),
        system: String::new(),
        campaign_id,
        session_number,
        dm_id: gm,
        starts_at,
        ends_at,
        min_players,
        max_players,
        trigger_warnings: Vec::new(),
        external_url: None,
        status: if archived {
            SessionStatus::Completed
        } else {
            SessionStatus::Scheduled
        },
        deleted_at: None,
        created_at,
        updated_at: created_at,
    };

    let registrations = legacy
        .players
        .names()
        .into_iter()
        .map(|player_id| Registration {
            id: new_id(),
            session_id: session.id.clone(),
            player_id,
            character_id: None,
            status: RegistrationStatus::Confirmed,
            registered_at: created_at,
        })
        .collect();

    Ok(TranslatedSession {
        session,
        registrations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_detects_legacy_shapes() {
        assert!(is_legacy_session(&json!({"date": "2030-06-01", "gm": "Alice"})));
        assert!(!is_legacy_session(&json!({"starts_at": "2030-06-01T20:00:00Z"})));
        assert!(is_legacy_campaign(&json!({"name": "Strahd", "gm": "Alice"})));
        assert!(!is_legacy_campaign(&json!({"name": "Strahd", "gm_id": "Alice"})));
    }

    #[test]
    fn test_session_matching_campaign_becomes_campaign_session() {
        let campaign = translate_campaign(
            json!({"id": "c1", "name": "La Malédiction de Strahd", "gm": "Alice"}),
            now(),
        )
        .unwrap();
        let translated = translate_session(
            json!({
                "id": "s1",
                "date": "2030-06-08",
                "time": "19:30",
                "gm": "Alice",
                "campaign": "La Malédiction de Strahd",
                "episode": "5",
                "minPlayers": 2,
                "maxPlayers": "4",
                "players": ["Bob", "Carol", "Bob"]
            }),
            &[campaign],
            false,
            4,
            now(),
        )
        .unwrap();

        let s = &translated.session;
        assert_eq!(s.id, "s1");
        assert_eq!(s.game_type, GameType::Campaign);
        assert_eq!(s.campaign_id.as_deref(), Some("c1"));
        assert_eq!(s.session_number, 5);
        assert_eq!(s.dm_id, "Alice");
        assert_eq!(s.starts_at, Utc.with_ymd_and_hms(2030, 6, 8, 19, 30, 0).unwrap());
        assert_eq!(s.ends_at, Utc.with_ymd_and_hms(2030, 6, 8, 23, 30, 0).unwrap());
        assert_eq!((s.min_players, s.max_players), (2, 4));
        assert_eq!(s.status, SessionStatus::Scheduled);

        let players: Vec<&str> = translated
            .registrations
            .iter()
            .map(|r| r.player_id.as_str())
            .collect();
        assert_eq!(players, ["Bob", "Carol"]);
        assert!(translated.registrations.iter().all(|r| r.session_id == "s1"));
    }

    #[test]
    fn test_unknown_campaign_becomes_oneshot_with_defaults() {
        let translated = translate_session(
            json!({"date": "2030-06-08", "gm": "Bob", "campaign": "L'Appel de Cthulhu", "players": "Dan, Eve"}),
            &[],
            true,
            3,
            now(),
        )
        .unwrap();
        let s = &translated.session;
        assert_eq!(s.game_type, GameType::Oneshot);
        assert_eq!(s.campaign_id, None);
        assert_eq!(s.title, "L'Appel de Cthulhu");
        assert_eq!(s.starts_at, Utc.with_ymd_and_hms(2030, 6, 8, 20, 0, 0).unwrap());
        assert_eq!(s.ends_at - s.starts_at, Duration::hours(3));
        assert_eq!((s.min_players, s.max_players), (3, 5));
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(translated.registrations.len(), 2);
    }

    #[test]
    fn test_inconsistent_player_bounds_are_repaired() {
        let translated = translate_session(
            json!({"date": "2030-06-08", "gm": "Bob", "minPlayers": 6, "maxPlayers": 4}),
            &[],
            false,
            4,
            now(),
        )
        .unwrap();
        assert_eq!(translated.session.min_players, 6);
        assert_eq!(translated.session.max_players, 6);
        assert_eq!(translated.session.title, "Session 2030-06-08");
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let err = translate_session(json!({"date": "08/06/2030"}), &[], false, 4, now())
            .unwrap_err();
        assert!(err.contains("bad date"), "{err}");
    }
}
