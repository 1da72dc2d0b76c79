use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::{
    Campaign, GameType, Registration, RegistrationStatus, Session, SessionStatus,
};

/// Fixed reference calendar for tests: day 0 is 2030-06-01 (UTC), far
/// enough ahead that fixtures stay in the future.
pub fn at(day: i64, hour: u32, minute: u32) -> DateTime<Utc> {
    let base = Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap();
    base + Duration::days(day) + Duration::hours(i64::from(hour)) + Duration::minutes(i64::from(minute))
}

/// One-shot session with 3..=5 players and no registrations.
pub fn session(id: &str, dm_id: &str, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Session {
    Session {
        id: id.to_string(),
        game_type: GameType::Oneshot,
        title: format!("Session {id}"),
        description: String::new(),
        system: "D&D 5e".to_string(),
        campaign_id: None,
        session_number: 0,
        dm_id: dm_id.to_string(),
        starts_at,
        ends_at,
        min_players: 3,
        max_players: 5,
        trigger_warnings: Vec::new(),
        external_url: None,
        status: SessionStatus::Scheduled,
        deleted_at: None,
        created_at: at(0, 0, 0),
        updated_at: at(0, 0, 0),
    }
}

pub fn campaign(id: &str, gm_id: &str, name: &str) -> Campaign {
    Campaign {
        id: id.to_string(),
        name: name.to_string(),
        gm_id: gm_id.to_string(),
        description: String::new(),
        system: "D&D 5e".to_string(),
        trigger_warnings: Vec::new(),
        created_at: at(0, 0, 0),
        updated_at: at(0, 0, 0),
    }
}

/// Confirmed registration with a generated id.
pub fn registration(session_id: &str, player_id: &str) -> Registration {
    Registration {
        id: format!("reg-{}", next_id()),
        session_id: session_id.to_string(),
        player_id: player_id.to_string(),
        character_id: None,
        status: RegistrationStatus::Confirmed,
        registered_at: at(0, 0, 0),
    }
}

fn next_id() -> u32 {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}
