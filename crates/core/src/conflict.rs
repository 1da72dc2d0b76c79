//! Time-overlap detection for game masters and players.
//!
//! Intervals are half-open: a session ending at 23:00 does not conflict with
//! one starting at 23:00. When several commitments overlap, the first one in
//! slice order is reported.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{Registration, Session};

pub fn has_overlap(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Cancelled and soft-deleted sessions do not occupy anyone's calendar.
pub fn occupies_calendar(session: &Session) -> bool {
    !session.is_cancelled() && !session.is_deleted()
}

/// First session run by `dm_id` that overlaps `[starts_at, ends_at)`.
pub fn check_dm_conflict<'a>(
    sessions: &'a [Session],
    dm_id: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exclude_session_id: Option<&str>,
) -> Option<&'a Session> {
    sessions.iter().find(|s| {
        s.dm_id == dm_id
            && Some(s.id.as_str()) != exclude_session_id
            && occupies_calendar(s)
            && has_overlap(starts_at, ends_at, s.starts_at, s.ends_at)
    })
}

/// First session the player holds a confirmed seat in that overlaps
/// `[starts_at, ends_at)`. Registrations pointing at unknown sessions are
/// skipped.
pub fn check_player_conflict<'a>(
    registrations: &[Registration],
    sessions: &'a [Session],
    player_id: &str,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    exclude_session_id: Option<&str>,
) -> Option<&'a Session> {
    let by_id: HashMap<&str, &'a Session> = sessions.iter().map(|s| (s.id.as_str(), s)).collect();

    registrations
        .iter()
        .filter(|r| r.player_id == player_id && r.is_confirmed())
        .filter(|r| Some(r.session_id.as_str()) != exclude_session_id)
        .filter_map(|r| by_id.get(r.session_id.as_str()).copied())
        .find(|s| occupies_calendar(s) && has_overlap(starts_at, ends_at, s.starts_at, s.ends_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, registration, session};
    use crate::{RegistrationStatus, SessionStatus};

    #[test]
    fn test_has_overlap_half_open() {
        let (a, b, c, d) = (at(1, 20, 0), at(1, 23, 0), at(1, 23, 0), at(2, 1, 0));
        assert!(!has_overlap(a, b, c, d));
        assert!(has_overlap(a, b, at(1, 22, 59), d));
        // containment
        assert!(has_overlap(a, d, at(1, 21, 0), at(1, 22, 0)));
    }

    #[test]
    fn test_dm_conflict_found() {
        let sessions = vec![session("s1", "alice", at(1, 20, 0), at(1, 23, 0))];
        let hit = check_dm_conflict(&sessions, "alice", at(1, 20, 30), at(1, 22, 0), None);
        assert_eq!(hit.map(|s| s.id.as_str()), Some("s1"));
    }

    #[test]
    fn test_dm_conflict_other_gm_ignored() {
        let sessions = vec![session("s1", "alice", at(1, 20, 0), at(1, 23, 0))];
        assert!(check_dm_conflict(&sessions, "bob", at(1, 20, 0), at(1, 23, 0), None).is_none());
    }

    #[test]
    fn test_dm_conflict_skips_excluded_cancelled_and_deleted() {
        let mut cancelled = session("s2", "alice", at(1, 20, 0), at(1, 23, 0));
        cancelled.status = SessionStatus::Cancelled;
        let mut deleted = session("s3", "alice", at(1, 20, 0), at(1, 23, 0));
        deleted.deleted_at = Some(at(0, 12, 0));
        let sessions = vec![
            session("s1", "alice", at(1, 20, 0), at(1, 23, 0)),
            cancelled,
            deleted,
        ];
        assert!(
            check_dm_conflict(&sessions, "alice", at(1, 21, 0), at(1, 22, 0), Some("s1")).is_none()
        );
    }

    #[test]
    fn test_player_conflict_only_counts_confirmed() {
        let sessions = vec![
            session("s1", "alice", at(1, 20, 0), at(1, 23, 0)),
            session("s2", "carol", at(1, 21, 0), at(1, 22, 0)),
        ];
        let mut tentative = registration("s1", "bob");
        tentative.status = RegistrationStatus::Tentative;
        assert!(
            check_player_conflict(&[tentative], &sessions, "bob", at(1, 21, 0), at(1, 22, 0), None)
                .is_none()
        );

        let regs = vec![registration("s1", "bob")];
        let hit = check_player_conflict(&regs, &sessions, "bob", at(1, 21, 0), at(1, 22, 0), Some("s2"));
        assert_eq!(hit.map(|s| s.id.as_str()), Some("s1"));
    }

    #[test]
    fn test_player_conflict_ignores_other_players_and_orphans() {
        let sessions = vec![session("s1", "alice", at(1, 20, 0), at(1, 23, 0))];
        let regs = vec![registration("s1", "carol"), registration("gone", "bob")];
        assert!(
            check_player_conflict(&regs, &sessions, "bob", at(1, 20, 0), at(1, 23, 0), None)
                .is_none()
        );
    }
}
