//! Read-time classification of sessions into active, archived and deleted.
//!
//! Classification never depends on a persisted sweep having run: a session
//! whose end time has passed is archived even if its status still says
//! `scheduled`.

use chrono::{DateTime, Utc};

use crate::{Session, SessionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Active,
    Archived,
    Deleted,
}

pub fn classify(session: &Session, now: DateTime<Utc>) -> Bucket {
    if session.is_deleted() {
        Bucket::Deleted
    } else if session.status.is_terminal() || session.ends_at < now {
        Bucket::Archived
    } else {
        Bucket::Active
    }
}

/// Sessions the archive sweep should mark `completed`.
pub fn needs_completion(session: &Session, now: DateTime<Utc>) -> bool {
    !session.is_deleted()
        && matches!(
            session.status,
            SessionStatus::Scheduled | SessionStatus::InProgress
        )
        && session.ends_at < now
}

#[derive(Debug, Default)]
pub struct Partition<T> {
    pub active: Vec<T>,
    pub archived: Vec<T>,
    pub deleted: Vec<T>,
}

/// Split items by the bucket of the session each one carries. Relative order
/// is preserved inside every bucket.
pub fn partition<T, F>(items: Vec<T>, now: DateTime<Utc>, session_of: F) -> Partition<T>
where
    F: Fn(&T) -> &Session,
{
    let mut out = Partition {
        active: Vec::new(),
        archived: Vec::new(),
        deleted: Vec::new(),
    };
    for item in items {
        match classify(session_of(&item), now) {
            Bucket::Active => out.active.push(item),
            Bucket::Archived => out.archived.push(item),
            Bucket::Deleted => out.deleted.push(item),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, session};

    #[test]
    fn test_classify() {
        let now = at(5, 12, 0);
        let future = session("f", "alice", at(6, 20, 0), at(6, 23, 0));
        let past = session("p", "alice", at(1, 20, 0), at(1, 23, 0));
        let mut cancelled = future.clone();
        cancelled.status = SessionStatus::Cancelled;
        let mut deleted = future.clone();
        deleted.deleted_at = Some(now);

        assert_eq!(classify(&future, now), Bucket::Active);
        assert_eq!(classify(&past, now), Bucket::Archived);
        assert_eq!(classify(&cancelled, now), Bucket::Archived);
        assert_eq!(classify(&deleted, now), Bucket::Deleted);
    }

    #[test]
    fn test_running_session_stays_active() {
        let now = at(1, 21, 0);
        let running = session("r", "alice", at(1, 20, 0), at(1, 23, 0));
        assert_eq!(classify(&running, now), Bucket::Active);
        assert!(!needs_completion(&running, now));
    }

    #[test]
    fn test_needs_completion_skips_cancelled() {
        let now = at(5, 12, 0);
        let mut past = session("p", "alice", at(1, 20, 0), at(1, 23, 0));
        assert!(needs_completion(&past, now));
        past.status = SessionStatus::Cancelled;
        assert!(!needs_completion(&past, now));
    }

    #[test]
    fn test_partition_keeps_order() {
        let now = at(5, 12, 0);
        let sessions = vec![
            session("a", "alice", at(6, 20, 0), at(6, 23, 0)),
            session("b", "alice", at(1, 20, 0), at(1, 23, 0)),
            session("c", "alice", at(7, 20, 0), at(7, 23, 0)),
        ];
        let p = partition(sessions, now, |s| s);
        let ids: Vec<_> = p.active.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(p.archived.len(), 1);
        assert!(p.deleted.is_empty());
    }
}
