//! Status transitions and session duplication.

use chrono::Duration;

use crate::validate::{SessionDraft, ValidationError};
use crate::{Session, SessionStatus};

/// Marker appended to the title of a duplicated session.
pub const COPY_SUFFIX: &str = " (copy)";

impl SessionStatus {
    /// `scheduled → in_progress → completed`, with `cancelled` reachable from
    /// the two non-terminal states. Re-asserting the current status is allowed.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Scheduled, InProgress)
                    | (Scheduled, Cancelled)
                    | (InProgress, Completed)
                    | (InProgress, Cancelled)
                    | (Scheduled, Completed)
            )
    }
}

pub fn check_transition(from: SessionStatus, to: SessionStatus) -> Result<(), ValidationError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(ValidationError::InvalidTransition { from, to })
    }
}

/// Draft for the next episode of `session`: same metadata, number + 1, time
/// window shifted by `offset`, title marked as a copy.
pub fn duplicate_draft(session: &Session, offset: Duration) -> SessionDraft {
    let mut draft = SessionDraft::from_session(session);
    draft.title = format!("{}{COPY_SUFFIX}", session.title);
    draft.session_number += 1;
    draft.starts_at = session.starts_at + offset;
    draft.ends_at = session.ends_at + offset;
    draft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, session};

    #[test]
    fn test_transitions() {
        use SessionStatus::*;
        assert!(Scheduled.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Cancelled));
        assert!(Cancelled.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Scheduled));
        assert!(!Cancelled.can_transition_to(InProgress));
        assert!(check_transition(Completed, Cancelled).is_err());
    }

    #[test]
    fn test_duplicate_draft() {
        let mut s = session("s1", "alice", at(1, 20, 0), at(1, 23, 0));
        s.session_number = 4;
        let d = duplicate_draft(&s, Duration::weeks(1));
        assert!(d.title.ends_with("(copy)"));
        assert_eq!(d.session_number, 5);
        assert_eq!(d.starts_at, at(8, 20, 0));
        assert_eq!(d.ends_at - d.starts_at, s.ends_at - s.starts_at);
    }
}
