//! Read-side enrichment: derived player counts and campaign names.
//!
//! Counters are computed from the registration rows handed in, never from a
//! stored field.

use std::collections::HashMap;

use jdrtables_core::archive::{self, Partition};
use jdrtables_core::{Campaign, GameType, Registration, Session};

use crate::SessionView;
use chrono::{DateTime, Utc};

/// Lookup tables shared by every view built from one snapshot of the store.
pub struct Snapshot<'a> {
    players: HashMap<&'a str, Vec<&'a str>>,
    campaign_names: HashMap<&'a str, &'a str>,
}

impl<'a> Snapshot<'a> {
    pub fn new(registrations: &'a [Registration], campaigns: &'a [Campaign]) -> Self {
        let mut players: HashMap<&str, Vec<&str>> = HashMap::new();
        for r in registrations.iter().filter(|r| r.is_confirmed()) {
            players
                .entry(r.session_id.as_str())
                .or_default()
                .push(r.player_id.as_str());
        }
        let campaign_names = campaigns
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();
        Self {
            players,
            campaign_names,
        }
    }

    pub fn confirmed_count(&self, session_id: &str) -> u32 {
        self.players
            .get(session_id)
            .map_or(0, |p| u32::try_from(p.len()).unwrap_or(u32::MAX))
    }

    pub fn view(&self, session: Session) -> SessionView {
        let players: Vec<String> = self
            .players
            .get(session.id.as_str())
            .map(|p| p.iter().map(|id| id.to_string()).collect())
            .unwrap_or_default();
        let current_players = u32::try_from(players.len()).unwrap_or(u32::MAX);
        let campaign_name = match session.game_type {
            GameType::Campaign => session
                .campaign_id
                .as_deref()
                .and_then(|id| self.campaign_names.get(id))
                .map(|name| name.to_string()),
            GameType::Oneshot => None,
        };
        SessionView {
            current_players,
            available_slots: session.max_players.saturating_sub(current_players),
            players,
            campaign_name,
            session,
        }
    }

    pub fn views(&self, sessions: Vec<Session>) -> Vec<SessionView> {
        sessions.into_iter().map(|s| self.view(s)).collect()
    }
}

/// Enrich and split sessions into active / archived / deleted.
pub fn partition_views(
    sessions: Vec<Session>,
    snapshot: &Snapshot<'_>,
    now: DateTime<Utc>,
) -> Partition<SessionView> {
    archive::partition(snapshot.views(sessions), now, |v| &v.session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jdrtables_core::RegistrationStatus;
    use jdrtables_core::testing::{at, campaign, registration, session};

    #[test]
    fn counts_only_confirmed_rows() {
        let mut s = session("s1", "gm", at(1, 20, 0), at(1, 23, 0));
        s.max_players = 2;
        let mut tentative = registration("s1", "carol");
        tentative.status = RegistrationStatus::Tentative;
        let regs = vec![
            registration("s1", "alice"),
            registration("s1", "bob"),
            tentative,
            registration("other", "dave"),
        ];
        let snapshot = Snapshot::new(&regs, &[]);
        let view = snapshot.view(s);
        assert_eq!(view.current_players, 2);
        assert_eq!(view.available_slots, 0);
        assert_eq!(view.players, ["alice", "bob"]);
    }

    #[test]
    fn available_slots_never_negative() {
        let mut s = session("s1", "gm", at(1, 20, 0), at(1, 23, 0));
        s.max_players = 1;
        let regs = vec![registration("s1", "alice"), registration("s1", "bob")];
        let view = Snapshot::new(&regs, &[]).view(s);
        assert_eq!(view.current_players, 2);
        assert_eq!(view.available_slots, 0);
    }

    #[test]
    fn campaign_name_resolved_or_dangling() {
        let campaigns = vec![campaign("c1", "gm", "Strahd")];
        let snapshot = Snapshot::new(&[], &campaigns);

        let mut linked = session("s1", "gm", at(1, 20, 0), at(1, 23, 0));
        linked.game_type = GameType::Campaign;
        linked.campaign_id = Some("c1".into());
        assert_eq!(snapshot.view(linked).campaign_name.as_deref(), Some("Strahd"));

        let mut dangling = session("s2", "gm", at(2, 20, 0), at(2, 23, 0));
        dangling.game_type = GameType::Campaign;
        dangling.campaign_id = Some("gone".into());
        let view = snapshot.view(dangling);
        assert_eq!(view.campaign_name, None);
        assert_eq!(view.session.campaign_id.as_deref(), Some("gone"));
    }

    #[test]
    fn view_serializes_flat() {
        let view = Snapshot::new(&[], &[]).view(session("s1", "gm", at(1, 20, 0), at(1, 23, 0)));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "s1");
        assert_eq!(json["current_players"], 0);
        assert_eq!(json["available_slots"], 5);
        assert!(json.get("session").is_none());
    }
}
