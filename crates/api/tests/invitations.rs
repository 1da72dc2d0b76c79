use std::sync::Arc;

use jdrtables_api::service::Scheduler;
use jdrtables_api::{
    Actor, CreateCampaignRequest, CreateSessionRequest, GameType, InvitationStatus, InviteRequest,
    ServiceError,
};
use jdrtables_core::testing::at;
use jdrtables_runtime_config::SchedulingSettings;
use jdrtables_store::SqliteStore;

fn scheduler() -> Scheduler<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    Scheduler::with_store_audit(store, SchedulingSettings::default(), true)
}

fn session(svc: &Scheduler<SqliteStore>, gm: &Actor, day: i64, max_players: i64) -> String {
    svc.create_session(
        gm,
        CreateSessionRequest {
            game_type: GameType::Oneshot,
            title: format!("Night {day}"),
            description: String::new(),
            system: String::new(),
            campaign_id: None,
            session_number: None,
            starts_at: at(day, 20, 0),
            ends_at: Some(at(day, 23, 0)),
            min_players: Some(1),
            max_players: Some(max_players),
            trigger_warnings: Vec::new(),
            external_url: None,
            preregistered_players: Vec::new(),
        },
    )
    .unwrap()
    .session
    .id
}

fn to_session(session_id: &str, player: &str) -> InviteRequest {
    InviteRequest {
        campaign_id: None,
        session_id: Some(session_id.to_string()),
        invited_player: player.to_string(),
        message: "Join us!".to_string(),
    }
}

#[test]
fn accepting_a_session_invitation_seats_the_player() {
    let svc = scheduler();
    let alice = Actor::game_master("alice");
    let id = session(&svc, &alice, 3, 4);

    let inv = svc.invite(&alice, to_session(&id, "bob")).unwrap();
    assert_eq!(inv.status, InvitationStatus::Pending);
    assert_eq!(svc.list_my_invitations(&Actor::player("bob")).unwrap().len(), 1);

    let accepted = svc.respond(&Actor::player("bob"), &inv.id, true).unwrap();
    assert_eq!(accepted.status, InvitationStatus::Accepted);
    assert!(accepted.responded_at.is_some());
    assert_eq!(svc.get_session(&id).unwrap().players, ["bob"]);

    assert!(matches!(
        svc.respond(&Actor::player("bob"), &inv.id, false),
        Err(ServiceError::InvalidState(_))
    ));
}

#[test]
fn accepting_a_full_session_still_accepts_the_invitation() {
    let svc = scheduler();
    let alice = Actor::game_master("alice");
    let id = session(&svc, &alice, 3, 1);
    svc.join(&Actor::player("carol"), &id, None).unwrap();

    let inv = svc.invite(&alice, to_session(&id, "bob")).unwrap();
    let accepted = svc.respond(&Actor::player("bob"), &inv.id, true).unwrap();
    assert_eq!(accepted.status, InvitationStatus::Accepted);
    assert_eq!(svc.get_session(&id).unwrap().players, ["carol"]);
}

#[test]
fn only_one_pending_invitation_per_target() {
    let svc = scheduler();
    let alice = Actor::game_master("alice");
    let id = session(&svc, &alice, 3, 4);

    let first = svc.invite(&alice, to_session(&id, "bob")).unwrap();
    assert!(matches!(
        svc.invite(&alice, to_session(&id, "bob")),
        Err(ServiceError::DuplicatePending(_))
    ));

    svc.respond(&Actor::player("bob"), &first.id, false).unwrap();
    svc.invite(&alice, to_session(&id, "bob")).unwrap();
}

#[test]
fn invitation_permissions() {
    let svc = scheduler();
    let alice = Actor::game_master("alice");
    let id = session(&svc, &alice, 3, 4);

    assert!(matches!(
        svc.invite(&Actor::game_master("zoe"), to_session(&id, "bob")),
        Err(ServiceError::Forbidden(_))
    ));
    assert!(matches!(
        svc.invite(&alice, to_session(&id, "alice")),
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        svc.invite(&alice, to_session("missing", "bob")),
        Err(ServiceError::NotFound(_))
    ));

    let inv = svc.invite(&alice, to_session(&id, "bob")).unwrap();
    assert!(matches!(
        svc.respond(&Actor::player("carol"), &inv.id, true),
        Err(ServiceError::Forbidden(_))
    ));
}

#[test]
fn campaign_invitation_does_not_register() {
    let svc = scheduler();
    let alice = Actor::game_master("alice");
    let campaign = svc
        .create_campaign(
            &alice,
            CreateCampaignRequest {
                name: "Blades in the Dark".into(),
                description: String::new(),
                system: String::new(),
                trigger_warnings: Vec::new(),
            },
        )
        .unwrap();

    let inv = svc
        .invite(
            &alice,
            InviteRequest {
                campaign_id: Some(campaign.id.clone()),
                session_id: None,
                invited_player: "bob".into(),
                message: String::new(),
            },
        )
        .unwrap();
    assert_eq!(inv.target.campaign_id(), Some(campaign.id.as_str()));

    svc.respond(&Actor::player("bob"), &inv.id, true).unwrap();
    assert!(svc.list_player_registrations("bob").unwrap().is_empty());
}
