use axum::{Json, extract::State};

use jdrtables_api::{
    DmScheduleRequest, PlayerScheduleRequest, ScheduleCheckResponse, ScheduleSubject,
};

use crate::Svc;
use crate::error::ApiErr;

/// POST /api/validate/dm-schedule — would this slot clash with the GM's
/// other sessions? Nothing is written.
pub async fn dm_schedule(
    State(svc): State<Svc>,
    Json(req): Json<DmScheduleRequest>,
) -> Result<Json<ScheduleCheckResponse>, ApiErr> {
    Ok(Json(svc.check_schedule(
        ScheduleSubject::GameMaster,
        &req.dm_id,
        req.starts_at,
        req.ends_at,
        req.exclude_session_id.as_deref(),
    )?))
}

/// POST /api/validate/player-schedule — same check against the sessions a
/// player holds a confirmed seat in.
pub async fn player_schedule(
    State(svc): State<Svc>,
    Json(req): Json<PlayerScheduleRequest>,
) -> Result<Json<ScheduleCheckResponse>, ApiErr> {
    Ok(Json(svc.check_schedule(
        ScheduleSubject::Player,
        &req.player_id,
        req.starts_at,
        req.ends_at,
        req.exclude_session_id.as_deref(),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing;
    use axum::http::StatusCode;
    use jdrtables_api::{Actor, CreateSessionRequest, GameType};
    use jdrtables_core::testing::at;

    fn seeded() -> (Svc, String) {
        let state = testing::state();
        let svc = state.scheduler;
        let view = svc
            .create_session(
                &Actor::game_master("alice"),
                CreateSessionRequest {
                    game_type: GameType::Oneshot,
                    title: "Blades in the Dark".into(),
                    description: String::new(),
                    system: String::new(),
                    campaign_id: None,
                    session_number: None,
                    starts_at: at(2, 20, 0),
                    ends_at: Some(at(2, 23, 0)),
                    min_players: Some(1),
                    max_players: Some(4),
                    trigger_warnings: Vec::new(),
                    external_url: None,
                    preregistered_players: vec!["bob".into()],
                },
            )
            .unwrap();
        (svc, view.session.id)
    }

    #[tokio::test]
    async fn dm_check_finds_the_overlap_and_skips_the_edited_session() {
        let (svc, id) = seeded();
        let req = |exclude: Option<String>| DmScheduleRequest {
            dm_id: "alice".into(),
            starts_at: at(2, 22, 0),
            ends_at: at(3, 1, 0),
            exclude_session_id: exclude,
        };

        let Json(body) = dm_schedule(State(svc.clone()), Json(req(None)))
            .await
            .unwrap();
        assert!(body.has_conflict);
        assert_eq!(body.conflict_session.map(|s| s.id), Some(id.clone()));

        let Json(body) = dm_schedule(State(svc), Json(req(Some(id)))).await.unwrap();
        assert!(!body.has_conflict);
    }

    #[tokio::test]
    async fn player_check_uses_confirmed_seats() {
        let (svc, _) = seeded();
        let req = |player: &str| PlayerScheduleRequest {
            player_id: player.into(),
            starts_at: at(2, 21, 0),
            ends_at: at(2, 22, 0),
            exclude_session_id: None,
        };

        let Json(body) = player_schedule(State(svc.clone()), Json(req("bob")))
            .await
            .unwrap();
        assert!(body.has_conflict);
        let Json(body) = player_schedule(State(svc), Json(req("carol")))
            .await
            .unwrap();
        assert!(!body.has_conflict);
        assert!(body.conflict_session.is_none());
    }

    #[tokio::test]
    async fn empty_window_is_a_bad_request() {
        let (svc, _) = seeded();
        let err = player_schedule(
            State(svc),
            Json(PlayerScheduleRequest {
                player_id: "bob".into(),
                starts_at: at(2, 21, 0),
                ends_at: at(2, 20, 0),
                exclude_session_id: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
