use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use jdrtables_api::{JoinRequest, RegisterPlayerRequest, Registration, SessionView};

use crate::Svc;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

/// POST /api/sessions/{id}/join — the caller takes a seat.
pub async fn join(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiErr> {
    let view = svc.join(&actor, &id, req.character_id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/sessions/{id}/leave — idempotent.
pub async fn leave(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiErr> {
    Ok(Json(svc.leave(&actor, &id)?))
}

pub async fn list_registrations(
    State(svc): State<Svc>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Registration>>, ApiErr> {
    Ok(Json(svc.list_registrations(&id)?))
}

/// POST /api/sessions/{id}/registrations — the GM seats a player.
pub async fn register_player(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RegisterPlayerRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiErr> {
    let view = svc.register_player(&actor, &id, &req.player_id, req.character_id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn remove_player(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path((id, player_id)): Path<(String, String)>,
) -> Result<Json<SessionView>, ApiErr> {
    Ok(Json(svc.remove_player(&actor, &id, &player_id)?))
}

/// GET /api/players/{id}/registrations
pub async fn player_registrations(
    State(svc): State<Svc>,
    Path(player_id): Path<String>,
) -> Result<Json<Vec<Registration>>, ApiErr> {
    Ok(Json(svc.list_player_registrations(&player_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing;
    use jdrtables_api::{Actor, CreateSessionRequest, GameType};
    use jdrtables_core::testing::at;

    #[tokio::test]
    async fn full_session_is_409_and_leave_frees_the_seat() {
        let state = testing::state();
        let svc = || State(state.scheduler.clone());
        let session = state
            .scheduler
            .create_session(
                &Actor::game_master("alice"),
                CreateSessionRequest {
                    game_type: GameType::Oneshot,
                    title: "Tiny table".into(),
                    description: String::new(),
                    system: String::new(),
                    campaign_id: None,
                    session_number: None,
                    starts_at: at(2, 20, 0),
                    ends_at: Some(at(2, 22, 0)),
                    min_players: Some(1),
                    max_players: Some(1),
                    trigger_warnings: Vec::new(),
                    external_url: None,
                    preregistered_players: Vec::new(),
                },
            )
            .unwrap();
        let id = session.session.id;

        let (status, Json(view)) = join(
            svc(),
            testing::player("bob"),
            Path(id.clone()),
            Json(JoinRequest::default()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(view.available_slots, 0);

        let err = join(
            svc(),
            testing::player("carol"),
            Path(id.clone()),
            Json(JoinRequest::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        leave(svc(), testing::player("bob"), Path(id.clone()))
            .await
            .unwrap();
        let Json(regs) = list_registrations(svc(), Path(id.clone())).await.unwrap();
        assert!(regs.is_empty());

        let (_, Json(view)) = register_player(
            svc(),
            testing::gm("alice"),
            Path(id.clone()),
            Json(RegisterPlayerRequest {
                player_id: "carol".into(),
                character_id: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(view.players, ["carol"]);

        let Json(mine) = player_registrations(svc(), Path("carol".into()))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }
}
