use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use jdrtables_api::{
    ArchiveSweepResponse, CreateSessionRequest, OkResponse, SessionListResponse, SessionView,
    UpdateSessionRequest,
};

use crate::Svc;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/sessions — upcoming sessions and the archive, deleted excluded.
pub async fn list_sessions(State(svc): State<Svc>) -> Result<Json<SessionListResponse>, ApiErr> {
    Ok(Json(svc.list_sessions(Utc::now())?))
}

/// GET /api/sessions/available — scheduled sessions with a free seat.
pub async fn list_available(State(svc): State<Svc>) -> Result<Json<Vec<SessionView>>, ApiErr> {
    Ok(Json(svc.list_available(Utc::now())?))
}

/// GET /api/sessions/deleted — the trash. Non-admins only see their own.
pub async fn list_deleted(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<SessionView>>, ApiErr> {
    let mut deleted = svc.list_deleted()?;
    deleted.retain(|v| actor.can_manage(&v.session.dm_id));
    Ok(Json(deleted))
}

pub async fn get_session(
    State(svc): State<Svc>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiErr> {
    Ok(Json(svc.get_session(&id)?))
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// POST /api/sessions — game masters only; the caller becomes the GM.
pub async fn create_session(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiErr> {
    let view = svc.create_session(&actor, req)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_session(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateSessionRequest>,
) -> Result<Json<SessionView>, ApiErr> {
    Ok(Json(svc.update_session(&actor, &id, req)?))
}

/// DELETE /api/sessions/{id} — soft delete, reversible via restore.
pub async fn delete_session(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    svc.soft_delete(&actor, &id)?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn restore_session(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, ApiErr> {
    Ok(Json(svc.restore(&actor, &id)?))
}

/// DELETE /api/sessions/{id}/permanent — only after a soft delete.
pub async fn permanent_delete(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    svc.permanent_delete(&actor, &id)?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn duplicate_session(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SessionView>), ApiErr> {
    let copy = svc.duplicate(&actor, &id)?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// POST /api/archives/sweep — mark every ended session `completed`.
pub async fn archive_sweep(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
) -> Result<Json<ArchiveSweepResponse>, ApiErr> {
    let archived_count = svc.archive_sweep(&actor, Utc::now())?;
    Ok(Json(ArchiveSweepResponse { archived_count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing;
    use jdrtables_api::GameType;
    use jdrtables_core::testing::at;

    fn request(title: &str, day: i64) -> Json<CreateSessionRequest> {
        Json(CreateSessionRequest {
            game_type: GameType::Oneshot,
            title: title.into(),
            description: String::new(),
            system: "Mörk Borg".into(),
            campaign_id: None,
            session_number: None,
            starts_at: at(day, 20, 0),
            ends_at: Some(at(day, 23, 0)),
            min_players: None,
            max_players: None,
            trigger_warnings: Vec::new(),
            external_url: None,
            preregistered_players: Vec::new(),
        })
    }

    #[tokio::test]
    async fn overlapping_session_is_409() {
        let state = testing::state();
        let (status, _) = create_session(
            State(state.scheduler.clone()),
            testing::gm("alice"),
            request("First", 2),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let err = create_session(
            State(state.scheduler.clone()),
            testing::gm("alice"),
            request("Second", 2),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn deleted_sessions_are_scoped_to_their_gm() {
        let state = testing::state();
        let svc = || State(state.scheduler.clone());
        let (_, Json(view)) = create_session(svc(), testing::gm("alice"), request("Gone", 2))
            .await
            .unwrap();
        delete_session(svc(), testing::gm("alice"), Path(view.session.id.clone()))
            .await
            .unwrap();

        let Json(mine) = list_deleted(svc(), testing::gm("alice")).await.unwrap();
        assert_eq!(mine.len(), 1);
        let Json(theirs) = list_deleted(svc(), testing::gm("zoe")).await.unwrap();
        assert!(theirs.is_empty());

        let err = get_session(svc(), Path(view.session.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);

        let Json(restored) = restore_session(svc(), testing::gm("alice"), Path(view.session.id))
            .await
            .unwrap();
        assert!(restored.session.deleted_at.is_none());
    }

    #[tokio::test]
    async fn sweep_requires_game_master() {
        let err = archive_sweep(testing::svc(), testing::player("bob"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        let Json(res) = archive_sweep(testing::svc(), testing::gm("alice"))
            .await
            .unwrap();
        assert_eq!(res.archived_count, 0);
    }
}
