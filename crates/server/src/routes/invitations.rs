use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use jdrtables_api::{Invitation, InviteRequest};

use crate::Svc;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

/// POST /api/invitations — invite a player to a campaign or a session.
pub async fn invite(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Json(req): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Invitation>), ApiErr> {
    let invitation = svc.invite(&actor, req)?;
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// GET /api/invitations — invitations addressed to the caller.
pub async fn list_invitations(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
) -> Result<Json<Vec<Invitation>>, ApiErr> {
    Ok(Json(svc.list_my_invitations(&actor)?))
}

pub async fn accept_invitation(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Invitation>, ApiErr> {
    Ok(Json(svc.respond(&actor, &id, true)?))
}

pub async fn decline_invitation(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Invitation>, ApiErr> {
    Ok(Json(svc.respond(&actor, &id, false)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing;
    use jdrtables_api::{Actor, CreateCampaignRequest, InvitationStatus};

    #[tokio::test]
    async fn decline_then_cannot_accept() {
        let state = testing::state();
        let svc = || State(state.scheduler.clone());
        let campaign = state
            .scheduler
            .create_campaign(
                &Actor::game_master("alice"),
                CreateCampaignRequest {
                    name: "Delta Green".into(),
                    description: String::new(),
                    system: String::new(),
                    trigger_warnings: Vec::new(),
                },
            )
            .unwrap();

        let (status, Json(inv)) = invite(
            svc(),
            testing::gm("alice"),
            Json(InviteRequest {
                campaign_id: Some(campaign.id),
                session_id: None,
                invited_player: "bob".into(),
                message: "Agent needed".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(mine) = list_invitations(svc(), testing::player("bob")).await.unwrap();
        assert_eq!(mine.len(), 1);

        let Json(declined) = decline_invitation(svc(), testing::player("bob"), Path(inv.id.clone()))
            .await
            .unwrap();
        assert_eq!(declined.status, InvitationStatus::Declined);

        let err = accept_invitation(svc(), testing::player("bob"), Path(inv.id))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invitation_without_target_is_400() {
        let err = invite(
            testing::svc(),
            testing::gm("alice"),
            Json(InviteRequest {
                campaign_id: None,
                session_id: None,
                invited_player: "bob".into(),
                message: String::new(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
