use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use jdrtables_api::{Campaign, CreateCampaignRequest, OkResponse, UpdateCampaignRequest};

use crate::Svc;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

/// GET /api/campaigns — newest first.
pub async fn list_campaigns(State(svc): State<Svc>) -> Result<Json<Vec<Campaign>>, ApiErr> {
    Ok(Json(svc.list_campaigns()?))
}

/// POST /api/campaigns — game masters only.
pub async fn create_campaign(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>), ApiErr> {
    let campaign = svc.create_campaign(&actor, req)?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

pub async fn get_campaign(
    State(svc): State<Svc>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiErr> {
    Ok(Json(svc.get_campaign(&id)?))
}

pub async fn update_campaign(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<Campaign>, ApiErr> {
    Ok(Json(svc.update_campaign(&actor, &id, req)?))
}

/// DELETE /api/campaigns/{id} — sessions that referenced it are kept.
pub async fn delete_campaign(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    svc.delete_campaign(&actor, &id)?;
    Ok(Json(OkResponse { ok: true }))
}
