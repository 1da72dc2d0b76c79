use axum::{
    Json,
    extract::{Query, State},
};

use jdrtables_api::{EventLog, EventQuery};

use crate::Svc;
use crate::error::ApiErr;
use crate::routes::auth::AuthUser;

/// GET /api/events — audit log, admins only, newest first.
pub async fn list_events(
    State(svc): State<Svc>,
    AuthUser(actor): AuthUser,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EventLog>>, ApiErr> {
    Ok(Json(svc.list_events(&actor, &query)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{auth::AuthUser, testing};
    use axum::http::StatusCode;
    use jdrtables_api::{Actor, CreateCampaignRequest};

    #[tokio::test]
    async fn admins_see_the_log() {
        let state = testing::state();
        state
            .scheduler
            .create_campaign(
                &Actor::game_master("alice"),
                CreateCampaignRequest {
                    name: "Pathfinder".into(),
                    description: String::new(),
                    system: String::new(),
                    trigger_warnings: Vec::new(),
                },
            )
            .unwrap();

        let err = list_events(
            State(state.scheduler.clone()),
            testing::gm("alice"),
            Query(EventQuery::default()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let Json(events) = list_events(
            State(state.scheduler.clone()),
            AuthUser(Actor::admin("root")),
            Query(EventQuery {
                event_type: Some("campaign_created".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user_id.as_deref(), Some("alice"));
    }
}
