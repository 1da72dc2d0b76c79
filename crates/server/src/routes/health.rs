use axum::{Json, extract::State};
use jdrtables_api::{GameType, HealthResponse, LookupEntry, SessionStatus, TriggerWarningInfo};
use jdrtables_core::trigger_warnings::CATALOGUE;
use jdrtables_store::EntityStore;

use crate::Svc;

/// GET /api/health — server liveness check.
pub async fn health(State(svc): State<Svc>) -> Json<HealthResponse> {
    // Cheap round trip so a broken store shows up here.
    let status = match svc.store().get_by_id::<jdrtables_api::Campaign>("-") {
        Ok(_) => "ok",
        Err(e) => {
            tracing::error!("health check: {e}");
            "degraded"
        }
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: svc.store().kind().as_str().to_string(),
    })
}

/// GET /api/trigger-warnings — the fixed content-warning catalogue.
pub async fn trigger_warnings() -> Json<Vec<TriggerWarningInfo>> {
    Json(CATALOGUE.iter().map(TriggerWarningInfo::from).collect())
}

/// GET /api/config/game-types
pub async fn game_types() -> Json<Vec<LookupEntry>> {
    Json(GameType::ALL.into_iter().map(LookupEntry::from).collect())
}

/// GET /api/config/session-statuses — in lifecycle order.
pub async fn session_statuses() -> Json<Vec<LookupEntry>> {
    Json(SessionStatus::ALL.into_iter().map(LookupEntry::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing;

    #[tokio::test]
    async fn health_reports_backend() {
        let Json(body) = health(testing::svc()).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.backend, "sqlite");
    }

    #[tokio::test]
    async fn catalogue_is_listed() {
        let Json(list) = trigger_warnings().await;
        assert_eq!(list.len(), CATALOGUE.len());
        assert!(list.iter().any(|w| w.id == "violence"));
    }

    #[tokio::test]
    async fn lookups_list_every_value() {
        let Json(types) = game_types().await;
        let ids: Vec<&str> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["campaign", "oneshot"]);
        assert_eq!(types[1].label, "One-shot");

        let Json(statuses) = session_statuses().await;
        let ids: Vec<&str> = statuses.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["scheduled", "in_progress", "completed", "cancelled"]);
    }
}
