mod error;
mod routes;

use axum::{
    Router,
    extract::FromRef,
    routing::{delete, get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use anyhow::Context;
use jdrtables_api::service::Scheduler;
use jdrtables_runtime_config::{AppConfig, CONFIG_FILE_NAME, StorageBackend};
use jdrtables_store::Backend;

const DEFAULT_LOG_FILTER: &str =
    "jdrtables_server=info,jdrtables_api=info,jdrtables_store=info,tower_http=info";

/// The scheduling service as shared by every handler.
pub type Svc = Arc<Scheduler<Backend>>;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Svc,
}

impl FromRef<AppState> for Svc {
    fn from_ref(state: &AppState) -> Self {
        state.scheduler.clone()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Read `jdrtables.toml` (or `$JDRTABLES_CONFIG`) and apply environment
/// overrides on top. A missing file yields the defaults.
fn load_config() -> anyhow::Result<AppConfig> {
    let path = env_var("JDRTABLES_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));

    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = AppConfig::from_toml_str(&raw)
            .with_context(|| format!("parsing {}", path.display()))?;
        tracing::info!("loaded config from {}", path.display());
        config
    } else {
        AppConfig::default()
    };

    if let Some(dir) = env_var("JDRTABLES_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(raw) = env_var("JDRTABLES_BACKEND") {
        config.storage.backend = StorageBackend::parse(&raw)
            .with_context(|| format!("unknown JDRTABLES_BACKEND: {raw}"))?;
    }
    if let Some(raw) = env_var("PORT") {
        config.server.port = raw
            .parse()
            .with_context(|| format!("invalid PORT: {raw}"))?;
    }
    if let Some(url) = env_var("BASE_URL") {
        config.server.base_url = Some(url);
    }
    Ok(config)
}

fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        .route(
            "/trigger-warnings",
            get(routes::health::trigger_warnings),
        )
        .route("/config/game-types", get(routes::health::game_types))
        .route(
            "/config/session-statuses",
            get(routes::health::session_statuses),
        )
        // Campaigns
        .route(
            "/campaigns",
            get(routes::campaigns::list_campaigns).post(routes::campaigns::create_campaign),
        )
        .route(
            "/campaigns/{id}",
            get(routes::campaigns::get_campaign)
                .put(routes::campaigns::update_campaign)
                .delete(routes::campaigns::delete_campaign),
        )
        // Sessions
        .route(
            "/sessions",
            get(routes::sessions::list_sessions).post(routes::sessions::create_session),
        )
        .route(
            "/sessions/available",
            get(routes::sessions::list_available),
        )
        .route("/sessions/deleted", get(routes::sessions::list_deleted))
        .route(
            "/sessions/{id}",
            get(routes::sessions::get_session)
                .put(routes::sessions::update_session)
                .delete(routes::sessions::delete_session),
        )
        .route(
            "/sessions/{id}/restore",
            post(routes::sessions::restore_session),
        )
        .route(
            "/sessions/{id}/permanent",
            delete(routes::sessions::permanent_delete),
        )
        .route(
            "/sessions/{id}/duplicate",
            post(routes::sessions::duplicate_session),
        )
        .route("/archives/sweep", post(routes::sessions::archive_sweep))
        // Registrations
        .route("/sessions/{id}/join", post(routes::registrations::join))
        .route("/sessions/{id}/leave", post(routes::registrations::leave))
        .route(
            "/sessions/{id}/registrations",
            get(routes::registrations::list_registrations)
                .post(routes::registrations::register_player),
        )
        .route(
            "/sessions/{id}/registrations/{player_id}",
            delete(routes::registrations::remove_player),
        )
        .route(
            "/players/{id}/registrations",
            get(routes::registrations::player_registrations),
        )
        // Invitations
        .route(
            "/invitations",
            get(routes::invitations::list_invitations).post(routes::invitations::invite),
        )
        .route(
            "/invitations/{id}/accept",
            post(routes::invitations::accept_invitation),
        )
        .route(
            "/invitations/{id}/decline",
            post(routes::invitations::decline_invitation),
        )
        // Schedule checks
        .route(
            "/validate/dm-schedule",
            post(routes::validate::dm_schedule),
        )
        .route(
            "/validate/player-schedule",
            post(routes::validate::player_schedule),
        )
        // Audit
        .route("/events", get(routes::events::list_events));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = load_config()?;
    tracing::info!("data directory: {}", config.storage.data_dir.display());
    std::fs::create_dir_all(&config.storage.data_dir)
        .with_context(|| format!("creating {}", config.storage.data_dir.display()))?;

    let backend = Backend::open(&config.storage, config.scheduling.legacy_session_hours)?;
    let scheduler = Scheduler::with_store_audit(
        Arc::new(backend),
        config.scheduling.clone(),
        config.audit.enabled,
    );
    if !config.audit.enabled {
        tracing::warn!("audit persistence disabled; events only go to the log");
    }

    let state = AppState {
        scheduler: Arc::new(scheduler),
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let base_url = config
        .server
        .base_url
        .clone()
        .unwrap_or_else(|| format!("http://{addr}"));
    tracing::info!("starting server at {base_url}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds_with_all_routes() {
        let _ = build_router(routes::testing::state());
    }
}
