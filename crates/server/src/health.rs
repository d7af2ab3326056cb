use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use titledesk_core::config::AppConfig;
use titledesk_core::session::{FileStore, KeyValueStore, RoleStore};

#[derive(Clone)]
pub struct HealthState {
    pub config: Arc<AppConfig>,
    pub role_store: Arc<RoleStore<FileStore>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub analysis: HealthCheck,
    pub session_store: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let analysis = analysis_check(&state.config);
    let session_store = store_check(&state.role_store);
    let ready = analysis.status == "ready" && session_store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "titledesk-server runtime initialized".to_string(),
        },
        analysis,
        session_store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn analysis_check(config: &AppConfig) -> HealthCheck {
    if config.analysis_ready() {
        HealthCheck { status: "ready", detail: format!("model {} configured", config.analysis.model) }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "analysis API key is not configured; audit and smart lookup unavailable"
                .to_string(),
        }
    }
}

fn store_check(role_store: &RoleStore<FileStore>) -> HealthCheck {
    match role_store.store().get("health_probe") {
        Ok(_) => HealthCheck { status: "ready", detail: "session store readable".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("session store failed: {error}") }
        }
    }
}
