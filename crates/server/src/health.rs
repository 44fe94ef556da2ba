use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use comrade_core::domain::service::HealthReport;
use comrade_core::{ApiResult, BackendApi};
use serde::Serialize;
use tracing::{error, info};

/// What `/health` needs from the backend: one probe call.
#[async_trait]
pub trait BackendProbe: Send + Sync {
    async fn probe(&self) -> ApiResult<HealthReport>;
}

pub struct ApiProbe(pub Arc<dyn BackendApi>);

#[async_trait]
impl BackendProbe for ApiProbe {
    async fn probe(&self) -> ApiResult<HealthReport> {
        self.0.health().await
    }
}

#[derive(Clone)]
pub struct HealthState {
    probe: Arc<dyn BackendProbe>,
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
    pub backend: HealthCheck,
    pub checked_at: String,
}

pub fn router(probe: Arc<dyn BackendProbe>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { probe })
}

pub async fn spawn(bind_address: &str, port: u16, probe: Arc<dyn BackendProbe>) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(probe)).await {
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
    let backend = backend_check(state.probe.as_ref()).await;
    let ready = backend.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "comrade-server runtime initialized".to_string(),
        },
        backend,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn backend_check(probe: &dyn BackendProbe) -> HealthCheck {
    match probe.probe().await {
        Ok(report) if report.is_healthy() => HealthCheck {
            status: "ready",
            detail: format!("backend reports `{}` (up {})", report.status, report.uptime),
        },
        Ok(report) => HealthCheck {
            status: "degraded",
            detail: format!("backend reports `{}`", report.status),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("backend probe failed: {error}") }
        }
    }
}
