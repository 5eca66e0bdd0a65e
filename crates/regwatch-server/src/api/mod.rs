//! HTTP trigger for the daily job
//!
//! | Route             | Effect                                      |
//! |-------------------|---------------------------------------------|
//! | `GET /healthz`    | liveness, no auth                           |
//! | `POST /run/daily` | run and wait; report in the response        |
//! | `GET /run/daily`  | start in the background and return at once  |
//!
//! Run routes need the cron secret as `?key=` or an `X-Cron-Key` header.

pub mod response;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use regwatch_ingest::job::DailyJob;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use crate::config::{AuthConfig, Config};
use crate::error::{AppError, AppResult};
use crate::middleware;
use crate::runner::JobRunner;
use response::{HealthResponse, RunResponse, StartedResponse};

/// Header carrying the cron secret
pub const CRON_KEY_HEADER: &str = "x-cron-key";

#[derive(Clone)]
pub struct AppState {
    pub runner: JobRunner,
    pub auth: AuthConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let runner = JobRunner::new(DailyJob::new(config.job.clone()));
    let state = AppState {
        runner: runner.clone(),
        auth: config.auth.clone(),
    };
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    if runner.is_running() {
        info!("Waiting up to {} seconds for the active run", timeout.as_secs());
        if !runner.wait_idle(timeout).await {
            warn!("Active run did not finish before shutdown; its checkpoint is not saved");
        }
    }

    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/run/daily", get(run_daily_background).post(run_daily))
        .with_state(state)
        .layer(middleware::tracing_layer())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Run the job and answer with its report
async fn run_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
) -> AppResult<Json<RunResponse>> {
    authorize(&state.auth, &headers, &query)?;
    let report = state.runner.run_now().await?;
    Ok(Json(report.into()))
}

/// Start the job without waiting for it
async fn run_daily_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
) -> AppResult<Json<StartedResponse>> {
    authorize(&state.auth, &headers, &query)?;
    state.runner.spawn_background()?;
    Ok(Json(StartedResponse::new()))
}

/// The query parameter wins over the header when both are present.
fn authorize(auth: &AuthConfig, headers: &HeaderMap, query: &KeyQuery) -> AppResult<()> {
    let presented = query.key.as_deref().filter(|k| !k.is_empty()).or_else(|| {
        headers
            .get(CRON_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
    });

    if auth.accepts(presented) {
        Ok(())
    } else {
        warn!("Rejected unauthorized run trigger");
        Err(AppError::Unauthorized)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
