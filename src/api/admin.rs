//! `POST /admin/jobs/retry`: re-run the most recent detection window
//! on demand, for an operator recovering from a failed/skipped cron
//! invocation.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::{error, info};

use crate::app::AppState;
use crate::detection::orchestrator::Orchestrator;

pub(crate) async fn retry_jobs(State(state): State<AppState>) -> impl IntoResponse {
    state.telemetry().record_admin_retry_invocation();

    let config = state.config().clone();
    let dao = state.dao();
    let embeddings = state.embeddings();
    let orchestrator = Orchestrator::new(dao.as_ref(), embeddings.as_deref(), &config, Some(state.telemetry().metrics()));

    match orchestrator.run().await {
        Ok(report) => {
            info!(events_upserted = report.events_upserted, "admin-triggered detection run completed");
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(error) => {
            error!(%error, "admin-triggered detection run failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()).into_response()
        }
    }
}
