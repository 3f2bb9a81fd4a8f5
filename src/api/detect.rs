//! `POST /detect`: runs one detection pass and reports counters.

use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::app::AppState;
use crate::detection::orchestrator::Orchestrator;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DetectRequest {
    #[serde(default)]
    window_hours: Option<u32>,
    #[serde(default)]
    article_cap: Option<usize>,
    #[serde(default)]
    aggregator_cap: Option<usize>,
    #[serde(default)]
    social_cap: Option<usize>,
}

#[derive(Debug, Serialize)]
struct DetectErrorResponse {
    error: String,
    phase: &'static str,
    duration_ms: u64,
}

pub(crate) async fn run(State(state): State<AppState>, Json(payload): Json<DetectRequest>) -> impl IntoResponse {
    let started = Instant::now();
    let config = state.config().with_overrides(
        payload.window_hours,
        payload.article_cap,
        payload.aggregator_cap,
        payload.social_cap,
    );

    let dao = state.dao();
    let embeddings = state.embeddings();
    let orchestrator = Orchestrator::new(dao.as_ref(), embeddings.as_deref(), &config, Some(state.telemetry().metrics()));

    match orchestrator.run().await {
        Ok(report) => {
            info!(
                topics_processed = report.topics_processed,
                events_upserted = report.events_upserted,
                trending_count = report.trending_count,
                breaking_count = report.breaking_count,
                duration_ms = report.duration_ms,
                "detection run completed"
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(error) => {
            let phase = error.phase().as_str();
            error!(%error, phase, "detection run aborted");
            let body = DetectErrorResponse {
                error: error.to_string(),
                phase,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}
