pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod detect;
pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod rate_limit;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    let detect_routes = Router::new()
        .route("/detect", post(detect::run))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit::enforce))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_cron_or_admin));

    let admin_routes = Router::new()
        .route("/admin/jobs/retry", post(admin::retry_jobs))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .merge(detect_routes)
        .merge(admin_routes)
        .with_state(state)
}
