//! Auth enforcement for the detect/admin surface.
//!
//! Accepts either the shared cron secret (`X-Cron-Secret` header, used by
//! the external scheduler that triggers a run) or an admin bearer token
//! (`Authorization: Bearer <token>`, used by an operator). Either header
//! absent from `Config` disables that path; if neither is configured the
//! endpoint is open, a permissive default meant for local development only.

use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::super::app::AppState;

const CRON_SECRET_HEADER: &str = "x-cron-secret";

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let config = state.config();

    if let Some(expected) = config.cron_secret() {
        if headers.get(CRON_SECRET_HEADER).and_then(|v| v.to_str().ok()) == Some(expected) {
            return true;
        }
    }

    if let Some(expected) = config.admin_bearer_token() {
        if bearer_token(headers) == Some(expected) {
            return true;
        }
    }

    config.cron_secret().is_none() && config.admin_bearer_token().is_none()
}

pub(crate) async fn require_cron_or_admin(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if is_authorized(&state, request.headers()) {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

/// Stricter variant for the admin surface: the cron secret alone does not
/// authorize a retry, only the admin bearer token (or an unconfigured
/// deployment) does.
pub(crate) async fn require_admin(State(state): State<AppState>, request: Request<axum::body::Body>, next: Next) -> Response {
    let config = state.config();
    let authorized = match config.admin_bearer_token() {
        Some(expected) => bearer_token(request.headers()) == Some(expected),
        None => true,
    };

    if authorized {
        next.run(request).await
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}
