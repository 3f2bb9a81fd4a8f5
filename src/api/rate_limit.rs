//! In-process token-bucket limiter in front of `/detect`.
//!
//! The detector owns its own HTTP surface, so unlike the upstream
//! ingestion service it is responsible for its own backpressure; a single
//! shared bucket is enough since the endpoint is meant to be hit by a
//! cron caller, not a fleet of clients.

use std::time::Instant;

use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use super::super::app::AppState;

pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<(f64, Instant)>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(per_minute: u32) -> Self {
        let capacity = f64::from(per_minute.max(1));
        Self {
            capacity,
            refill_per_sec: capacity / 60.0,
            state: Mutex::new((capacity, Instant::now())),
        }
    }

    async fn try_acquire(&self) -> bool {
        let mut guard = self.state.lock().await;
        let (tokens, last) = &mut *guard;
        let now = Instant::now();
        let elapsed = now.duration_since(*last).as_secs_f64();
        *tokens = (*tokens + elapsed * self.refill_per_sec).min(self.capacity);
        *last = now;

        if *tokens >= 1.0 {
            *tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub(crate) async fn enforce(State(state): State<AppState>, request: Request<axum::body::Body>, next: Next) -> Response {
    if state.rate_limiter().try_acquire().await {
        next.run(request).await
    } else {
        (StatusCode::TOO_MANY_REQUESTS, "detect rate limit exceeded").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_burst_up_to_capacity() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.try_acquire().await);
        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
    }
}
