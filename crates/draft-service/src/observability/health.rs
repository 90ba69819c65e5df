//! Probe endpoints for the draft service.
//!
//! - `GET /health` answers 200 while the process is up.
//! - `GET /ready` answers 200 only while the room repository is connected
//!   and the service is not draining.
//!
//! `/metrics` is merged onto the same router in `main.rs`.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Flags consulted by the probe handlers.
#[derive(Debug)]
pub struct HealthState {
    live: AtomicBool,
    storage_connected: AtomicBool,
    draining: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Live, storage not yet connected, not draining.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(true),
            storage_connected: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    pub fn set_storage_connected(&self, connected: bool) {
        self.storage_connected.store(connected, Ordering::SeqCst);
    }

    /// Stop advertising readiness. Irreversible for the life of the process.
    pub fn begin_draining(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.storage_connected.load(Ordering::SeqCst) && !self.is_draining()
    }
}

/// Router serving `/health` and `/ready`.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

fn probe_status(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    probe_status(state.is_live())
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    probe_status(state.is_ready())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn probe(state: &Arc<HealthState>, uri: &str) -> StatusCode {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");
        health_router(Arc::clone(state))
            .oneshot(request)
            .await
            .expect("Failed to execute request")
            .status()
    }

    #[test]
    fn test_new_state_is_live_but_not_ready() {
        let state = HealthState::new();
        assert!(state.is_live());
        assert!(!state.is_ready());
        assert!(!state.is_draining());
    }

    #[test]
    fn test_ready_requires_storage_and_not_draining() {
        let state = HealthState::new();
        state.set_storage_connected(true);
        assert!(state.is_ready());

        state.set_storage_connected(false);
        assert!(!state.is_ready(), "lost storage must clear readiness");

        state.set_storage_connected(true);
        state.begin_draining();
        assert!(!state.is_ready(), "draining must clear readiness");
        assert!(state.is_live(), "draining does not affect liveness");
    }

    #[tokio::test]
    async fn test_health_endpoint_tracks_liveness() {
        let state = Arc::new(HealthState::new());
        assert_eq!(probe(&state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_follows_state_transitions() {
        let state = Arc::new(HealthState::new());
        assert_eq!(
            probe(&state, "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.set_storage_connected(true);
        assert_eq!(probe(&state, "/ready").await, StatusCode::OK);

        state.begin_draining();
        assert_eq!(
            probe(&state, "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let state = Arc::new(HealthState::new());
        assert_eq!(probe(&state, "/rooms").await, StatusCode::NOT_FOUND);
    }
}
