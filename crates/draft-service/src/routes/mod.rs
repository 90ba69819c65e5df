//! HTTP routes for the draft service.
//!
//! Defines the Axum router and application state.

use crate::actors::ActorMetrics;
use crate::handlers;
use crate::store::SessionStore;
use crate::ws;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: SessionStore,

    /// Shared with connection actors spawned by the websocket handler.
    pub metrics: Arc<ActorMetrics>,
}

/// Build the application routes.
///
/// - `POST|GET|DELETE /v1/rooms/{code}` - room lifecycle and state
/// - `GET /v1/rooms` - summaries, newest first
/// - `GET /v1/rooms/{code}/capacity` - seat availability
/// - `GET /v1/rooms/{code}/ws` - realtime channel
///
/// Only the REST routes get the trace and 30 second timeout layers; a
/// websocket must outlive any request timeout.
pub fn build_routes(state: Arc<AppState>) -> Router {
    let rest_routes = Router::new()
        .route("/v1/rooms", get(handlers::list_rooms))
        .route(
            "/v1/rooms/:code",
            post(handlers::create_room)
                .get(handlers::get_room)
                .delete(handlers::delete_room),
        )
        .route("/v1/rooms/:code/capacity", get(handlers::get_capacity))
        .with_state(Arc::clone(&state))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    let realtime_routes = Router::new()
        .route("/v1/rooms/:code/ws", get(ws::room_socket))
        .with_state(state);

    rest_routes.merge(realtime_routes)
}
