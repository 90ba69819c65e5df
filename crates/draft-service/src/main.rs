//! Draft Service
//!
//! Room state store and realtime hub for ban/pick drafts.
//!
//! # Servers
//!
//! - HTTP server for REST and websocket traffic (default: 0.0.0.0:8090)
//! - HTTP server for health and metrics (default: 0.0.0.0:8091)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing and the Prometheus metrics recorder
//! 3. Connect to Redis
//! 4. Initialize the actor system (`RoomControllerActorHandle`)
//! 5. Start the health server, then the application server
//! 6. Wait for shutdown signal, drain, flush rooms

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use common::observability::init_tracing;
use common::secret::ExposeSecret;
use draft_core::DraftEngine;
use draft_service::actors::{ActorMetrics, ControllerSettings, RoomControllerActorHandle};
use draft_service::config::Config;
use draft_service::observability::metrics::init_metrics_recorder;
use draft_service::observability::{health_router, HealthState};
use draft_service::repository::{RedisRoomRepository, RoomRepository};
use draft_service::routes::{build_routes, AppState};
use draft_service::store::SessionStore;
use tokio::signal;
use tracing::{error, info, warn};

/// Time given to room actors to flush and close sockets on shutdown.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Configuration comes first so the log format is known.
    let config = Config::from_env()?;

    init_tracing("draft_service=debug,tower_http=debug", config.log_format)?;

    info!("Starting Draft Service");
    info!(
        service_id = %config.service_id,
        bind_address = %config.bind_address,
        health_bind_address = %config.health_bind_address,
        max_rooms = config.max_rooms,
        persist_retry_interval_seconds = config.persist_retry_interval_seconds,
        room_idle_seconds = config.room_idle_seconds,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let health_state = Arc::new(HealthState::new());

    info!("Connecting to Redis...");
    let repository = RedisRoomRepository::new(config.redis_url.expose_secret())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to Redis");
            e
        })?;
    let repository: Arc<dyn RoomRepository> = Arc::new(repository);
    health_state.set_storage_connected(true);
    info!("Redis connection established");

    let actor_metrics = ActorMetrics::new();
    let controller = RoomControllerActorHandle::new(
        config.service_id.clone(),
        repository,
        Arc::new(DraftEngine::default()),
        ControllerSettings {
            max_rooms: config.max_rooms,
            persist_retry_interval: config.persist_retry_interval(),
            idle_release: config.room_idle_release(),
        },
        Arc::clone(&actor_metrics),
    );
    info!("Actor system initialized");

    // Servers stop when the controller's token is cancelled.
    let shutdown_token = controller.child_token();

    // Health server (liveness, readiness, /metrics)
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        format!("Invalid health bind address: {e}")
    })?;

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let health_app = health_router(Arc::clone(&health_state)).merge(metrics_router);

    // Bind listeners BEFORE spawning to fail fast on bind errors
    let health_listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind health server");
            format!("Failed to bind health server to {health_addr}: {e}")
        })?;

    let health_shutdown_token = shutdown_token.child_token();
    tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(health_listener, health_app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    // Application server (REST + websocket)
    let app_addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        format!("Invalid bind address: {e}")
    })?;

    let app_state = Arc::new(AppState {
        store: SessionStore::new(controller.clone()),
        metrics: actor_metrics,
    });
    let app = build_routes(app_state);

    let app_listener = tokio::net::TcpListener::bind(app_addr).await.map_err(|e| {
        error!(error = %e, addr = %app_addr, "Failed to bind application server");
        format!("Failed to bind application server to {app_addr}: {e}")
    })?;

    let app_shutdown_token = shutdown_token.child_token();
    let app_server = tokio::spawn(async move {
        info!(addr = %app_addr, "Application server starting");
        let server = axum::serve(app_listener, app).with_graceful_shutdown(async move {
            app_shutdown_token.cancelled().await;
            info!("Application server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Application server failed");
        }
    });

    info!("Draft Service running - press Ctrl+C to shutdown");
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Not ready immediately so the load balancer stops sending traffic
    health_state.begin_draining();

    // Rooms flush dirty state and close their sockets.
    if let Err(e) = controller.shutdown(SHUTDOWN_DEADLINE).await {
        warn!(error = %e, "Actor system shutdown error");
    }

    shutdown_token.cancel();

    if tokio::time::timeout(Duration::from_secs(5), app_server)
        .await
        .is_err()
    {
        warn!("Application server did not stop in time");
    }

    info!("Draft Service shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
