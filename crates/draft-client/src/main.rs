//! Draft Bot
//!
//! Joins a room as one seat, readies up and lets the action timer resolve
//! every turn. Useful for exercising a deployment end to end or filling the
//! empty side of a practice draft.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Fetch the roster (refuses to continue without one)
//! 3. Connect to the room's realtime channel
//! 4. Run the endpoint until Ctrl+C or the server closes the connection

#![warn(clippy::pedantic)]

use common::observability::init_tracing;
use draft_client::config::BotConfig;
use draft_client::effects::TracingEffectSink;
use draft_client::roster::{load_roster, HttpRosterProvider};
use draft_client::transport::connect;
use draft_client::{DraftEndpoint, EndpointSettings};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BotConfig::from_env()?;

    init_tracing("draft=info", config.log_format)?;

    info!(
        room_code = %config.room_code,
        seat = %config.seat,
        server_url = %config.server_url,
        "Starting draft bot"
    );

    let provider = HttpRosterProvider::new(
        config.roster_api_url.clone(),
        config.roster_api_key.clone(),
    )?;
    let roster = load_roster(&provider).await.map_err(|e| {
        error!(error = %e, "Cannot run without a roster");
        e
    })?;

    let transport = connect(&config.ws_url()).await.map_err(|e| {
        error!(error = %e, "Failed to connect to draft service");
        e
    })?;

    let endpoint = DraftEndpoint::new(
        EndpointSettings {
            room_code: config.room_code.clone(),
            seat: config.seat,
            auto_ready: true,
        },
        roster,
        transport.commands,
        TracingEffectSink,
    );

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received");
                signal_token.cancel();
            }
            Err(e) => error!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });

    let result = endpoint.run(transport.events, cancel_token).await;
    transport.task.abort();

    match result {
        Ok(()) => {
            info!("Draft bot stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Draft bot stopped");
            Err(e.into())
        }
    }
}
