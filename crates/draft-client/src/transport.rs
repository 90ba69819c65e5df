//! Websocket transport.
//!
//! [`connect`] opens the socket and spawns a bridge task that serializes
//! outgoing commands and parses incoming frames. The endpoint only ever sees
//! typed channels.

use crate::errors::ClientError;

use draft_core::protocol::{ClientCommand, ServerEvent};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn};

const TRANSPORT_CHANNEL_BUFFER: usize = 64;

/// Typed ends of a live connection.
pub struct Transport {
    pub commands: mpsc::Sender<ClientCommand>,
    pub events: mpsc::Receiver<ServerEvent>,
    /// Ends when the socket closes or every command sender is dropped.
    pub task: JoinHandle<()>,
}

/// Open the realtime channel at `url`.
///
/// # Errors
///
/// `Transport` if the websocket handshake fails.
#[instrument(skip_all, fields(url = %url))]
pub async fn connect(url: &str) -> Result<Transport, ClientError> {
    let (socket, _response) = connect_async(url).await?;
    info!(target: "draft.client.transport", "Connected");

    let (mut sink, mut stream) = socket.split();
    let (command_tx, mut command_rx) = mpsc::channel::<ClientCommand>(TRANSPORT_CHANNEL_BUFFER);
    let (event_tx, event_rx) = mpsc::channel::<ServerEvent>(TRANSPORT_CHANNEL_BUFFER);

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                command = command_rx.recv() => {
                    let Some(command) = command else {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    };
                    let text = match command.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(
                                target: "draft.client.transport",
                                command_type = command.command_type(),
                                error = %e,
                                "Failed to encode command"
                            );
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        debug!(target: "draft.client.transport", error = %e, "Socket write failed");
                        break;
                    }
                }

                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => match ServerEvent::parse(&text) {
                        Ok(event) => {
                            if event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            debug!(
                                target: "draft.client.transport",
                                error = %e,
                                "Ignoring unparseable frame"
                            );
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        info!(target: "draft.client.transport", frame = ?frame, "Server closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(target: "draft.client.transport", error = %e, "Socket read failed");
                        break;
                    }
                    None => break,
                }
            }
        }
        debug!(target: "draft.client.transport", "Transport stopped");
    });

    Ok(Transport {
        commands: command_tx,
        events: event_rx,
        task,
    })
}
