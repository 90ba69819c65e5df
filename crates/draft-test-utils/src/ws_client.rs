//! Websocket test client speaking the draft wire protocol.

use draft_core::protocol::{ClientCommand, ServerEvent};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long `next_event` waits before failing the test.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the server sent when it ended the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closed {
    Frame { code: u16, reason: String },
    WithoutFrame,
}

pub struct TestWsClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestWsClient {
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;
        Ok(Self { socket })
    }

    pub async fn send(&mut self, command: &ClientCommand) -> Result<(), anyhow::Error> {
        self.socket.send(Message::Text(command.to_json()?)).await?;
        Ok(())
    }

    /// Send a raw text frame, e.g. malformed input.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.socket.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Next server event, skipping pings. Fails on close or timeout.
    pub async fn next_event(&mut self) -> Result<ServerEvent, anyhow::Error> {
        loop {
            let frame = tokio::time::timeout(EVENT_TIMEOUT, self.socket.next())
                .await
                .map_err(|_| anyhow::anyhow!("Timed out waiting for server event"))?;
            match frame {
                Some(Ok(Message::Text(text))) => return Ok(ServerEvent::parse(&text)?),
                Some(Ok(Message::Close(frame))) => {
                    anyhow::bail!("Socket closed while waiting for event: {:?}", frame)
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => anyhow::bail!("Socket error: {}", e),
                None => anyhow::bail!("Socket ended while waiting for event"),
            }
        }
    }

    /// Skip events until one of the given wire type arrives.
    pub async fn next_of_type(&mut self, event_type: &str) -> Result<ServerEvent, anyhow::Error> {
        loop {
            let event = self.next_event().await?;
            if event.event_type() == event_type {
                return Ok(event);
            }
        }
    }

    /// Drain events until the server closes the socket.
    pub async fn expect_close(&mut self) -> Result<Closed, anyhow::Error> {
        loop {
            let frame = tokio::time::timeout(EVENT_TIMEOUT, self.socket.next())
                .await
                .map_err(|_| anyhow::anyhow!("Timed out waiting for close"))?;
            match frame {
                Some(Ok(Message::Close(Some(CloseFrame { code, reason })))) => {
                    return Ok(Closed::Frame {
                        code: code.into(),
                        reason: reason.into_owned(),
                    })
                }
                Some(Ok(Message::Close(None))) | None | Some(Err(_)) => {
                    return Ok(Closed::WithoutFrame)
                }
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Close from the client side.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.socket.close(None).await?;
        Ok(())
    }
}
