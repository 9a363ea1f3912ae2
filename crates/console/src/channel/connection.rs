//! Shared chat channel connection
//!
//! One WebSocket connection is opened per console process and shared by every
//! channel session. Outbound events are queued to a writer task; inbound frames
//! are decoded by a reader task and handed to the console's event loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{stream::StreamExt, SinkExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

use super::events::{ClientEvent, ServerEvent};
use super::ChannelError;

/// Outbound side of the shared channel
///
/// Emits are fire-and-forget: `Ok` means the event was queued, not acknowledged.
pub trait ChannelTransport: Send + Sync {
    fn emit(&self, event: ClientEvent) -> Result<(), ChannelError>;
}

/// The process-wide WebSocket connection to the chat channel
#[derive(Debug)]
pub struct ChannelConnection {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Queue feeding the writer task
    sender: mpsc::UnboundedSender<ClientEvent>,

    /// Set once either side of the socket has gone away
    closed: Arc<AtomicBool>,
}

impl ChannelConnection {
    /// Wrap an outbound queue
    pub fn new(sender: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Connect to the channel at `url`
    ///
    /// Returns the connection and the stream of decoded inbound events. The
    /// stream ends when the socket closes, and every emit after that fails
    /// with `ChannelError::Closed`.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), ChannelError> {
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        let (mut sink, mut stream) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerEvent>();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let conn = Self::new(out_tx);
        let session_id = conn.session_id;
        let writer_closed = conn.closed.clone();
        let reader_closed = conn.closed.clone();

        tracing::info!(session_id = %session_id, url = %url, "Chat channel connected");

        // Spawn task to write queued events to the socket
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    event = out_rx.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                    // Reader finished: the socket is gone
                    _ = &mut shutdown_rx => break,
                };

                match serde_json::to_string(&event) {
                    Ok(json) => {
                        if let Err(e) = sink.send(Message::Text(json)).await {
                            tracing::warn!(
                                session_id = %session_id,
                                error = %e,
                                "Failed to write channel event"
                            );
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Failed to serialize channel event");
                    }
                }
            }
            writer_closed.store(true, Ordering::SeqCst);
            out_rx.close();
            let _ = sink.close().await;
        });

        // Spawn task to decode inbound frames
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if in_tx.send(event).is_err() {
                                break; // Console shut down
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = ?e,
                                message = %text,
                                "Failed to parse channel event"
                            );
                        }
                    },
                    Ok(Message::Close(_)) => {
                        tracing::info!(session_id = %session_id, "Channel close frame received");
                        break;
                    }
                    Ok(_) => {} // Ping/pong handled by tungstenite, binary ignored
                    Err(e) => {
                        tracing::warn!(session_id = %session_id, error = %e, "Channel read error");
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            drop(shutdown_tx);
            tracing::info!(session_id = %session_id, "Chat channel disconnected");
        });

        Ok((conn, in_rx))
    }
}

impl ChannelTransport for ChannelConnection {
    fn emit(&self, event: ClientEvent) -> Result<(), ChannelError> {
        if self.is_closed() {
            return Err(ChannelError::Closed);
        }
        self.sender.send(event).map_err(|_| ChannelError::Closed)
    }
}
