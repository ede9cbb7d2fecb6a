//! Per-connection read/echo loop
//!
//! One [`ConnectionHandler`] owns one upgraded socket for its whole life:
//! it reads frames strictly in order, decodes binary frames as envelopes,
//! echoes the original bytes back and records every outcome in the shared
//! [`Metrics`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{close_code, CloseFrame, Message};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::protocol::{Envelope, FrameKind};

/// Per-connection behaviour taken from the server configuration
#[derive(Debug, Clone, Default)]
pub struct HandlerSettings {
    pub idle_timeout: Option<Duration>,
    pub greeting: bool,
}

impl From<&ServerConfig> for HandlerSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout,
            greeting: config.greeting,
        }
    }
}

/// Why a connection loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The transport reported an error while waiting for a frame
    ReadFailed,
    /// The peer sent a close frame or the stream ended
    PeerClosed,
    /// No frame arrived within the idle timeout
    IdleTimeout,
    /// The server is shutting down
    Shutdown,
}

impl CloseReason {
    /// Read-side failures count as connection errors; handler-driven closes do not
    pub fn is_connection_error(self) -> bool {
        matches!(self, CloseReason::ReadFailed | CloseReason::PeerClosed)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::ReadFailed => "read failed",
            CloseReason::PeerClosed => "peer closed",
            CloseReason::IdleTimeout => "idle timeout",
            CloseReason::Shutdown => "server shutdown",
        };
        f.write_str(s)
    }
}

/// Keeps `active_connections` raised while alive.
///
/// Dropping it lowers the gauge exactly once, whichever way the loop exits.
struct ConnectionGuard {
    metrics: Arc<Metrics>,
}

impl ConnectionGuard {
    fn new(metrics: Arc<Metrics>) -> Self {
        metrics.connection_opened();
        Self { metrics }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.metrics.connection_closed();
    }
}

enum NextFrame<E> {
    Frame(Result<Message, E>),
    Ended,
    Idle,
    Shutdown,
}

/// Drives a single upgraded connection
pub struct ConnectionHandler {
    id: Uuid,
    metrics: Arc<Metrics>,
    settings: HandlerSettings,
    shutdown_rx: Option<watch::Receiver<bool>>,
}

impl ConnectionHandler {
    pub fn new(metrics: Arc<Metrics>, settings: HandlerSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            metrics,
            settings,
            shutdown_rx: None,
        }
    }

    /// Close the connection once the shutdown flag is raised.
    ///
    /// A flag that is already raised ends the loop before the first read.
    pub fn with_shutdown(mut self, shutdown_rx: watch::Receiver<bool>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the read/echo loop until the connection ends.
    ///
    /// Frames are handled one at a time: the echo for frame N is written
    /// before frame N+1 is read.
    #[instrument(name = "connection", skip_all, fields(connection_id = %self.id))]
    pub async fn run<S, E>(mut self, mut socket: S) -> CloseReason
    where
        S: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Unpin,
        E: fmt::Display,
    {
        let _guard = ConnectionGuard::new(Arc::clone(&self.metrics));
        let opened_at = Instant::now();
        info!("New WebSocket connection established");

        if self.settings.greeting {
            self.send_greeting(&mut socket).await;
        }

        let reason = loop {
            let message = match self.next_frame(&mut socket).await {
                NextFrame::Frame(Ok(message)) => message,
                NextFrame::Frame(Err(e)) => {
                    warn!(error = %e, "WebSocket read failed");
                    break CloseReason::ReadFailed;
                }
                NextFrame::Ended => {
                    debug!("WebSocket stream ended");
                    break CloseReason::PeerClosed;
                }
                NextFrame::Idle => break CloseReason::IdleTimeout,
                NextFrame::Shutdown => break CloseReason::Shutdown,
            };

            if let Message::Close(frame) = &message {
                debug!(close_frame = ?frame, "Peer sent close frame");
                break CloseReason::PeerClosed;
            }

            self.handle_frame(&mut socket, message).await;
        };

        if reason.is_connection_error() {
            self.metrics.record_connection_error();
        }
        self.close(&mut socket, reason).await;

        info!(
            reason = %reason,
            duration = ?opened_at.elapsed(),
            "WebSocket connection closed"
        );
        reason
    }

    /// Wait for the next inbound frame, the idle deadline or shutdown
    async fn next_frame<S, E>(&mut self, socket: &mut S) -> NextFrame<E>
    where
        S: Stream<Item = Result<Message, E>> + Unpin,
    {
        let idle_timeout = self.settings.idle_timeout;
        let read = async {
            match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, socket.next()).await {
                    Ok(next) => next.map_or(NextFrame::Ended, NextFrame::Frame),
                    Err(_) => NextFrame::Idle,
                },
                None => socket.next().await.map_or(NextFrame::Ended, NextFrame::Frame),
            }
        };

        match self.shutdown_rx.as_mut() {
            Some(shutdown_rx) => {
                // a dropped sender disables the branch instead of closing the socket
                let raised = async { shutdown_rx.wait_for(|down| *down).await.is_ok() };
                tokio::select! {
                    biased;
                    true = raised => NextFrame::Shutdown,
                    next = read => next,
                }
            }
            None => read.await,
        }
    }

    /// Classify one frame and echo it when it carries a valid envelope
    async fn handle_frame<S, E>(&self, socket: &mut S, message: Message)
    where
        S: Sink<Message, Error = E> + Unpin,
        E: fmt::Display,
    {
        let started = Instant::now();
        self.metrics.record_message_received();

        let kind = FrameKind::of(&message);
        if !kind.carries_envelope() {
            debug!(frame_kind = %kind, len = frame_len(&message), "Ignoring non-binary frame");
            return;
        }
        let Message::Binary(raw) = message else {
            return;
        };

        match Envelope::from_frame(&raw) {
            Ok(envelope) => {
                debug!(
                    sender_id = %envelope.sender_id,
                    receiver_id = %envelope.receiver_id,
                    content = %envelope.content,
                    "Envelope received"
                );
            }
            Err(e) => {
                warn!(error = %e, len = raw.len(), "Failed to decode envelope");
                self.metrics.record_message_error();
                return;
            }
        }

        match socket.send(Message::Binary(raw)).await {
            Ok(()) => {
                self.metrics.record_message_sent();
                self.metrics.observe_response_time(started.elapsed());
            }
            Err(e) => {
                warn!(error = %e, "Error writing echo");
                self.metrics.record_message_error();
            }
        }
    }

    async fn send_greeting<S, E>(&self, socket: &mut S)
    where
        S: Sink<Message, Error = E> + Unpin,
        E: fmt::Display,
    {
        let greeting = Envelope::greeting().encode_to_bytes();
        if let Err(e) = socket.send(Message::Binary(greeting.to_vec())).await {
            warn!(error = %e, "Failed to send greeting");
        }
    }

    /// Release the socket; handler-driven closes tell the peer why
    async fn close<S, E>(&self, socket: &mut S, reason: CloseReason)
    where
        S: Sink<Message, Error = E> + Unpin,
        E: fmt::Display,
    {
        let frame = match reason {
            CloseReason::IdleTimeout => Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "idle timeout".into(),
            }),
            CloseReason::Shutdown => Some(CloseFrame {
                code: close_code::AWAY,
                reason: "server shutting down".into(),
            }),
            CloseReason::ReadFailed | CloseReason::PeerClosed => None,
        };

        if let Some(frame) = frame {
            if let Err(e) = socket.send(Message::Close(Some(frame))).await {
                debug!(error = %e, "Failed to send close frame");
            }
        }

        if let Err(e) = socket.close().await {
            debug!(error = %e, "Error closing socket");
        }
    }
}

fn frame_len(message: &Message) -> usize {
    match message {
        Message::Text(text) => text.len(),
        Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => data.len(),
        Message::Close(_) => 0,
    }
}
