//! Frame Types

use axum::extract::ws::Message;
use std::fmt;

/// Transport-level classification of one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Binary,
    Text,
    Ping,
    Pong,
    Close,
}

impl FrameKind {
    /// Classify a WebSocket message
    pub fn of(message: &Message) -> Self {
        match message {
            Message::Binary(_) => FrameKind::Binary,
            Message::Text(_) => FrameKind::Text,
            Message::Ping(_) => FrameKind::Ping,
            Message::Pong(_) => FrameKind::Pong,
            Message::Close(_) => FrameKind::Close,
        }
    }

    /// Only binary frames carry envelopes
    pub fn carries_envelope(self) -> bool {
        matches!(self, FrameKind::Binary)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FrameKind::Binary => "binary",
            FrameKind::Text => "text",
            FrameKind::Ping => "ping",
            FrameKind::Pong => "pong",
            FrameKind::Close => "close",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
