//! Envelope wire format
//!
//! One envelope travels in one binary frame, encoded as a protobuf
//! `WebsocketMessage { content = 1; sender_id = 2; receiver_id = 3; }`.
//! Decoding is all-or-nothing: a frame either yields a complete envelope or
//! a [`DecodeError`].

use bytes::Bytes;
use prost::{DecodeError, Message};

use super::constants::*;

/// Decoded application message
#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(string, tag = "1")]
    pub content: String,
    #[prost(string, tag = "2")]
    pub sender_id: String,
    #[prost(string, tag = "3")]
    pub receiver_id: String,
}

impl Envelope {
    pub fn new(
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
        }
    }

    /// Envelope the server sends right after an upgrade when greetings are on
    pub fn greeting() -> Self {
        Self::new(GREETING_SENDER_ID, GREETING_RECEIVER_ID, GREETING_CONTENT)
    }

    /// Decode the raw bytes of a binary frame
    pub fn from_frame(raw: &[u8]) -> Result<Self, DecodeError> {
        Self::decode(raw)
    }

    /// Encode into the bytes of a binary frame
    pub fn encode_to_bytes(&self) -> Bytes {
        Bytes::from(self.encode_to_vec())
    }
}
