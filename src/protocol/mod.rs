//! Envelope Protocol
//!
//! Frame classification and the binary envelope schema carried in frames.

pub mod constants;
pub mod envelope;
pub mod types;

pub use constants::*;
pub use envelope::Envelope;
pub use types::FrameKind;
