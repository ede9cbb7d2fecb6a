//! Connection Handling Module
//!
//! Per-connection read/echo loop and the optional connection cap.

pub mod handler;
pub mod limiter;

pub use handler::{CloseReason, ConnectionHandler, HandlerSettings};
pub use limiter::{ConnectionLimiter, ConnectionSlot};
