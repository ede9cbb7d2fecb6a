//! Wire Protocol Constants

/// Default socket write buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Default upper bound for one reassembled WebSocket message (64 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 << 20;

// Greeting envelope sent on connect when enabled
pub const GREETING_CONTENT: &str = "Connection established successfully!";
pub const GREETING_SENDER_ID: &str = "server";
pub const GREETING_RECEIVER_ID: &str = "client";

/// Static body returned by the health routes
pub const HEALTH_RESPONSE: &str = "Hello from WebSocket server!";
