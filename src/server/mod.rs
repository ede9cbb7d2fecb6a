//! HTTP Server Module
//!
//! Routes requests to the WebSocket upgrade, health and metrics endpoints.

pub mod api;
pub mod handlers;
pub mod server;

pub use api::EchoApi;
pub use handlers::{AppState, UpgradeLimits};
pub use server::EchoServer;
