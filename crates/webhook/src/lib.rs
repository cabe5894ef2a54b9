#![doc = include_str!("../README.md")]

pub mod error;
pub mod payload;
pub mod server;

// --- Public API Re-exports ---

pub use error::WebhookError;
pub use payload::parse_alert;
pub use server::{AppState, WebhookServer, build_router};
