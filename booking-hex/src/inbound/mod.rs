//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
mod handlers;
mod rate_limit;
mod server;

pub use auth::{CurrentUser, SESSION_COOKIE};
pub use handlers::{SIGNATURE_HEADER, WebhookVerification};
pub use server::HttpServer;
