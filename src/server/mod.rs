//! HTTP/WebSocket transport layer

pub mod auth;
pub mod routes;
pub mod server;
pub mod sse;
pub mod state;

pub use server::HttpServer;
pub use state::AppState;
