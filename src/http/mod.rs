//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → server.rs (Axum setup, middleware: trace, timeout, request ID, CORS)
//!     → handlers.rs (deserialize, delegate to the fetch subsystem)
//!     → response.rs (typed JSON payloads)
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
