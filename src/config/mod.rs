//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! fetch-proxy.toml
//!     → loader.rs (read + parse)
//!     → validation.rs (semantic checks, all errors collected)
//!     → schema.rs types used across the service
//!     → watcher.rs (notify-based hot reload → mpsc to the server)
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CircuitBreakerConfig, FetchConfig, GenerationConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig,
};
pub use watcher::ConfigWatcher;
