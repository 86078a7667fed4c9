//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RedirectorConfig (validated, immutable)
//!     → routing::RoutingTable::from_config
//!
//! On reload signal (SIGHUP or watcher.rs):
//!     lifecycle::reload re-runs the whole chain
//!     → atomic swap of the routing table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError, ConfigSource, FileSource};
pub use schema::{
    CertificatePaths, HttpsProxyConfig, ListenerConfig, ProxyEntryConfig, RedirectorConfig,
};
