//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table build (startup and every reload):
//!     RedirectorConfig
//!     → table.rs (parse targets, load certificates)
//!     → RoutingTable (immutable)
//!     → store.rs commit (atomic swap)
//!
//! Lookup (per request / handshake):
//!     host or SNI name
//!     → normalize (lowercase, drop port)
//!     → exact map lookup on the current snapshot
//! ```
//!
//! # Design Decisions
//! - Tables are built whole and never mutated in place
//! - Exact hostname matching only, no wildcards
//! - A failed build leaves the committed table untouched

pub mod store;
pub mod table;

pub use store::RouteStore;
pub use table::{normalize_host, BuildError, ProxyTarget, RoutingTable};
