//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup
//!     → listener.rs (bind both sockets, fail fast)
//!     → axum-server (accept loop, per-connection tasks)
//!
//! HTTPS handshake
//!     → tls.rs CertResolver (SNI → certificate from routing snapshot)
//!     → Hand off to http::proxy
//! ```
//!
//! # Design Decisions
//! - Certificates are loaded with the routing table, never during a handshake
//! - A bind failure aborts startup; nothing retries

pub mod listener;
pub mod tls;

pub use listener::{BoundListener, ListenerError};
pub use tls::{CertResolver, CertificateError};
