//! LAN HTTP redirector and HTTPS SNI reverse proxy.
//!
//! Two listeners share one hot-reloadable routing table:
//! - the plain HTTP listener answers every request with a 307 to the target
//!   registered for its `Host`, or 404
//! - the TLS listener picks a certificate by SNI and forwards each request to
//!   the backend registered for its host

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::{ConfigSource, FileSource, RedirectorConfig};
pub use error::{Error, Result};
pub use lifecycle::{LifecycleState, Redirector, StartOptions, StopHandle};
pub use routing::{RouteStore, RoutingTable};
