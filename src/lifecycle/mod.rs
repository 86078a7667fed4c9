//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Load config → Build table → Bind both listeners → Serve
//!
//! Reload (reload.rs):
//!     SIGHUP / file change → Load → Build → Commit (or keep old table)
//!
//! Shutdown (shutdown.rs):
//!     Stop requested → Stop accepting → Drain connections → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger config reload
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then TLS, then listeners
//! - Both listeners share one shutdown channel
//! - Shutdown has timeout: in-flight requests are cut after the deadline

pub mod controller;
pub mod reload;
pub mod shutdown;
pub mod signals;

pub use controller::{LifecycleState, Redirector, StartOptions, StopHandle};
pub use reload::{ReloadCoordinator, ReloadSummary};
pub use shutdown::{Shutdown, ShutdownSignal};
