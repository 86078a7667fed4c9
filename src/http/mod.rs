//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Plain HTTP connection
//!     → request.rs (request ID, host extraction)
//!     → redirect.rs (redirect map lookup → 307 / 404)
//!
//! TLS connection (SNI certificate from net::tls)
//!     → request.rs
//!     → proxy.rs (director → single forward → streamed response)
//! ```

pub mod proxy;
pub mod redirect;
pub mod request;

pub use proxy::{build_client, direct, ProxyClient, UpstreamError};
pub use request::request_host;
