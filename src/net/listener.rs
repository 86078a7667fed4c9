//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to configured address(es) before any server task starts
//! - Report bind failures (port in use, permission denied) to the caller
//! - Hand the bound socket to `axum-server`
//!
//! # Design Decisions
//! - Binding happens eagerly so startup can fail before traffic is served
//! - No retry: a failed bind is fatal and left to the operator

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind {
        listener: &'static str,
        addr: SocketAddr,
        source: std::io::Error,
    },
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind {
                listener,
                addr,
                source,
            } => write!(f, "Failed to bind {} listener on {}: {}", listener, addr, source),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
        }
    }
}

/// A bound, not yet serving, listening socket.
#[derive(Debug)]
pub struct BoundListener {
    name: &'static str,
    inner: std::net::TcpListener,
    local_addr: SocketAddr,
}

impl BoundListener {
    /// Bind `addr`; `name` only labels logs and errors.
    pub async fn bind(name: &'static str, addr: SocketAddr) -> Result<Self, ListenerError> {
        let bind_err = |source| ListenerError::Bind {
            listener: name,
            addr,
            source,
        };

        let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;
        // Stays in non-blocking mode, as axum-server expects.
        let inner = listener.into_std().map_err(bind_err)?;

        tracing::info!(listener = name, address = %local_addr, "Listener bound");

        Ok(Self {
            name,
            inner,
            local_addr,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn into_std(self) -> std::net::TcpListener {
        self.inner
    }
}
