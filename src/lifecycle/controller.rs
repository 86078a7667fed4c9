//! Startup and shutdown of the two listeners.
//!
//! # Responsibilities
//! - Load the initial routing table (fatal on failure)
//! - Bind both sockets before serving anything (fatal on failure)
//! - Serve the redirect and proxy listeners concurrently
//! - Drain both listeners within a deadline on stop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when routes are loaded)
//! - A listener that dies takes the other one down with it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ConfigSource;
use crate::error::{Error, Result};
use crate::http::{proxy, redirect};
use crate::lifecycle::reload::{load_and_build, ReloadCoordinator};
use crate::lifecycle::shutdown::Shutdown;
use crate::net::tls::{server_config, CertResolver};
use crate::net::BoundListener;
use crate::observability::metrics;
use crate::routing::RouteStore;

/// Where the redirector is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Overrides applied on top of the `[listener]` section.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub http_port: Option<u16>,
    pub https_port: Option<u16>,
    pub shutdown_timeout: Option<Duration>,
}

/// Requests a graceful stop. Cheap to clone and safe to call repeatedly.
#[derive(Debug, Clone)]
pub struct StopHandle {
    shutdown: Shutdown,
    state: Arc<watch::Sender<LifecycleState>>,
}

impl StopHandle {
    pub fn stop(&self) {
        let requested = self.state.send_if_modified(|state| {
            if *state == LifecycleState::Running {
                *state = LifecycleState::Stopping;
                true
            } else {
                false
            }
        });
        if requested {
            tracing::info!("Stop requested, draining listeners");
        }
        self.shutdown.trigger();
    }
}

/// A running pair of listeners sharing one routing table.
pub struct Redirector {
    routes: Arc<RouteStore>,
    reloader: Arc<ReloadCoordinator>,
    stop: StopHandle,
    http_addr: SocketAddr,
    https_addr: SocketAddr,
    listeners: JoinSet<(&'static str, std::io::Result<()>)>,
}

impl Redirector {
    /// Load configuration, bind both listeners and start serving.
    ///
    /// Returns once both sockets are bound; the state is then `Running`.
    pub async fn start(source: Arc<dyn ConfigSource>, options: StartOptions) -> Result<Self> {
        let (state, _) = watch::channel(LifecycleState::Starting);
        tracing::info!(source = %source.describe(), "Starting redirector");

        let (config, table) = load_and_build(source.clone()).await?;
        metrics::record_routes(table.redirect_count(), table.proxy_count());

        let listener = &config.listener;
        let http_addr = SocketAddr::new(
            listener.bind_ip,
            options.http_port.unwrap_or(listener.http_port),
        );
        let https_addr = SocketAddr::new(
            listener.bind_ip,
            options.https_port.unwrap_or(listener.https_port),
        );
        let drain = options
            .shutdown_timeout
            .unwrap_or(Duration::from_secs(listener.shutdown_timeout_secs));

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => {
                    if let Err(e) = metrics::init_metrics(addr) {
                        tracing::error!(error = %e, "Failed to start metrics endpoint");
                    }
                }
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let routes = Arc::new(RouteStore::new(table));
        let reloader = Arc::new(ReloadCoordinator::new(source, routes.clone()));
        let client = proxy::build_client(Duration::from_secs(config.timeouts.connect_secs))?;
        let tls = server_config(Arc::new(CertResolver::new(routes.clone())))?;

        let http = BoundListener::bind(metrics::HTTP_LISTENER, http_addr).await?;
        let https = BoundListener::bind(metrics::HTTPS_LISTENER, https_addr).await?;
        let (http_addr, https_addr) = (http.local_addr(), https.local_addr());

        let shutdown = Shutdown::new();
        let mut listeners = JoinSet::new();

        let http_app = redirect::router(routes.clone());
        let handle = drain_on_shutdown(&shutdown, http.name(), drain);
        let name = http.name();
        let server = axum_server::from_tcp(http.into_std()).handle(handle);
        listeners.spawn(async move {
            let result = server
                .serve(http_app.into_make_service_with_connect_info::<SocketAddr>())
                .await;
            (name, result)
        });

        let https_app = proxy::router(routes.clone(), client);
        let handle = drain_on_shutdown(&shutdown, https.name(), drain);
        let name = https.name();
        let server = axum_server::tls_rustls::from_tcp_rustls(https.into_std(), tls).handle(handle);
        listeners.spawn(async move {
            let result = server
                .serve(https_app.into_make_service_with_connect_info::<SocketAddr>())
                .await;
            (name, result)
        });

        state.send_replace(LifecycleState::Running);
        tracing::info!(http = %http_addr, https = %https_addr, "Redirector running");

        Ok(Self {
            routes,
            reloader,
            stop: StopHandle {
                shutdown,
                state: Arc::new(state),
            },
            http_addr,
            https_addr,
            listeners,
        })
    }

    pub fn state(&self) -> LifecycleState {
        *self.stop.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.stop.state.subscribe()
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn https_addr(&self) -> SocketAddr {
        self.https_addr
    }

    pub fn routes(&self) -> &Arc<RouteStore> {
        &self.routes
    }

    pub fn reloader(&self) -> &Arc<ReloadCoordinator> {
        &self.reloader
    }

    /// The shutdown channel, for tasks that should end with the listeners.
    pub fn shutdown(&self) -> &Shutdown {
        &self.stop.shutdown
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Ask both listeners to drain and exit.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Wait until both listeners have exited.
    ///
    /// If one listener fails the other is stopped too, and the first failure
    /// is returned.
    pub async fn wait(mut self) -> Result<()> {
        let mut first_error = None;

        while let Some(joined) = self.listeners.join_next().await {
            let failure = match joined {
                Ok((name, Ok(()))) => {
                    tracing::info!(listener = name, "Listener stopped");
                    continue;
                }
                Ok((listener, Err(source))) => Error::Serve { listener, source },
                Err(e) => Error::Task(e),
            };

            tracing::error!(error = %failure, "Listener exited unexpectedly");
            self.stop.stop();
            first_error.get_or_insert(failure);
        }

        self.stop.state.send_replace(LifecycleState::Stopped);
        tracing::info!("Shutdown complete");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A server handle that starts a bounded graceful shutdown on trigger.
fn drain_on_shutdown(shutdown: &Shutdown, listener: &'static str, deadline: Duration) -> Handle {
    let handle = Handle::new();
    let drain = handle.clone();
    let mut stop = shutdown.subscribe();

    tokio::spawn(async move {
        stop.recv().await;
        tracing::info!(
            listener,
            connections = drain.connection_count(),
            deadline = ?deadline,
            "Draining listener"
        );
        drain.graceful_shutdown(Some(deadline));
    });

    handle
}
