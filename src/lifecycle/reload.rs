//! Routing table reload.
//!
//! A reload reads the configuration source, builds a complete table off the
//! async workers and only then swaps it in. Reloads are serialized, and a
//! failed one leaves the committed table in place.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::{ConfigSource, RedirectorConfig};
use crate::error::Result;
use crate::observability::metrics;
use crate::routing::{RouteStore, RoutingTable};

/// Outcome of a committed reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Number of tables committed by this coordinator so far.
    pub generation: u64,
    pub redirects: usize,
    pub proxies: usize,
}

/// Rebuilds and republishes the routing table on request.
pub struct ReloadCoordinator {
    source: Arc<dyn ConfigSource>,
    routes: Arc<RouteStore>,
    /// Held for the whole load-build-commit sequence.
    generation: Mutex<u64>,
}

impl ReloadCoordinator {
    pub fn new(source: Arc<dyn ConfigSource>, routes: Arc<RouteStore>) -> Self {
        Self {
            source,
            routes,
            generation: Mutex::new(0),
        }
    }

    /// Reload now and report the result.
    ///
    /// On error nothing is committed.
    pub async fn reload(&self) -> Result<ReloadSummary> {
        let mut generation = self.generation.lock().await;

        tracing::info!(source = %self.source.describe(), "Reloading configuration");
        let (_, table) = match load_and_build(self.source.clone()).await {
            Ok(loaded) => loaded,
            Err(e) => {
                metrics::record_reload(false);
                return Err(e);
            }
        };

        let redirects = table.redirect_count();
        let proxies = table.proxy_count();
        self.routes.commit(table);
        *generation += 1;

        metrics::record_reload(true);
        metrics::record_routes(redirects, proxies);
        tracing::info!(
            generation = *generation,
            redirects,
            proxies,
            "Routing table reloaded"
        );

        Ok(ReloadSummary {
            generation: *generation,
            redirects,
            proxies,
        })
    }

    /// Reload for fire-and-forget triggers; failures are logged.
    pub async fn reload_logged(&self) {
        if let Err(e) = self.reload().await {
            tracing::error!(error = %e, "Reload failed, keeping current routing table");
        }
    }

    pub fn routes(&self) -> &Arc<RouteStore> {
        &self.routes
    }
}

/// Load the configuration and build its table on a blocking thread.
pub(crate) async fn load_and_build(
    source: Arc<dyn ConfigSource>,
) -> Result<(RedirectorConfig, RoutingTable)> {
    tokio::task::spawn_blocking(move || -> Result<(RedirectorConfig, RoutingTable)> {
        let config = source.load()?;
        let table = RoutingTable::from_config(&config)?;
        Ok((config, table))
    })
    .await?
}
