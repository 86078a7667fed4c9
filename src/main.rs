//! `http-redirector` binary.
//!
//! ```text
//!   HTTP  ──▶ redirect listener ──▶ 307 Location / 404
//!                    │
//!                    ▼
//!           RouteStore (ArcSwap) ◀── reload ◀── SIGHUP / file watcher
//!                    ▲
//!                    │
//!   HTTPS ──▶ SNI certificate ──▶ proxy listener ──▶ LAN backend
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use http_redirector::config::watcher::ConfigWatcher;
use http_redirector::config::FileSource;
use http_redirector::lifecycle::{signals, Redirector, StartOptions};
use http_redirector::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "http-redirector", version, about)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "http-redirector.toml")]
    config: PathBuf,

    /// Port for the plain HTTP redirect listener
    #[arg(long)]
    port: Option<u16>,

    /// Port for the HTTPS proxy listener
    #[arg(long)]
    sslport: Option<u16>,

    /// Reload when the configuration file changes
    #[arg(long)]
    watch: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logging::init(&args.log_level)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "http-redirector starting");

    let source = Arc::new(FileSource::new(&args.config));
    let options = StartOptions {
        http_port: args.port,
        https_port: args.sslport,
        shutdown_timeout: None,
    };

    let redirector = match Redirector::start(source, options).await {
        Ok(redirector) => redirector,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };

    #[cfg(unix)]
    let _hangups =
        signals::spawn_reload_on_hangup(redirector.reloader().clone(), redirector.shutdown())?;

    // Dropping the watcher stops it, so it lives until main returns.
    let _watcher = if args.watch {
        let (watcher, mut changes) = ConfigWatcher::new(&args.config);
        let watcher = watcher.run()?;
        let reloader = redirector.reloader().clone();
        let mut stop = redirector.shutdown().subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    change = changes.recv() => match change {
                        Some(()) => reloader.reload_logged().await,
                        None => break,
                    },
                    _ = stop.recv() => break,
                }
            }
        });
        Some(watcher)
    } else {
        None
    };

    let stop = redirector.stop_handle();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        stop.stop();
    });

    if let Err(e) = redirector.wait().await {
        tracing::error!(error = %e, "Redirector stopped with an error");
        return Err(e.into());
    }
    Ok(())
}
