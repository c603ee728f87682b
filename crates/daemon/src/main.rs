//! Peerq - Main Entry Point
//!
//! Reads peer messages as JSON lines on stdin, writes responses as JSON
//! lines on stdout. Logs go to stderr or rolling files.

mod adapters;
mod settings;
mod telemetry;

use adapters::{AckHandler, InboundLine, ResponseRedirector, StdoutTransport};
use anyhow::Result;
use peerq_core::application::PeerPorts;
use peerq_core::port::{ReadinessFlag, ResponseTransport};
use peerq_core::{AppError, MnodePeer};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config_path = settings::config_path();
    let cfg = settings::load(&config_path)?;

    // 2. Initialize logging; the guard flushes file output on exit
    let _log_guard = telemetry::init_logging(&cfg.log)?;

    info!("Peerq v{} starting...", peerq_core::VERSION);
    info!(config = %config_path, workers = cfg.peer.workers, "Configuration loaded");

    // 3. Setup dependencies (DI wiring)
    let readiness = Arc::new(ReadinessFlag::new(false));
    let transport: Arc<dyn ResponseTransport> = Arc::new(StdoutTransport);
    let ports = PeerPorts {
        readiness: readiness.clone(),
        redirector: Arc::new(ResponseRedirector::new(Arc::clone(&transport))),
        handler: Arc::new(AckHandler),
        transport,
    };

    // 4. Open the peer subsystem and start its workers
    let mut peer = MnodePeer::open(cfg.peer, ports)?;
    peer.allocate_queue()?;
    readiness.set_running(true);

    info!("System ready. Reading peer messages from stdin...");

    // 5. Serve until stdin closes or Ctrl+C
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => handle_line(&peer, &line),
                None => {
                    info!("stdin closed");
                    break;
                }
            },
            signal = &mut ctrl_c => {
                signal?;
                info!("Shutdown signal received. Exiting gracefully...");
                break;
            }
        }
    }

    // 6. Graceful shutdown: refuse new messages, drain the queue, join workers
    readiness.set_running(false);
    let stats = peer.stats();
    info!(queued = stats.queued, "Draining peer queue");
    tokio::task::spawn_blocking(move || peer.cleanup()).await?;

    info!("Shutdown complete.");

    Ok(())
}

fn handle_line(peer: &MnodePeer, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let parsed = serde_json::from_str::<InboundLine>(line)
        .map_err(anyhow::Error::from)
        .and_then(InboundLine::into_rpc_msg);
    let msg = match parsed {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, "Malformed input line");
            return;
        }
    };

    match peer.dispatch(msg) {
        Ok(()) => {}
        Err(e @ AppError::SubsystemUnavailable { .. }) => debug!(error = %e, "Peer msg redirected"),
        Err(e) => warn!(error = %e, "Peer msg dispatch failed"),
    }
}
