//! # trigsyncd — hosted synchronization daemon
//!
//! Composition root that wires the engines to a surface and serves host
//! messages over stdio.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize tracing (to stderr; stdout carries the protocol)
//! - Construct the surface adapter (the in-memory demo surface — real
//!   deployments implement the surface port against the actual application)
//! - Construct the host handler, injecting engines via port traits
//! - Answer `{action: apply|extract}` JSON lines on stdin with
//!   `{success, data|error}` lines on stdout until EOF
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use trigsync_adapter_host::HostHandler;
use trigsync_adapter_surface_memory::MemorySurface;
use trigsync_app::progress::BroadcastProgress;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .with_writer(std::io::stderr)
        .init();

    let surface = Arc::new(MemorySurface::new(
        config.surface_latency(),
        config.surface.events.clone(),
    ));

    let progress = BroadcastProgress::new(256);
    let mut progress_rx = progress.subscribe();
    tokio::spawn(async move {
        loop {
            match progress_rx.recv().await {
                Ok(snapshot) => tracing::info!(
                    completed = snapshot.completed,
                    total = snapshot.total,
                    percent = snapshot.percent(),
                    "progress"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let handler = HostHandler::new(surface, progress, config.timing());

    tracing::info!("trigsyncd ready, reading requests from stdin");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handler.handle_line(&line).await;
        let mut encoded = serde_json::to_string(&response)?;
        encoded.push('\n');
        stdout.write_all(encoded.as_bytes()).await?;
        stdout.flush().await?;
    }
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
