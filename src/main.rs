//! Main entry point for the auditzip server.
//!
//! Serves the upload endpoint until SIGINT or SIGTERM, then flushes logs
//! and exits with status 0.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use auditzip::lifecycle::Lifecycle;
use auditzip::{Cli, O365AuditParser, server, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let guard = telemetry::init(cli.log_format)?;
    let lifecycle = Lifecycle::init(guard).context("Failed to install signal handlers")?;

    let app = server::router(&cli.server_config(), Arc::new(O365AuditParser));

    let listener = TcpListener::bind((cli.host.as_str(), cli.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", cli.host, cli.port))?;
    info!(
        address = %listener.local_addr()?,
        mode = ?cli.mode,
        "server listening"
    );

    let signal = server::serve(listener, app, lifecycle.wait_for_signal()).await?;

    std::process::exit(lifecycle.teardown(signal))
}
