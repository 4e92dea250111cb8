//! `backupctl`: operator client for the backup coordinator.
//!
//! Lists connected agents, stored backups and storage targets, and starts
//! backups and restores over gRPC.

mod cli;
mod collector;
mod helpers;
mod instrumentation;
mod proto;
mod render;
mod requests;
mod router;
mod runtime;
mod transport;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    // Main entrypoint simply delegates control to CLI layer.
    // The CLI parses user commands, resolves configuration and logging, then
    // hands the resolved settings to the runtime.
    cli::cli::run().await
}
