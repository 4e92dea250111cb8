// Local crates
use crate::{
    helpers::{
        errors::{ClientError, ClientResult},
        load_config::ClientConfig,
        shutdown::Shutdown,
    },
    render::renderer::Renderer,
    router::{
        commands::{Command, Settings},
        router::{Router, show_version},
    },
    transport::connection::Connection,
};

// External crates
use anyhow::{Context, Result};
use std::io;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

const OP_CONNECT: &str = "connection setup";

/// Run one command end to end.
///
/// Exit status rules:
/// - setup failures (connection, TLS credentials) are fatal;
/// - `run backup` / `run restore` failures are fatal;
/// - listing failures are logged and the process still exits cleanly.
#[instrument(
    name = "backupctl_runtime::run",
    target = "runtime::runtime",
    skip_all,
    fields(command = settings.command.path()),
    level = "debug"
)]
pub async fn run_backupctl(settings: Settings) -> Result<()> {
    let Settings { client, command } = settings;
    let mut renderer = Renderer::new(io::stdout())?;

    if !command.needs_connection() {
        show_version(&mut renderer)?;
        return Ok(());
    }

    let shutdown = Shutdown::new();
    let listener = shutdown.spawn_interrupt_listener();

    let outcome = match connect(&client, &shutdown.token()).await {
        Ok(connection) => {
            let mut router = Router::new(connection.client(), renderer, shutdown.token());
            let result = router.dispatch(&command).await;
            // Release the connection before reporting.
            drop(router);
            drop(connection);
            report(&command, result)
        }
        Err(e) if command == Command::CompleteBackups => {
            tracing::debug!(error = %e, "No completion candidates, coordinator unreachable");
            Ok(())
        }
        Err(e) => Err(e).context("Cannot set up the connection to the backup coordinator"),
    };

    // Stops the interrupt listener; nothing else observes the token any more.
    shutdown.trigger();
    if let Err(e) = listener.await {
        tracing::debug!(error = %e, "Interrupt listener did not finish cleanly");
    }

    outcome
}

/// Open the connection, giving up as soon as the user interrupts.
async fn connect(client: &ClientConfig, cancel: &CancellationToken) -> ClientResult<Connection> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled { operation: OP_CONNECT }),
        connection = Connection::open(client) => connection,
    }
}

fn report(command: &Command, result: ClientResult<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if command.is_fatal(&e) => {
            Err(e).with_context(|| format!("`{}` failed", command.path()))
        }
        Err(e) if *command == Command::CompleteBackups => {
            tracing::debug!(error = %e, "No completion candidates");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, command = command.path(), "Command failed");
            Ok(())
        }
    }
}
