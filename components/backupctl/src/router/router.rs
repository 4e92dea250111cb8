// Local crates
use crate::{
    collector::{
        collector::{collect_map, collect_sequence, collect_sorted_by},
        models::{AgentRecord, StorageDescriptor},
    },
    helpers::{
        build_info::build_info,
        converters::backup_entry,
        errors::{ClientError, ClientResult},
    },
    render::{renderer::Renderer, templates::Template},
    requests::builder::{
        BackupOptions, RestoreOptions, build_backup_request, build_restore_request,
    },
    router::commands::Command,
    transport::coordinator::BackupCoordinator,
};

// External crates
use futures::TryStreamExt;
use minijinja::context;
use std::future::Future;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tonic::Status;
use tracing::instrument;

pub const NO_BACKUPS_FOUND: &str = "No backups found";

const OP_LIST_NODES: &str = "connected agents list";
const OP_LIST_BACKUPS: &str = "backups list";
const OP_LIST_STORAGE: &str = "storage list";
const OP_RUN_BACKUP: &str = "RunBackup";
const OP_RUN_RESTORE: &str = "RunRestore";

/// Executes one [`Command`] against the coordinator and renders its output.
///
/// The router owns its collaborators: the coordinator client, the renderer (and
/// through it the output sink) and the cancellation token of the run.
#[derive(Debug)]
pub struct Router<C, W> {
    coordinator: C,
    renderer: Renderer<W>,
    cancel: CancellationToken,
}

impl<C, W> Router<C, W>
where
    C: BackupCoordinator,
    W: Write,
{
    pub fn new(coordinator: C, renderer: Renderer<W>, cancel: CancellationToken) -> Self {
        Self {
            coordinator,
            renderer,
            cancel,
        }
    }

    #[instrument(
        name = "backupctl_router::dispatch",
        target = "router::router",
        skip_all,
        fields(command = command.path()),
        level = "debug"
    )]
    pub async fn dispatch(&mut self, command: &Command) -> ClientResult<()> {
        match command {
            Command::ListNodes { verbose } => self.list_nodes(*verbose).await,
            Command::ListBackups => self.list_backups().await,
            Command::ListStorage => self.list_storage().await,
            Command::RunBackup(opts) => self.run_backup(opts).await,
            Command::RunRestore(opts) => self.run_restore(opts).await,
            Command::Version => show_version(&mut self.renderer),
            Command::CompleteBackups => self.complete_backups().await,
        }
    }

    #[cfg(test)]
    pub fn into_renderer(self) -> Renderer<W> {
        self.renderer
    }

    async fn list_nodes(&mut self, verbose: bool) -> ClientResult<()> {
        let stream = remote_call(
            OP_LIST_NODES,
            &self.cancel,
            self.coordinator.connected_agents(),
        )
        .await?;

        let clients = collect_sorted_by(
            OP_LIST_NODES,
            stream.map_ok(AgentRecord::from),
            &self.cancel,
            |agent: &AgentRecord| agent.node_name.clone(),
        )
        .await?;

        let template = if verbose {
            Template::ConnectedNodesVerbose
        } else {
            Template::ConnectedNodes
        };
        self.renderer.render(template, context! { clients => clients })
    }

    async fn list_backups(&mut self) -> ClientResult<()> {
        let stream = remote_call(
            OP_LIST_BACKUPS,
            &self.cancel,
            self.coordinator.backup_metadata(),
        )
        .await?;
        let backups = collect_map(OP_LIST_BACKUPS, stream, &self.cancel, backup_entry).await?;

        if backups.is_empty() {
            return self.renderer.message(NO_BACKUPS_FOUND);
        }
        self.renderer
            .render(Template::AvailableBackups, context! { backups => backups })
    }

    async fn list_storage(&mut self) -> ClientResult<()> {
        let stream = remote_call(OP_LIST_STORAGE, &self.cancel, self.coordinator.storages()).await?;
        let storages = collect_sequence(
            OP_LIST_STORAGE,
            stream.map_ok(StorageDescriptor::from),
            &self.cancel,
        )
        .await?;

        self.renderer
            .render(Template::AvailableStorages, context! { storages => storages })
    }

    async fn run_backup(&mut self, opts: &BackupOptions) -> ClientResult<()> {
        let request = build_backup_request(opts)?;
        tracing::info!(
            backup_type = %opts.backup_type,
            storage = %request.storage_name,
            "Sending RunBackup to the backup coordinator"
        );

        remote_call(
            OP_RUN_BACKUP,
            &self.cancel,
            self.coordinator.start_backup(request),
        )
        .await?;

        tracing::info!("Backup completed");
        self.renderer.message("Backup completed")
    }

    async fn run_restore(&mut self, opts: &RestoreOptions) -> ClientResult<()> {
        self.renderer.message("restoring")?;
        let request = build_restore_request(opts);
        tracing::info!(
            metadata_file = %request.metadata_file,
            storage = %request.storage_name,
            skip_users_and_roles = request.skip_users_and_roles,
            "Sending RunRestore to the backup coordinator"
        );

        remote_call(
            OP_RUN_RESTORE,
            &self.cancel,
            self.coordinator.start_restore(request),
        )
        .await?;

        tracing::info!("Restore completed");
        self.renderer.message("Restore completed")
    }

    async fn complete_backups(&mut self) -> ClientResult<()> {
        let stream = remote_call(
            OP_LIST_BACKUPS,
            &self.cancel,
            self.coordinator.backup_metadata(),
        )
        .await?;
        let backups = collect_map(OP_LIST_BACKUPS, stream, &self.cancel, backup_entry).await?;

        for (name, record) in &backups {
            self.renderer
                .message(&format!("{name} -> {}", record.description))?;
        }
        Ok(())
    }
}

/// Render build metadata. Needs no connection.
pub fn show_version<W: Write>(renderer: &mut Renderer<W>) -> ClientResult<()> {
    renderer.render(Template::Version, build_info())
}

/// Await a remote call unless the run is cancelled first.
async fn remote_call<T>(
    operation: &'static str,
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T, Status>>,
) -> ClientResult<T> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => Err(ClientError::Cancelled { operation }),
        res = call => res.map_err(|source| ClientError::RemoteCall { operation, source }),
    }
}
