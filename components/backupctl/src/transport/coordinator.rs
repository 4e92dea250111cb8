// Local crates
use crate::{
    proto::api::{
        BackupsMetadataParams, Client, Empty, ListStoragesParams, MetadataFile,
        RunBackupParams, RunRestoreParams, StorageInfo, api_client::ApiClient,
    },
    transport::connection::ApiChannel,
};

// External crates
use futures::StreamExt;
use futures::stream::BoxStream;
use std::future::Future;
use tonic::Status;

/// A server-streaming response: items until clean end, or a `Status` on failure.
pub type ServerStream<T> = BoxStream<'static, Result<T, Status>>;

/// Operations the client needs from the backup coordinator.
///
/// Implemented for the generated gRPC client; the command router only depends on
/// this trait so it can be driven by an in-memory coordinator in tests.
pub trait BackupCoordinator {
    /// `GetClients`
    fn connected_agents(
        &mut self,
    ) -> impl Future<Output = Result<ServerStream<Client>, Status>> + Send;

    /// `BackupsMetadata`
    fn backup_metadata(
        &mut self,
    ) -> impl Future<Output = Result<ServerStream<MetadataFile>, Status>> + Send;

    /// `ListStorages`
    fn storages(&mut self)
    -> impl Future<Output = Result<ServerStream<StorageInfo>, Status>> + Send;

    /// `RunBackup`
    fn start_backup(
        &mut self,
        params: RunBackupParams,
    ) -> impl Future<Output = Result<(), Status>> + Send;

    /// `RunRestore`
    fn start_restore(
        &mut self,
        params: RunRestoreParams,
    ) -> impl Future<Output = Result<(), Status>> + Send;
}

impl BackupCoordinator for ApiClient<ApiChannel> {
    async fn connected_agents(&mut self) -> Result<ServerStream<Client>, Status> {
        let response = self.get_clients(Empty {}).await?;
        Ok(response.into_inner().boxed())
    }

    async fn backup_metadata(&mut self) -> Result<ServerStream<MetadataFile>, Status> {
        let response = self.backups_metadata(BackupsMetadataParams {}).await?;
        Ok(response.into_inner().boxed())
    }

    async fn storages(&mut self) -> Result<ServerStream<StorageInfo>, Status> {
        let response = self.list_storages(ListStoragesParams {}).await?;
        Ok(response.into_inner().boxed())
    }

    async fn start_backup(&mut self, params: RunBackupParams) -> Result<(), Status> {
        self.run_backup(params).await?;
        Ok(())
    }

    async fn start_restore(&mut self, params: RunRestoreParams) -> Result<(), Status> {
        self.run_restore(params).await?;
        Ok(())
    }
}
