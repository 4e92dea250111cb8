// Local crates
use crate::{
    helpers::{
        errors::{ClientError, ClientResult},
        load_config::ClientConfig,
    },
    proto::api::api_client::ApiClient,
    transport::interceptor::CallChain,
};

// External crates
use std::path::{Path, PathBuf};
use std::time::Duration;
use tonic::codec::CompressionEncoding;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::instrument;

/// CA bundle used when `--tls` is set without `--tls-ca-file`.
pub const DEFAULT_TLS_CA_FILE: &str = "/etc/backupctl/ca.pem";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Channel type every API client is built on: the raw HTTP/2 channel wrapped by the
/// call chain.
pub type ApiChannel = InterceptedService<Channel, CallChain>;

/// One established connection to the backup coordinator.
///
/// Opened once per run and shared read-only by whichever command executes; the
/// underlying channel is released when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Connection {
    channel: Channel,
    chain: CallChain,
    compression: Option<CompressionEncoding>,
}

impl Connection {
    /// Dial the coordinator described by `cfg`.
    ///
    /// - TLS: the CA certificate is read from `tls_ca_file` (or
    /// [`DEFAULT_TLS_CA_FILE`]); failures surface as `Credential` errors.
    /// - Compression: `gzip` is negotiated for every call unless the configured
    /// compressor is empty or `none`.
    #[instrument(
        name = "backupctl_transport::connect",
        target = "transport::connection",
        skip_all,
        fields(server_address = %cfg.server_address, tls = cfg.tls),
        level = "debug"
    )]
    pub async fn open(cfg: &ClientConfig) -> ClientResult<Self> {
        let compression = compression_encoding(&cfg.server_compressor)?;
        let chain = CallChain::for_token(&cfg.api_token)?;
        let endpoint = endpoint(cfg).await?;

        tracing::debug!("Creating HTTP/2 connection channel to backup coordinator");
        let channel = endpoint
            .connect()
            .await
            .map_err(|source| ClientError::Connection {
                address: cfg.server_address.clone(),
                source,
            })?;
        tracing::debug!(
            compression = ?compression,
            "Connected to backup coordinator"
        );

        Ok(Self {
            channel,
            chain,
            compression,
        })
    }

    /// A typed API client sharing this connection, with the call chain and
    /// compression settings applied.
    pub fn client(&self) -> ApiClient<ApiChannel> {
        let mut client = ApiClient::with_interceptor(self.channel.clone(), self.chain.clone());
        if let Some(encoding) = self.compression {
            client = client
                .send_compressed(encoding)
                .accept_compressed(encoding);
        }
        client
    }
}

/// Map the configured compressor name onto a tonic encoding.
pub fn compression_encoding(name: &str) -> ClientResult<Option<CompressionEncoding>> {
    match name {
        "" | "none" => Ok(None),
        "gzip" => Ok(Some(CompressionEncoding::Gzip)),
        other => Err(ClientError::Validation {
            field: "server compressor",
            value: other.to_string(),
        }),
    }
}

async fn endpoint(cfg: &ClientConfig) -> ClientResult<Endpoint> {
    let scheme = if cfg.tls { "https" } else { "http" };
    let connection_error = |source| ClientError::Connection {
        address: cfg.server_address.clone(),
        source,
    };

    let endpoint = Endpoint::from_shared(format!("{scheme}://{}", cfg.server_address))
        .map_err(connection_error)?
        .connect_timeout(CONNECT_TIMEOUT);

    if !cfg.tls {
        return Ok(endpoint);
    }

    let ca_path = cfg
        .tls_ca_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TLS_CA_FILE));
    let tls = load_tls_config(&ca_path).await?;
    endpoint
        .tls_config(tls)
        .map_err(|e| credential_error(&ca_path, e))
}

/// Read the trust anchor the coordinator's certificate must chain to.
async fn load_tls_config(ca_path: &Path) -> ClientResult<ClientTlsConfig> {
    tracing::debug!(ca_file = %ca_path.display(), "Loading TLS CA certificate");
    let pem = tokio::fs::read(ca_path)
        .await
        .map_err(|e| credential_error(ca_path, e))?;

    if !String::from_utf8_lossy(&pem).contains("-----BEGIN CERTIFICATE-----") {
        return Err(credential_error(ca_path, "no PEM certificate found"));
    }

    Ok(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(pem)))
}

fn credential_error(path: &Path, reason: impl ToString) -> ClientError {
    ClientError::Credential {
        origin: path.display().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::api::{
        BackupsMetadataParams, Client, Empty, ListStoragesParams, MetadataFile, RunBackupParams,
        RunBackupResponse, RunRestoreParams, RunRestoreResponse, StorageInfo,
        api_server::{Api, ApiServer},
    };
    use crate::transport::coordinator::{BackupCoordinator, ServerStream};
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};
    use tokio::sync::oneshot;
    use tokio_stream::wrappers::TcpListenerStream;
    use tonic::{Request, Response, Status, transport::Server};

    /// Metadata one call arrived with at the coordinator.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct SeenCall {
        method: &'static str,
        authorization: Option<String>,
        encoding: Option<String>,
    }

    /// Coordinator answering every RPC with canned data and recording what it saw.
    #[derive(Debug, Clone, Default)]
    struct RecordingApi {
        calls: Arc<Mutex<Vec<SeenCall>>>,
    }

    impl RecordingApi {
        fn record<T>(&self, method: &'static str, request: &Request<T>) {
            let header = |name: &str| {
                request
                    .metadata()
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            };
            let call = SeenCall {
                method,
                authorization: header("authorization"),
                encoding: header("grpc-encoding"),
            };
            self.calls.lock().unwrap().push(call);
        }

        fn seen(&self) -> Vec<SeenCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[tonic::async_trait]
    impl Api for RecordingApi {
        type GetClientsStream = ServerStream<Client>;
        type BackupsMetadataStream = ServerStream<MetadataFile>;
        type ListStoragesStream = ServerStream<StorageInfo>;

        async fn get_clients(
            &self,
            request: Request<Empty>,
        ) -> Result<Response<Self::GetClientsStream>, Status> {
            self.record("GetClients", &request);
            let agent = Client {
                node_name: "rs1-a".into(),
                ..Default::default()
            };
            Ok(Response::new(futures::stream::iter([Ok(agent)]).boxed()))
        }

        async fn backups_metadata(
            &self,
            request: Request<BackupsMetadataParams>,
        ) -> Result<Response<Self::BackupsMetadataStream>, Status> {
            self.record("BackupsMetadata", &request);
            Ok(Response::new(futures::stream::empty().boxed()))
        }

        async fn list_storages(
            &self,
            request: Request<ListStoragesParams>,
        ) -> Result<Response<Self::ListStoragesStream>, Status> {
            self.record("ListStorages", &request);
            let storage = StorageInfo {
                name: "local-fs".into(),
                ..Default::default()
            };
            Ok(Response::new(futures::stream::iter([Ok(storage)]).boxed()))
        }

        async fn run_backup(
            &self,
            request: Request<RunBackupParams>,
        ) -> Result<Response<RunBackupResponse>, Status> {
            self.record("RunBackup", &request);
            Ok(Response::new(RunBackupResponse {}))
        }

        async fn run_restore(
            &self,
            request: Request<RunRestoreParams>,
        ) -> Result<Response<RunRestoreResponse>, Status> {
            self.record("RunRestore", &request);
            Ok(Response::new(RunRestoreResponse {}))
        }
    }

    /// Serve `api` on an ephemeral local port until the returned sender is dropped.
    async fn serve(api: RecordingApi) -> (String, oneshot::Sender<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (stop, stopped) = oneshot::channel::<()>();

        let service = ApiServer::new(api)
            .accept_compressed(CompressionEncoding::Gzip)
            .send_compressed(CompressionEncoding::Gzip);
        tokio::spawn(
            Server::builder()
                .add_service(service)
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                    let _ = stopped.await;
                }),
        );

        (address, stop)
    }

    fn config(server_address: &str) -> ClientConfig {
        ClientConfig {
            api_token: String::new(),
            server_address: server_address.to_string(),
            server_compressor: "gzip".to_string(),
            tls: false,
            tls_ca_file: None,
            log_level: "warn".to_string(),
            log_dir: None,
        }
    }

    #[test]
    fn compressor_names() {
        assert_eq!(compression_encoding("").unwrap(), None);
        assert_eq!(compression_encoding("none").unwrap(), None);
        assert_eq!(
            compression_encoding("gzip").unwrap(),
            Some(CompressionEncoding::Gzip)
        );

        let err = compression_encoding("snappy").unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation { value, .. } if value == "snappy"
        ));
    }

    #[tokio::test]
    async fn missing_ca_file_is_a_credential_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ClientConfig {
            tls: true,
            tls_ca_file: Some(dir.path().join("missing.pem")),
            ..config("127.0.0.1:10001")
        };

        let err = Connection::open(&cfg).await.unwrap_err();
        assert!(matches!(err, ClientError::Credential { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn non_pem_ca_file_is_a_credential_error() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.pem");
        std::fs::write(&ca, "not a certificate").unwrap();
        let cfg = ClientConfig {
            tls: true,
            tls_ca_file: Some(ca),
            ..config("127.0.0.1:10001")
        };

        let err = Connection::open(&cfg).await.unwrap_err();
        assert!(matches!(err, ClientError::Credential { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_address_is_a_connection_error() {
        let err = Connection::open(&config("not a host:port")).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        // Bind then drop to get a local port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = Connection::open(&config(&address)).await.unwrap_err();
        assert!(matches!(err, ClientError::Connection { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn credentials_and_gzip_reach_unary_and_streaming_calls() {
        let api = RecordingApi::default();
        let (address, _stop) = serve(api.clone()).await;
        let connection = Connection::open(&config(&address)).await.unwrap();
        let mut client = connection.client();

        let agents: Vec<_> = client.connected_agents().await.unwrap().collect().await;
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].as_ref().unwrap().node_name, "rs1-a");
        client.start_backup(RunBackupParams::default()).await.unwrap();

        let expected = |method| SeenCall {
            method,
            authorization: Some("bearer ".to_string()),
            encoding: Some("gzip".to_string()),
        };
        assert_eq!(api.seen(), vec![expected("GetClients"), expected("RunBackup")]);
    }

    #[tokio::test]
    async fn token_without_compression_reaches_every_call() {
        let api = RecordingApi::default();
        let (address, _stop) = serve(api.clone()).await;
        let cfg = ClientConfig {
            api_token: "s3cret".to_string(),
            server_compressor: "none".to_string(),
            ..config(&address)
        };
        let connection = Connection::open(&cfg).await.unwrap();

        // Clients built from one connection share its call chain.
        let storages: Vec<_> = connection
            .client()
            .storages()
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(storages.len(), 1);
        connection
            .client()
            .start_restore(RunRestoreParams::default())
            .await
            .unwrap();

        let expected = |method| SeenCall {
            method,
            authorization: Some("bearer s3cret".to_string()),
            encoding: None,
        };
        assert_eq!(api.seen(), vec![expected("ListStorages"), expected("RunRestore")]);
    }
}
