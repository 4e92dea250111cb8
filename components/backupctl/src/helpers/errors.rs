// External crates
use tonic::Status;

/// Client error handling
/// - One variant per failure class of the operator client, so the runtime can
/// decide which ones are fatal (run commands, setup) and which are only reported
/// (listing commands).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{field} {value:?} is invalid")]
    Validation { field: &'static str, value: String },
    #[error("{0} is not implemented yet")]
    UnsupportedFeature(&'static str),
    #[error("cannot connect to backup coordinator at {address}: {source}")]
    Connection {
        address: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("cannot load credentials from {origin}: {reason}")]
    Credential { origin: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("cannot receive the {operation}: {source}")]
    Stream {
        operation: &'static str,
        #[source]
        source: Status,
    },
    #[error("{operation} request failed: {source}")]
    RemoteCall {
        operation: &'static str,
        #[source]
        source: Status,
    },
    #[error("{operation} interrupted")]
    Cancelled { operation: &'static str },
    #[error("cannot render {template} output: {source}")]
    Render {
        template: &'static str,
        #[source]
        source: minijinja::Error,
    },
    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;
