// Local crates
use crate::{
    helpers::errors::{ClientError, ClientResult},
    proto::api::{BackupType, CompressionType, Cypher, RunBackupParams, RunRestoreParams},
};

// External crates
use clap::Args;

/// `run backup` flags, as typed by the user or taken from `BACKUPCTL_<FLAG>`
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct BackupOptions {
    /// Backup type (logical or hot)
    #[arg(
        long,
        env = "BACKUPCTL_BACKUP_TYPE",
        default_value = "logical",
        value_parser = ["logical", "hot"]
    )]
    pub backup_type: String,

    /// Compression algorithm used for the backup (none or gzip)
    #[arg(long, env = "BACKUPCTL_COMPRESSION_ALGORITHM", default_value = "")]
    pub compression_algorithm: String,

    /// Encryption algorithm used for the backup
    #[arg(long, env = "BACKUPCTL_ENCRYPTION_ALGORITHM", default_value = "")]
    pub encryption_algorithm: String,

    /// Backup description
    #[arg(long, env = "BACKUPCTL_DESCRIPTION")]
    pub description: String,

    /// Storage Name
    #[arg(long = "storage", env = "BACKUPCTL_STORAGE")]
    pub storage_name: String,
}

/// `run restore` arguments
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct RestoreOptions {
    /// Metadata file having the backup info for restore
    pub metadata_file: String,

    /// Do not restore users and roles
    #[arg(long, env = "BACKUPCTL_SKIP_USERS_AND_ROLES")]
    pub skip_users_and_roles: bool,

    /// Storage Name
    #[arg(long = "storage", env = "BACKUPCTL_STORAGE")]
    pub storage_name: String,
}

/// Validate the user's choices and build the `RunBackup` request.
///
/// Nothing is sent until every enum-like field has been accepted; encryption is
/// rejected outright until the coordinator supports a cypher.
pub fn build_backup_request(opts: &BackupOptions) -> ClientResult<RunBackupParams> {
    let backup_type = match opts.backup_type.as_str() {
        "logical" => BackupType::Logical,
        "hot" => BackupType::Hotbackup,
        other => {
            return Err(ClientError::Validation {
                field: "backup type",
                value: other.to_string(),
            });
        }
    };

    let compression = match opts.compression_algorithm.as_str() {
        "" | "none" => CompressionType::NoCompression,
        "gzip" => CompressionType::Gzip,
        other => {
            return Err(ClientError::Validation {
                field: "compression algorithm",
                value: other.to_string(),
            });
        }
    };

    if !opts.encryption_algorithm.is_empty() {
        return Err(ClientError::UnsupportedFeature("encryption"));
    }

    Ok(RunBackupParams {
        backup_type: backup_type.into(),
        compression_type: compression.into(),
        cypher: Cypher::NoCypher.into(),
        description: opts.description.clone(),
        storage_name: opts.storage_name.clone(),
    })
}

/// Build the `RunRestore` request; every field passes through as given.
pub fn build_restore_request(opts: &RestoreOptions) -> RunRestoreParams {
    RunRestoreParams {
        metadata_file: opts.metadata_file.clone(),
        skip_users_and_roles: opts.skip_users_and_roles,
        storage_name: opts.storage_name.clone(),
    }
}
