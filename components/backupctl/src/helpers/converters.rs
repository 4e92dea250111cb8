//! This module defines conversions from the coordinator's protobuf messages into the
//! records the renderer works with.
//!
//! These conversions are total: unknown enum values fall back to the protobuf default and
//! missing timestamps render as `-`.

use chrono::{DateTime, Utc};
use prost_types::Timestamp;

use crate::collector::models::{AgentRecord, BackupRecord, StorageDescriptor};
use crate::proto::api::{
    BackupMetadata, BackupType, Client, CompressionType, MetadataFile, StorageInfo,
};

/// Render an optional protobuf timestamp as RFC 3339 (UTC, second precision).
pub fn format_timestamp(ts: Option<&Timestamp>) -> String {
    ts.and_then(|ts| DateTime::<Utc>::from_timestamp(ts.seconds, ts.nanos.max(0) as u32))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Name users type for a backup type (`--backup-type`).
pub fn backup_type_name(backup_type: BackupType) -> &'static str {
    match backup_type {
        BackupType::Logical => "logical",
        BackupType::Hotbackup => "hot",
    }
}

/// Name users type for a compression type (`--compression-algorithm`).
pub fn compression_name(compression: CompressionType) -> &'static str {
    match compression {
        CompressionType::NoCompression => "none",
        CompressionType::Gzip => "gzip",
    }
}

impl From<Client> for AgentRecord {
    fn from(client: Client) -> Self {
        let last_seen = format_timestamp(client.last_seen.as_ref());
        Self {
            node_name: client.node_name,
            id: client.id,
            version: client.version,
            node_type: client.node_type,
            cluster_id: client.cluster_id,
            replicaset_name: client.replicaset_name,
            replicaset_id: client.replicaset_id,
            status: client.status,
            last_command_sent: client.last_command_sent,
            last_seen,
        }
    }
}

impl From<BackupMetadata> for BackupRecord {
    fn from(metadata: BackupMetadata) -> Self {
        Self {
            backup_type: backup_type_name(metadata.backup_type()),
            compression: compression_name(metadata.compression_type()),
            start_time: format_timestamp(metadata.start_ts.as_ref()),
            end_time: format_timestamp(metadata.end_ts.as_ref()),
            completed: metadata.completed,
            description: metadata.description,
            storage_name: metadata.storage_name,
        }
    }
}

/// Split a streamed metadata file into its map entry.
pub fn backup_entry(file: MetadataFile) -> (String, BackupRecord) {
    (file.filename, file.metadata.unwrap_or_default().into())
}

impl From<StorageInfo> for StorageDescriptor {
    fn from(info: StorageInfo) -> Self {
        let location = match (&info.s3, &info.filesystem) {
            (Some(s3), _) if !s3.bucket.is_empty() => {
                let mut location = format!("s3://{}", s3.bucket);
                if !s3.region.is_empty() {
                    location.push_str(&format!(" ({})", s3.region));
                }
                if !s3.endpoint_url.is_empty() {
                    location.push_str(&format!(" via {}", s3.endpoint_url));
                }
                location
            }
            (_, Some(fs)) if !fs.path.is_empty() => fs.path.clone(),
            _ => "-".to_string(),
        };

        Self {
            name: info.name,
            kind: info.r#type,
            valid: info.valid,
            can_read: info.can_read,
            can_write: info.can_write,
            location,
        }
    }
}
