// External crates
use serde::Serialize;

/// One agent connected to the backup coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRecord {
    pub node_name: String,
    pub id: String,
    pub version: String,
    pub node_type: String,
    pub cluster_id: String,
    pub replicaset_name: String,
    pub replicaset_id: String,
    pub status: String,
    pub last_command_sent: String,
    pub last_seen: String,
}

/// Metadata of one stored backup. The storage filename is the key it is
/// collected under, so it is not repeated here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub description: String,
    pub backup_type: &'static str,
    pub compression: &'static str,
    pub storage_name: String,
    pub start_time: String,
    pub end_time: String,
    pub completed: bool,
}

/// A remote storage target, in the order the coordinator reports them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDescriptor {
    pub name: String,
    pub kind: String,
    pub valid: bool,
    pub can_read: bool,
    pub can_write: bool,
    /// Bucket/region for S3, a path for filesystem storage
    pub location: String,
}
