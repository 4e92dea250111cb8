// Local crates
use crate::{
    helpers::{errors::ClientError, load_config::ClientConfig},
    requests::builder::{BackupOptions, RestoreOptions},
};

/// Every operation the client can run. The CLI parser produces exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ListNodes { verbose: bool },
    ListBackups,
    ListStorage,
    RunBackup(BackupOptions),
    RunRestore(RestoreOptions),
    Version,
    /// `<filename> -> <description>` lines for shell completion of `run restore`
    CompleteBackups,
}

impl Command {
    /// Command path as typed on the command line, used in logs.
    pub fn path(&self) -> &'static str {
        match self {
            Command::ListNodes { .. } => "list nodes",
            Command::ListBackups => "list backups",
            Command::ListStorage => "list storage",
            Command::RunBackup(_) => "run backup",
            Command::RunRestore(_) => "run restore",
            Command::Version => "version",
            Command::CompleteBackups => "complete-backups",
        }
    }

    /// Only `version` runs without dialing the coordinator.
    pub fn needs_connection(&self) -> bool {
        !matches!(self, Command::Version)
    }

    /// Whether `err` from this command must end the process with a non-zero
    /// status.
    ///
    /// Run commands fail hard on anything. Listing commands only report remote
    /// and stream failures, but a broken renderer or output sink is still fatal.
    /// Completion never fails loudly: the shell just gets no candidates.
    pub fn is_fatal(&self, err: &ClientError) -> bool {
        match self {
            Command::RunBackup(_) | Command::RunRestore(_) => true,
            Command::CompleteBackups => false,
            Command::ListNodes { .. }
            | Command::ListBackups
            | Command::ListStorage
            | Command::Version => matches!(
                err,
                ClientError::Render { .. } | ClientError::Output(_)
            ),
        }
    }
}

/// Everything one invocation needs, resolved once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub client: ClientConfig,
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Status;

    fn stream_error() -> ClientError {
        ClientError::Stream {
            operation: "backups list",
            source: Status::unavailable("gone"),
        }
    }

    fn render_error() -> ClientError {
        ClientError::Render {
            template: "available_backups",
            source: minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, "test"),
        }
    }

    fn backup() -> Command {
        Command::RunBackup(BackupOptions {
            backup_type: "logical".into(),
            compression_algorithm: String::new(),
            encryption_algorithm: String::new(),
            description: "d".into(),
            storage_name: "s".into(),
        })
    }

    #[test]
    fn listing_failures_are_reported_not_fatal() {
        for cmd in [
            Command::ListNodes { verbose: false },
            Command::ListBackups,
            Command::ListStorage,
        ] {
            assert!(!cmd.is_fatal(&stream_error()), "{}", cmd.path());
            assert!(cmd.is_fatal(&render_error()), "{}", cmd.path());
        }
    }

    #[test]
    fn run_failures_are_fatal() {
        assert!(backup().is_fatal(&stream_error()));
        assert!(backup().is_fatal(&ClientError::UnsupportedFeature("encryption")));
    }

    #[test]
    fn completion_never_fails() {
        assert!(!Command::CompleteBackups.is_fatal(&render_error()));
    }

    #[test]
    fn version_is_offline() {
        assert!(!Command::Version.needs_connection());
        assert!(backup().needs_connection());
    }
}
