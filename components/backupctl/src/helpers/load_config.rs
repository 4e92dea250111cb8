// Local crates
use crate::helpers::errors::ClientResult;

// External crates
use clap::Args;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:10001";
pub const DEFAULT_SERVER_COMPRESSOR: &str = "gzip";
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Looked up in the user's home directory, skipped silently when missing.
pub const DEFAULT_CONFIG_FILE: &str = ".backupctl.yaml";
pub const ENV_PREFIX: &str = "BACKUPCTL";
/// Names the config file when `--config-file` is not given.
pub const CONFIG_FILE_ENV: &str = "BACKUPCTL_CONFIG_FILE";

/// Keys accepted from the config file and from `BACKUPCTL_*` variables.
const CONFIG_KEYS: [&str; 7] = [
    "api_token",
    "server_address",
    "server_compressor",
    "tls",
    "tls_ca_file",
    "log_level",
    "log_dir",
];

/// Resolved connection and logging settings shared by every command.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_token: String,
    pub server_address: String,
    pub server_compressor: String,
    pub tls: bool,
    pub tls_ca_file: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

/// Global command line flags. Anything left unset falls through to the
/// environment, then the config file, then the compiled-in defaults.
#[derive(Debug, Default, Clone, Args)]
pub struct ConfigOverrides {
    /// Config file name
    #[arg(short = 'c', long, global = true)]
    pub config_file: Option<PathBuf>,

    /// Security token to use when connecting to the backup coordinator
    #[arg(long, global = true)]
    pub api_token: Option<String>,

    /// Backup coordinator address (host:port) [default: 127.0.0.1:10001]
    #[arg(short = 's', long, global = true)]
    pub server_address: Option<String>,

    /// Backup coordinator gRPC compression [default: gzip]
    #[arg(long, global = true, value_parser = ["gzip", "none"])]
    pub server_compressor: Option<String>,

    /// Connection uses TLS if set, else plain TCP
    #[arg(long, global = true, overrides_with = "no_tls")]
    pub tls: bool,

    /// Force plain TCP even when the config file or environment enables TLS
    #[arg(long, global = true, overrides_with = "tls")]
    pub no_tls: bool,

    /// The file containing the CA root cert file
    #[arg(long, global = true)]
    pub tls_ca_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set [default: warn]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write JSON logs into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// `--tls` / `--no-tls`, whichever came last; `None` when neither was given.
    pub fn tls_override(&self) -> Option<bool> {
        match (self.tls, self.no_tls) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }
}

impl ClientConfig {
    /// Resolve settings against the process environment and home directory.
    pub fn resolve(overrides: &ConfigOverrides) -> ClientResult<Self> {
        let env = std::env::vars().collect();
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::resolve_with(overrides, env, home.as_deref())
    }

    /// Merge, lowest to highest precedence: defaults, config file, environment,
    /// explicit flags.
    #[instrument(
        name = "config_resolver",
        target = "helpers::load_config",
        level = "trace",
        skip_all
    )]
    pub fn resolve_with(
        overrides: &ConfigOverrides,
        env: HashMap<String, String>,
        home: Option<&Path>,
    ) -> ClientResult<Self> {
        let mut builder = Config::builder()
            .set_default("api_token", "")?
            .set_default("server_address", DEFAULT_SERVER_ADDRESS)?
            .set_default("server_compressor", DEFAULT_SERVER_COMPRESSOR)?
            .set_default("tls", false)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?;

        match config_file_path(overrides, &env, home) {
            Some((path, required)) => {
                tracing::trace!(
                    configuration_file_path = %path.display(),
                    required,
                    "Adding configuration file source"
                );
                builder = builder.add_source(File::from(path).required(required));
            }
            None => tracing::trace!("No configuration file found, using defaults"),
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .source(Some(known_env_vars(env))),
        );

        let path_value = |p: &Option<PathBuf>| p.as_ref().map(|p| p.to_string_lossy().into_owned());
        builder = builder
            .set_override_option("api_token", overrides.api_token.clone())?
            .set_override_option("server_address", overrides.server_address.clone())?
            .set_override_option("server_compressor", overrides.server_compressor.clone())?
            .set_override_option("tls", overrides.tls_override())?
            .set_override_option("tls_ca_file", path_value(&overrides.tls_ca_file))?
            .set_override_option("log_level", overrides.log_level.clone())?
            .set_override_option("log_dir", path_value(&overrides.log_dir))?;

        let resolved = builder.build()?.try_deserialize::<ClientConfig>()?;
        tracing::trace!(
            server_address = %resolved.server_address,
            tls = resolved.tls,
            "Configuration resolved"
        );
        Ok(resolved)
    }
}

/// Explicit paths (flag, then `BACKUPCTL_CONFIG_FILE`) must exist; the default one
/// only counts when present on disk.
fn config_file_path(
    overrides: &ConfigOverrides,
    env: &HashMap<String, String>,
    home: Option<&Path>,
) -> Option<(PathBuf, bool)> {
    if let Some(path) = &overrides.config_file {
        return Some((path.clone(), true));
    }
    if let Some(path) = env.get(CONFIG_FILE_ENV).filter(|p| !p.is_empty()) {
        return Some((PathBuf::from(path), true));
    }
    let default_path = home?.join(DEFAULT_CONFIG_FILE);
    default_path.is_file().then_some((default_path, false))
}

/// Keep only the `BACKUPCTL_*` variables that name a config key, so unrelated
/// variables sharing the prefix do not trip unknown-field validation.
fn known_env_vars(env: HashMap<String, String>) -> HashMap<String, String> {
    env.into_iter()
        .filter(|(name, _)| {
            name.strip_prefix(ENV_PREFIX)
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(|key| CONFIG_KEYS.contains(&key.to_ascii_lowercase().as_str()))
        })
        .collect()
}
