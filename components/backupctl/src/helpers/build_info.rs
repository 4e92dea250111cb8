// External crates
use serde::Serialize;

/// Static build metadata shown by `backupctl version`.
///
/// Commit and branch are filled in by the build script from git when available;
/// release tooling may pin any of them through the `BACKUPCTL_*` build variables.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub build: &'static str,
    pub branch: &'static str,
    pub rust_version: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("BACKUPCTL_COMMIT").unwrap_or("none"),
        build: option_env!("BACKUPCTL_BUILD").unwrap_or("date"),
        branch: option_env!("BACKUPCTL_BRANCH").unwrap_or("master"),
        rust_version: option_env!("BACKUPCTL_RUSTC_VERSION").unwrap_or("unknown"),
    }
}
