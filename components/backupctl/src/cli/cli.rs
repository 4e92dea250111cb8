// Local crates
use crate::{
    helpers::load_config::{ClientConfig, ConfigOverrides},
    instrumentation, runtime,
    requests::builder::{BackupOptions, RestoreOptions},
    router::commands::{Command, Settings},
};

// External crates
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::{self, Write};

/// Offers stored backup names for `run restore <metadata-file>`. clap_complete
/// has no hook for runtime values, so this wraps the generated bash function.
const BASH_BACKUP_CANDIDATES: &str = r#"
_backupctl_with_backups() {
    _backupctl "$@"
    local cur="${COMP_WORDS[COMP_CWORD]}"
    local prev="${COMP_WORDS[COMP_CWORD-1]}"
    local word saw_run=0 saw_restore=0
    for word in "${COMP_WORDS[@]:1:COMP_CWORD-1}"; do
        case "$word" in
            run) saw_run=1 ;;
            restore) [[ $saw_run == 1 ]] && saw_restore=1 ;;
        esac
    done
    if [[ $saw_restore == 1 && "$cur" != -* && "$prev" != --storage ]]; then
        local names
        names="$(backupctl complete-backups 2>/dev/null | cut -d ' ' -f 1)"
        COMPREPLY+=($(compgen -W "$names" -- "$cur"))
    fi
}
complete -F _backupctl_with_backups -o nosort -o bashdefault -o default backupctl
"#;

#[derive(Debug, Parser)]
#[command(
    name = "backupctl",
    about = "Backup coordinator command line client",
    long_about = "backupctl talks to the backup coordinator: it lists connected agents, stored backups and storage targets, and starts backups and restores.",
    version,
    term_width = 100,
    after_help = "\
    EXAMPLES:
        backupctl list nodes --verbose
        backupctl run backup --description nightly --storage s3-us-east
        backupctl run restore 2024-05-01T10:00:00Z.json --storage s3-us-east"
)]
struct Cli {
    #[command(flatten)]
    global: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start a new backup or restore process
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// List objects (connected nodes, backups, etc)
    List {
        #[command(subcommand)]
        command: ListCommands,
    },

    /// Show program version and exit
    Version,

    /// Print a shell completion script
    #[command(after_help = "bash: source <(backupctl completion bash)")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print stored backups as completion candidates for `run restore`
    #[command(hide = true)]
    CompleteBackups,
}

#[derive(Debug, Subcommand)]
enum RunCommands {
    /// Start a backup
    Backup(BackupOptions),

    /// Restore a backup given a metadata file name
    Restore(RestoreOptions),
}

#[derive(Debug, Subcommand)]
enum ListCommands {
    /// List backups
    Backups,

    /// List connected nodes
    Nodes {
        /// Include extra node info
        #[arg(long, env = "BACKUPCTL_VERBOSE")]
        verbose: bool,
    },

    /// List available remote storage
    Storage,
}

/// What a parsed command line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    /// Print a completion script; needs neither configuration nor a connection
    Completion(Shell),
    /// Resolve configuration and run a coordinator command
    Run(Command),
}

impl From<Commands> for Action {
    fn from(command: Commands) -> Self {
        let command = match command {
            Commands::Completion { shell } => return Action::Completion(shell),
            Commands::Run {
                command: RunCommands::Backup(opts),
            } => Command::RunBackup(opts),
            Commands::Run {
                command: RunCommands::Restore(opts),
            } => Command::RunRestore(opts),
            Commands::List {
                command: ListCommands::Backups,
            } => Command::ListBackups,
            Commands::List {
                command: ListCommands::Nodes { verbose },
            } => Command::ListNodes { verbose },
            Commands::List {
                command: ListCommands::Storage,
            } => Command::ListStorage,
            Commands::Version => Command::Version,
            Commands::CompleteBackups => Command::CompleteBackups,
        };
        Action::Run(command)
    }
}

/// Write the completion script for `shell`. The bash script also completes
/// `run restore` with the names listed by `complete-backups`.
fn write_completion(shell: Shell, out: &mut impl Write) -> io::Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, out);
    if shell == Shell::Bash {
        out.write_all(BASH_BACKUP_CANDIDATES.as_bytes())?;
    }
    out.flush()
}

/// Entry function for CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = match Action::from(cli.command) {
        Action::Completion(shell) => return Ok(write_completion(shell, &mut io::stdout())?),
        Action::Run(command) => command,
    };
    let client = ClientConfig::resolve(&cli.global)?;

    // Keep the guard alive until the command finishes so file logs are flushed.
    let _log_guard = instrumentation::tracing::init_tracing(&client)?;
    instrumentation::tracing::init_panic_handler();

    runtime::runtime::run_backupctl(Settings { client, command }).await
}
