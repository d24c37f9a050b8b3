//! stint CLI - working session recorder.

use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use stint::cli;
use tracing_subscriber::EnvFilter;

/// Get the version string.
///
/// - Release builds (on a git tag): "0.1.0"
/// - Development builds: "0.1.0-dev (abc1234)"
fn version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("STINT_GIT_HASH");
    const IS_RELEASE: &str = env!("STINT_IS_RELEASE");

    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" {
            VERSION.to_string()
        } else {
            format!("{VERSION}-dev ({GIT_HASH})")
        }
    })
}

#[derive(Parser)]
#[command(name = "stint")]
#[command(author, version = version(), about = "Record working sessions from saves and commits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session until Enter is pressed.
    Record {
        /// Workspace directory. Defaults to the current directory.
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// List stored sessions, most recent first.
    List {
        /// Maximum number of sessions to show. Defaults to 20.
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show a stored session as JSON.
    Show {
        /// Session ID or document key.
        id: String,
    },

    /// Show saves and commits in time order.
    Timeline {
        /// Session ID or document key.
        id: String,
    },

    /// Print the summarizer digest of a session.
    Digest {
        /// Session ID or document key.
        id: String,
    },

    /// Attach a summarizer result (JSON file) to a session.
    Attach {
        /// Session ID or document key.
        id: String,

        /// Path to the summary JSON.
        summary: PathBuf,
    },

    /// Export a session as a markdown report.
    Export {
        /// Session ID or document key.
        id: String,

        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a stored session.
    Delete {
        /// Session ID or document key.
        id: String,
    },
}

fn init_logging() {
    let debug_enabled = env::var("STINT_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Record { workspace } => cli::record::run(workspace),
        Commands::List { limit } => cli::list::run(limit),
        Commands::Show { id } => cli::show::run(&id),
        Commands::Timeline { id } => cli::timeline::run(&id),
        Commands::Digest { id } => cli::digest::run(&id),
        Commands::Attach { id, summary } => cli::attach::run(&id, &summary),
        Commands::Export { id, output } => cli::export::run(&id, output.as_deref()),
        Commands::Delete { id } => cli::delete::run(&id),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("stint: error: {e}");
            ExitCode::FAILURE
        }
    }
}
