//! mgit CLI - tamper-evident snapshots of a directory

use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;
mod util;

/// mgit - content-addressed, tamper-evident version store
#[derive(Parser)]
#[command(name = "mgit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a repository in the current directory
    Init,
    /// Stage files or directories for the next commit
    Add {
        /// Paths to stage (directories are added recursively)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Record the staged snapshot on top of HEAD
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
    /// Show history from HEAD
    Log {
        /// Number of commits to show (default: all)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show HEAD and staged files
    Status,
    /// Write a commit's files into a directory (HEAD does not move)
    Checkout {
        /// Commit (HEAD, digest or unique prefix; default: HEAD)
        rev: Option<String>,
        /// Destination directory (default: repository root)
        #[arg(long)]
        target: Option<PathBuf>,
    },
    /// Check the integrity of a commit and its history
    Verify {
        /// Commit to start from (default: HEAD)
        rev: Option<String>,
        /// Only the commit itself, not its ancestors
        #[arg(long)]
        single: bool,
    },
    /// Permanently block checkout of a commit
    Revoke {
        /// Commit to revoke
        rev: String,
    },
    /// Print a stored object
    CatFile {
        /// Object digest or unique prefix
        rev: String,
    },
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Init => cmd::init::run()?,
        Commands::Add { paths } => cmd::add::run(&paths)?,
        Commands::Commit { message } => cmd::commit::run(&message)?,
        Commands::Log { limit } => cmd::log::run(limit)?,
        Commands::Status => cmd::status::run()?,
        Commands::Checkout { rev, target } => cmd::checkout::run(rev.as_deref(), target)?,
        Commands::Verify { rev, single } => {
            if !cmd::verify::run(rev.as_deref(), single)? {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Revoke { rev } => cmd::revoke::run(&rev)?,
        Commands::CatFile { rev } => cmd::cat_file::run(&rev)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Log to stderr, filtered by `MGIT_LOG` (default: warn)
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("MGIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
