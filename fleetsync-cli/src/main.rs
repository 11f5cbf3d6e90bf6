//! fleetsync — push the canonical template to every pipeline repository and
//! open a pull request for each one.
//!
//! # Usage
//!
//! ```text
//! fleetsync sync [PIPELINE] [--config <file>] [--jobs <n>] [--json] [--fail-on-error]
//! fleetsync list [PIPELINE] [--config <file>] [--json]
//! ```
//!
//! `sync` reads `FLEETSYNC_RELEASE_TAG` and `FLEETSYNC_BOT_TOKEN` from the
//! environment. Logs go to stderr and honour `RUST_LOG`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{list::ListArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "fleetsync",
    version,
    about = "Sync a shared template into every pipeline repository and open pull requests",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update each repository's template branch and open a pull request.
    Sync(SyncArgs),

    /// Show which pipelines a run would process.
    List(ListArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::List(args) => args.run(),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
