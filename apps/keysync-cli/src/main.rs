//! keysync - converge a physical-access system onto the membership directory
//!
//! Subcommands:
//! - `sync` runs one full reconciliation (persons, phones, authorizations)
//! - `send-codes` dispatches pairing codes to unregistered phones
//! - `pending` reports outstanding registration codes

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod error;

use commands::AppContext;
use config::Settings;
use error::CliResult;

/// keysync - membership-driven access provisioning
#[derive(Parser)]
#[command(name = "keysync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "keysync.yaml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debugging output
    #[arg(long, global = true)]
    debug: bool,

    /// Write the fetched directory payloads to FILE for later replay
    #[arg(long, global = true, value_name = "FILE")]
    dump: Option<PathBuf>,

    /// Read directory payloads from FILE instead of the live service
    #[arg(long, global = true, value_name = "FILE", conflicts_with = "dump")]
    replay: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full reconciliation
    Sync(commands::sync::SyncArgs),

    /// Send registration codes to unregistered phones
    SendCodes(commands::send_codes::SendCodesArgs),

    /// List phones with an outstanding registration code
    Pending(commands::pending::PendingArgs),
}

fn init_logging(verbose: bool, debug: bool) {
    let default_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let ctx = AppContext {
        settings: Settings::load(&cli.config)?,
        dump: cli.dump,
        replay: cli.replay,
    };

    match cli.command {
        Commands::Sync(args) => commands::sync::execute(&ctx, args).await,
        Commands::SendCodes(args) => commands::send_codes::execute(&ctx, args).await,
        Commands::Pending(args) => commands::pending::execute(&ctx, args).await,
    }
}
