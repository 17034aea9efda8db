//! Command-line front end for wireflow.
//!
//! Works on a directory of persisted flows (`{flow_id}.json`) and an
//! optional definitions catalog file.

mod commands;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Inspect and normalize wireflow flow documents
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory holding `{flow_id}.json` documents
    #[arg(long, short, default_value = ".", global = true)]
    store: PathBuf,

    /// Node definitions catalog (JSON). Without it every node type is unknown.
    #[arg(long, short, global = true)]
    definitions: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the flows in the store
    List,
    /// Show a flow's nodes, edges with reconstructed ports, and load repairs
    Inspect {
        flow_id: String,
        /// Print the loaded graph as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load and re-save a flow, repairing positions, wires and config layout
    Normalize {
        flow_id: String,
        /// Print the result instead of writing it back
        #[arg(long)]
        dry_run: bool,
    },
    /// List the node definitions in the catalog by category
    Definitions,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let context = commands::Context::new(cli.store, cli.definitions);

    let result = match cli.command {
        Command::List => commands::list(&context).await,
        Command::Inspect { flow_id, json } => commands::inspect(&context, &flow_id, json).await,
        Command::Normalize { flow_id, dry_run } => {
            commands::normalize(&context, &flow_id, dry_run).await
        }
        Command::Definitions => commands::definitions(&context).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
