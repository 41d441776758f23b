//! Codewright CLI: the main entry point.
//!
//! Commands:
//! - `chat`: Interactive coding session, or a single message with `-m`
//! - `models`: Show the model catalog and which models are usable
//! - `init`: Write a default config file

use clap::{Parser, Subcommand};

mod commands;
mod render;

#[derive(Parser)]
#[command(
    name = "codewright",
    about = "Codewright — a conversational coding agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the coding agent in the current directory
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Model to start with (must be in the catalog)
        #[arg(long)]
        model: Option<String>,
    },

    /// List the model catalog
    Models,

    /// Write a default configuration file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with streamed model output.
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat { message, model } => commands::chat::run(message, model).await?,
        Commands::Models => commands::models::run().await?,
        Commands::Init => commands::init::run().await?,
    }

    Ok(())
}
