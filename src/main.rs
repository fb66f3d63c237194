mod cli;
mod server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use armgpt::config::ArmGptConfig;

#[derive(Parser)]
#[command(name = "armgpt", version, about = "LLM assistant for serial terminals")]
struct Cli {
    /// Config file (defaults to ~/.armgpt/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the serial bridge
    Serve {
        /// Serial device, or the `usb` / `serial` shorthand
        #[arg(long)]
        port: Option<String>,
        /// Baud rate
        #[arg(long)]
        baud: Option<u32>,
    },
    /// Manage the retrieval index
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
    /// Show the chunks retrieved for a query
    Search {
        query: String,
        /// Number of chunks to show
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer one message without a serial port
    Ask { message: String },
    /// Check index, embedding, generation tiers and serial ports
    Doctor,
}

#[derive(Subcommand)]
enum IndexAction {
    /// Chunk and embed a directory of .txt documents into a JSONL index
    Build {
        #[arg(long)]
        docs_dir: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ArmGptConfig::load_from(path)?,
        None => ArmGptConfig::load()?,
    };

    // stdout is reserved for command output
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { port, baud } => {
            if let Some(port) = port {
                config.serial.port = port;
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            server::serve(config).await?;
        }
        Command::Index { action } => match action {
            IndexAction::Build { docs_dir, output } => {
                let docs_dir =
                    docs_dir.unwrap_or_else(|| armgpt::config::expand_tilde(&config.index.docs_dir));
                let output = output.unwrap_or_else(|| config.resolved_index_path());
                cli::index::build(&config, &docs_dir, &output).await?;
            }
        },
        Command::Search { query, k } => {
            let k = k.unwrap_or(config.retrieval.top_k);
            cli::search::search(&config, &query, k).await?;
        }
        Command::Ask { message } => {
            cli::ask::ask(&config, &message).await?;
        }
        Command::Doctor => {
            let config_path = cli
                .config
                .unwrap_or_else(armgpt::config::default_config_path);
            cli::doctor::doctor(&config, &config_path).await?;
        }
    }

    Ok(())
}
