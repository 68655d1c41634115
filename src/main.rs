//! Studentdesk - student-services portal
//!
//! Entry point for the studentdesk binary: runs the HTTP API and a few
//! maintenance commands against the same store.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use studentdesk_core::PortalConfig;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "studentdesk")]
#[command(about = "Student-services portal: procedure assistant, tickets and exports", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Config file (defaults to ~/.config/studentdesk/config.toml)
    #[arg(long, env = "STUDENTDESK_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Bind address (overrides server.addr)
        #[arg(long)]
        addr: Option<String>,

        /// Event channel capacity (overrides server.event_capacity)
        #[arg(long)]
        capacity: Option<usize>,
    },

    /// Render a ticket as a printable HTML document
    Export {
        /// Ticket id
        #[arg(short, long)]
        ticket: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask the procedure assistant a single question
    Ask {
        /// The question
        question: String,

        /// Answer as this student (MSSV), using their profile
        #[arg(long)]
        student: Option<String>,
    },

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: cli::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Use the requested level for our crates, WARN for noisy dependencies
    let level = level.as_str().to_lowercase();
    let filter = EnvFilter::new(format!(
        "studentdesk={level},studentdesk_core={level},tower_http={level},hyper=warn,reqwest=warn,tokio::sync::broadcast=error,tokio_stream=error",
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Studentdesk v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.as_deref();
    let load_config = || PortalConfig::load(config_path);

    match cli.command {
        Commands::Serve { addr, capacity } => {
            cli::serve::handle(load_config()?, addr, capacity).await?
        }
        Commands::Export { ticket, output } => {
            cli::export::handle(load_config()?, ticket, output).await?
        }
        Commands::Ask { question, student } => {
            cli::ask::handle(load_config()?, question, student).await?
        }
        Commands::Config { action } => cli::config::handle(action, config_path).await?,
    }

    Ok(())
}
