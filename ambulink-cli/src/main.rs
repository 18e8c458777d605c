//! ambulink CLI - operator console for the dispatch channels
//!
//! Connects as a driver or a rider and prints what the dispatch server
//! sends, and exposes the polyline codec and the config file.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::driver::DriverArgs;
use commands::rider::RiderArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "ambulink")]
#[command(version = ambulink::VERSION)]
#[command(about = "Real-time client for the ambulink dispatch server", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.ambulink/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also print log events to the terminal
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect as an ambulance driver and answer call offers
    Driver(DriverArgs),

    /// Connect as a rider and track the assigned ambulance
    Rider(RiderArgs),

    /// Decode an encoded polyline into coordinates
    Decode {
        /// Encoded polyline text
        polyline: String,
    },

    /// Encode coordinates into a polyline
    Encode {
        /// Points as `lat,lng`
        #[arg(required = true, allow_hyphen_values = true)]
        points: Vec<String>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli
        .config
        .unwrap_or_else(ambulink::config::config_file_path);

    match cli.command {
        Commands::Driver(args) => {
            let config = commands::common::load_config(&config_path)?;
            let _logging = commands::common::init_logging(&config, cli.verbose)?;
            commands::driver::run(args, &config).await
        }
        Commands::Rider(args) => {
            let config = commands::common::load_config(&config_path)?;
            let _logging = commands::common::init_logging(&config, cli.verbose)?;
            commands::rider::run(args, &config).await
        }
        Commands::Decode { polyline } => commands::polyline::run_decode(&polyline),
        Commands::Encode { points } => commands::polyline::run_encode(&points),
        Commands::Config { command } => commands::config::run(command, &config_path),
    }
}
