//! LidarQC - quality-control checks for LiDAR survey deliverables.

use clap::{Parser, Subcommand};
use lidarqc_cli::commands::check_dataset::{self, CheckDatasetArgs};
use lidarqc_cli::logging;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "lidarqc", version)]
#[command(about = "Quality-control checks for LiDAR survey deliverables")]
struct Cli {
    /// Increase log verbosity to debug.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Write the log to a file instead of stderr.
    #[arg(long, global = true, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gather per-tile metadata, reconcile against the tile index, and
    /// write the results to a GeoPackage.
    CheckDataset(CheckDatasetArgs),
}

fn main() {
    let cli = Cli::parse();
    if let Err(message) = logging::init(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {message}");
        process::exit(1);
    }

    let result = match cli.command {
        Commands::CheckDataset(args) => check_dataset::run(&args),
    };

    // A completed check exits 0 even when it recorded discrepancies; only
    // unrecoverable configuration errors are non-zero.
    if let Err(err) = result {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
