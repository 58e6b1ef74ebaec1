//! Command-line interface implementation for anatomy.
//! Provides argument parsing using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments structure for anatomy.
#[derive(Parser, Debug)]
#[command(author, version, about = "anatomy: apply and maintain project templates", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every file the registered features can produce
    Tree {
        /// Path to the features file (falls back to $ANATOMY_FEATURES)
        #[arg(long)]
        features_file: Option<PathBuf>,
    },
    /// Apply playbooks to the given directories (default: current)
    Apply {
        /// Target directories, each holding an anatomy-playbook.yml
        #[arg(value_name = "DIRECTORY")]
        directories: Vec<PathBuf>,

        /// Path to the features file (falls back to $ANATOMY_FEATURES)
        #[arg(long)]
        features_file: Option<PathBuf>,
    },
}

/// Parses command line arguments and returns the Args structure.
pub fn get_args() -> Args {
    Args::parse()
}
