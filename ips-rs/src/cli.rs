//! Root CLI structure for ips-rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "ips-rs")]
#[command(about = "Inspect and simulate particle effect libraries", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the particle templates and emitters in a library
    Info {
        /// Effect library (YAML, or JSON by extension)
        file: PathBuf,
    },

    /// Build every emitter in a library and report template errors
    Validate {
        /// Effect library (YAML, or JSON by extension)
        file: PathBuf,
    },

    /// Run one emitter headless along a scripted path
    Simulate(SimulateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
