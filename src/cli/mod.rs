//! CLI entry point for Helm.

pub mod structured;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Helm CLI
#[derive(Parser, Debug)]
#[command(name = "helm", version, about = "Helm — structured output tooling for agent loops")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract a JSON value from an agent response
    Extract(ExtractArgs),
    /// Print the query text sent to the loop for a structured request
    Prompt(PromptArgs),
}

/// Arguments for `helm extract`.
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Response text file (stdin when omitted)
    pub file: Option<PathBuf>,

    /// JSON Schema file to validate the extracted value against
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}

/// Arguments for `helm prompt`.
#[derive(Parser, Debug)]
pub struct PromptArgs {
    /// Task text
    pub query: String,

    /// JSON Schema file describing the expected answer
    #[arg(short, long)]
    pub schema: PathBuf,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
