//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "ragscope")]
#[command(
    author,
    version,
    about = "Ask questions over a PDF report corpus and inspect request telemetry"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one retrieval-augmented query
    Ask(AskArgs),

    /// Rate a previous answer
    Rate(RateArgs),

    /// Show the latest telemetry rows, newest first
    Log(LogArgs),

    /// Show index and telemetry status
    Status,
}

#[derive(Args)]
pub struct AskArgs {
    /// The question, as free text
    pub question: Vec<String>,

    /// Attach a fresh trace id to this query and print it
    #[arg(long)]
    pub trace: bool,
}

#[derive(Args)]
pub struct RateArgs {
    /// Request id printed by `ask`
    pub request_id: String,

    /// Rating from 1 (poor) to 5 (excellent)
    pub rating: i64,

    /// Optional free-text comment
    #[arg(long)]
    pub comment: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    /// Maximum number of rows to show
    #[arg(long, default_value = "20", conflicts_with = "all")]
    pub limit: usize,

    /// Show every row
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Cli,
    /// JSON output
    Json,
}
