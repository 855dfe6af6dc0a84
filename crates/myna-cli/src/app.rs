//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "myna")]
#[command(
    author,
    version,
    about = "Engineering admissions counselling: intent routing with retrieval-augmented answers"
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
    /// Ask a question and print the routed answer
    Query(QueryArgs),

    /// Classify a question without answering it
    Classify(ClassifyArgs),

    /// Show vector index and LLM status
    Status,

    /// Inspect or create the configuration file
    Config(ConfigArgs),

    /// Show recent interaction log entries
    Logs(LogsArgs),

    /// Start MCP server
    Mcp,
}

#[derive(Args)]
pub struct QueryArgs {
    /// Question text
    pub query: Vec<String>,

    /// User the question is asked on behalf of
    #[arg(long, default_value = "anonymous")]
    pub user: String,

    /// Continue an existing session
    #[arg(long)]
    pub session: Option<String>,

    /// Extra request context as key=value (repeatable)
    #[arg(long = "context", value_name = "KEY=VALUE")]
    pub context: Vec<String>,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Question text
    pub query: Vec<String>,

    /// Use the local keyword heuristic instead of the model
    #[arg(long)]
    pub heuristic: bool,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct LogsArgs {
    /// Number of entries
    #[arg(short = 'n', default_value = "100")]
    pub limit: usize,

    /// Log file (defaults to audit.log_path)
    #[arg(long)]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Cli,
    Json,
}
