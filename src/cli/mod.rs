//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
}

pub mod commands;

/// SiteQuery CLI - answer questions about construction projects
#[derive(Parser, Debug)]
#[command(name = "sq", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.sitequery/data/sitequery.db)
    #[arg(long, global = true, env = "SQ_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the project database
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Load projects from a JSON fixture file
    Import {
        /// Fixture file
        file: PathBuf,
    },

    /// Ask a question and print the answer
    Ask(AskArgs),

    /// Show how a question would be interpreted, without answering it
    Analyze {
        /// The question
        text: String,

        /// Skip the oracle and use pattern rules only
        #[arg(long)]
        offline: bool,
    },

    /// Run an operation directly
    Run(RunArgs),

    /// Browse projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Show a project's phase progress
    Phases {
        /// Project ID or name
        reference: String,
    },

    /// Classification oracle configuration
    Oracle {
        #[command(subcommand)]
        command: OracleCommands,
    },

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question
    pub text: String,

    /// Conversation ID; follow-up questions may refer back to its project
    #[arg(short, long)]
    pub conversation: Option<String>,

    /// Skip the oracle and use pattern rules only
    #[arg(long)]
    pub offline: bool,

    /// Oracle timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Forget the conversation's earlier questions before asking
    #[arg(long, requires = "conversation")]
    pub reset: bool,

    /// Use this text as the oracle reply instead of calling a provider
    #[arg(long, conflicts_with = "offline")]
    pub oracle_reply: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Intent name, e.g. project_phase_status
    pub intent: String,

    /// Filter as key=value (repeatable)
    #[arg(short, long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,

    /// Attach a chart to the answer
    #[arg(long)]
    pub chart: bool,

    /// Chart type (bar, pie, line)
    #[arg(long, requires = "chart")]
    pub chart_type: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List projects, most recently updated first
    List {
        /// Filter by status (Not Started, Planning, In Progress, Completed, active, done)
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum projects to return
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show project details
    Show {
        /// Project ID or name
        reference: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum OracleCommands {
    /// Show oracle status and configuration
    Status,

    /// Configure the oracle provider
    Configure {
        /// Provider (ollama, gemini)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model to use (provider-specific)
        #[arg(short, long)]
        model: Option<String>,

        /// API endpoint (for custom servers)
        #[arg(long)]
        endpoint: Option<String>,

        /// API key (for Gemini)
        #[arg(long)]
        api_key: Option<String>,

        /// Timeout in seconds for one classification call
        #[arg(long)]
        timeout: Option<u64>,

        /// Enable the oracle
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the oracle
        #[arg(long)]
        disable: bool,

        /// Remove all stored oracle settings
        #[arg(long, conflicts_with_all = ["provider", "model", "endpoint", "api_key", "timeout", "enable", "disable"])]
        reset: bool,
    },
}
