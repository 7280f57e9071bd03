//! CLI argument definitions
//!
//! All clap derive structs for `phenology` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Daily crop phenology engine.
#[derive(Parser, Debug)]
#[command(name = "phenology", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "PHENOLOGY_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: OutputFormat,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate a crop through a daily schedule.
    Run(RunArgs),

    /// Validate crop configuration files.
    Validate(ValidateArgs),

    /// Print a crop's phase table.
    Stages(StagesArgs),

    /// Generate shell completions.
    Completions(CompletionsArgs),

    /// Show version information.
    Version(VersionArgs),
}

// ============================================================================
// Subcommand Arguments
// ============================================================================

/// Arguments for `run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Crop configuration file.
    #[arg(short, long, env = "PHENOLOGY_CONFIG")]
    pub config: PathBuf,

    /// Daily schedule file.
    #[arg(short, long, env = "PHENOLOGY_SCHEDULE")]
    pub schedule: PathBuf,

    /// Write JSONL events to this file.
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Per-day output format.
    #[arg(short, long, default_value = "human")]
    pub output: OutputFormat,

    /// Write Prometheus metrics to this file after the run.
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `stages`.
#[derive(Args, Debug)]
pub struct StagesArgs {
    /// Crop configuration file.
    #[arg(short, long, env = "PHENOLOGY_CONFIG")]
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
