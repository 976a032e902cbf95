use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ccsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Keep Copilot seat holders in the right GitHub Enterprise cost center",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to <config dir>/config.toml)
    #[arg(long, global = true, env = "CCSYNC_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Assign Copilot users to cost centers
    Assign(AssignArgs),

    /// Inspect the Copilot seat roster
    #[command(subcommand)]
    Users(UsersCommand),

    /// Inspect or reset the incremental watermark
    #[command(subcommand)]
    Watermark(WatermarkCommand),

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Assign
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeArg {
    /// Show what would change
    #[default]
    Plan,
    /// Apply the assignments
    Apply,
}

impl From<ModeArg> for assignment::Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Plan => Self::Plan,
            ModeArg::Apply => Self::Apply,
        }
    }
}

#[derive(Debug, Args)]
pub struct AssignArgs {
    /// Plan only, or plan and apply
    #[arg(long, value_enum, default_value_t = ModeArg::Plan)]
    pub mode: ModeArg,

    /// Apply without the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Only process seats created since the last successful run
    #[arg(long)]
    pub incremental: bool,

    /// Only process these users (comma-separated)
    #[arg(long, value_delimiter = ',', value_name = "USERS")]
    pub users: Option<Vec<String>>,

    /// Create missing cost centers
    #[arg(long)]
    pub create_cost_centers: bool,

    /// Print a per-cost-center report with links after the run
    #[arg(long)]
    pub summary_report: bool,
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List seat holders and their target cost center
    List {
        /// Only list these users (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "USERS")]
        users: Option<Vec<String>>,

        /// Only list seats created since the last successful run
        #[arg(long)]
        incremental: bool,
    },
}

// ============================================================================
// Watermark
// ============================================================================

#[derive(Debug, Subcommand)]
pub enum WatermarkCommand {
    /// Show the stored watermark
    Show,

    /// Delete the watermark so the next incremental run is a full run
    Clear,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write an example config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,
}

/// Trim `--users` entries and drop empty ones; an empty result means no filter
pub fn requested_users(users: Option<Vec<String>>) -> Option<Vec<String>> {
    let users: Vec<String> = users?
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    (!users.is_empty()).then_some(users)
}
