use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "trakt-gapfill",
    version,
    about = "Fill skipped episodes in your Trakt history with plausible watch times"
)]
pub struct Cli {
    /// Credentials file (KEY=VALUE lines)
    #[arg(long, global = true, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List shows with missing episodes without changing anything
    Scan,
    /// Select shows, preview the computed timestamps and submit them
    Fill(FillArgs),
}

#[derive(Debug, Default, Args)]
pub struct FillArgs {
    /// Selection to use instead of prompting, e.g. "1-3b 5e" or "allbe"
    #[arg(long, value_name = "TEXT")]
    pub select: Option<String>,

    /// Submit without asking for confirmation
    #[arg(long)]
    pub yes: bool,

    /// Stop after the preview
    #[arg(long)]
    pub dry_run: bool,
}
