use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML config (see `example_config.yml`).
    #[arg(long, global = true, default_value = "config.yml")]
    pub config: String,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Screenshot every page of the configured chapter range to disk.
    Download(DownloadArgs),
    /// Print the resolved chapter range without downloading anything.
    Chapters,
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Run every step but skip creating directories and writing pages.
    #[arg(long)]
    pub dry_run: bool,
}
