use clap::{Args, Parser, Subcommand};
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commentlens")]
#[command(about = "YouTube comment fetcher and LLM insight analyzer")]
#[command(version = "0.1.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub overrides: Overrides,

    /// Log debug output (raw agent answers, state changes)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download all top-level comments of a video into the comments file
    Fetch {
        /// YouTube video URL or video ID
        video: String,
    },

    /// Analyze the comments file and write the merged report
    Analyze,

    /// Fetch comments, then analyze them
    Run {
        /// YouTube video URL or video ID
        video: String,
    },

    /// Rebuild the final report from stored chunk results without calling the model
    Merge,

    /// Print per-theme insight counts of the final report
    Show,
}

/// Command line values that take precedence over the environment.
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// Comments file (JSON array of strings)
    #[arg(long, global = true, value_name = "PATH")]
    pub comments: Option<PathBuf>,

    /// Raw per-chunk results file
    #[arg(long, global = true, value_name = "PATH")]
    pub raw_results: Option<PathBuf>,

    /// Final merged report file
    #[arg(long, global = true, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Comments per agent invocation
    #[arg(long, global = true)]
    pub chunk_size: Option<NonZeroUsize>,

    /// Model identifier
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Maximum model turns per invocation
    #[arg(long, global = true)]
    pub max_iter: Option<u32>,

    /// Maximum agent requests per minute
    #[arg(long, global = true)]
    pub max_rpm: Option<u32>,

    /// Per-invocation timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}
