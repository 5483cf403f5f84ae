// src/cli.rs

use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Per-author line, commit and file counts from git blame", long_about = None)]
pub struct Args {
    /// Path to the git repository to analyze
    #[arg(long, default_value = ".")]
    pub repository: PathBuf,

    /// Revision whose tree is blamed
    #[arg(long, default_value = "HEAD")]
    pub revision: String,

    /// Column used to sort the table
    #[arg(long, value_enum, default_value_t = OrderBy::Lines)]
    pub order_by: OrderBy,

    /// Credit lines to the committer instead of the author
    #[arg(long)]
    pub use_committer: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Tabular)]
    pub format: Format,

    /// Only blame files with these extensions, e.g. `.rs,.go`
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Skip files matching any of these globs
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Only blame files matching at least one of these globs
    #[arg(long, value_delimiter = ',')]
    pub restrict_to: Vec<String>,

    /// Number of files blamed in parallel
    #[arg(short, long, default_value_t = default_jobs())]
    pub jobs: NonZeroUsize,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Log every git invocation to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Lines,
    Commits,
    Files,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Format {
    /// Aligned columns for the terminal
    Tabular,
    Csv,
    /// One JSON array
    Json,
    /// One JSON object per line
    JsonLines,
}

fn default_jobs() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}
