// src/main.rs

mod analyzer;
mod blame;
mod cli;
mod error;
mod files;
mod git;
mod model;
mod progress;
mod report;

use analyzer::AnalyzeOptions;
use anyhow::Context;
use clap::Parser;
use cli::Args;
use files::FileFilter;
use git::GitCli;
use indicatif::{ProgressBar, ProgressStyle};
use progress::{NoProgress, ProgressSink};
use std::io;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let bar = if args.no_progress {
        None
    } else {
        Some(new_progress_bar()?)
    };
    let sink: &dyn ProgressSink = match &bar {
        Some(bar) => bar,
        None => &NoProgress,
    };

    let result = run(&args, sink);
    if let Some(bar) = &bar {
        bar.finish_and_clear();
    }
    let stats = result?;

    let stdout = io::stdout();
    report::render(&stats, args.format, &mut stdout.lock()).context("failed to print results")?;
    Ok(())
}

fn run(args: &Args, progress: &dyn ProgressSink) -> anyhow::Result<Vec<model::AuthorStats>> {
    let start_time = Instant::now();

    progress.send_message("Loading files...");
    let repo = git2::Repository::discover(&args.repository)
        .with_context(|| format!("no git repository at {}", args.repository.display()))?;
    let workdir = repo
        .workdir()
        .context("bare repositories are not supported")?
        .to_path_buf();
    let files = files::list_files(&repo, &args.revision)
        .with_context(|| format!("failed to list files at revision '{}'", args.revision))?;

    progress.send_message("Filtering...");
    let filter = FileFilter::new(&args.extensions, &args.exclude, &args.restrict_to)
        .context("invalid glob pattern")?;
    let total = files.len();
    let files = filter.apply(files);
    info!(selected = files.len(), total, "files selected");

    progress.send_message("Looking for commits...");
    let git = GitCli::new(workdir, args.revision.clone());
    info!(workdir = %git.workdir().display(), revision = %args.revision, "blaming");
    let options = AnalyzeOptions {
        use_committer: args.use_committer,
        jobs: args.jobs.get(),
    };
    let mut stats = analyzer::analyze(&git, &files, &options, progress)?;

    progress.send_message("Preparing output...");
    report::sort_stats(&mut stats, args.order_by);
    info!(authors = stats.len(), elapsed = ?start_time.elapsed(), "analysis finished");
    Ok(stats)
}

fn new_progress_bar() -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new(100);
    bar.set_style(ProgressStyle::with_template("{msg:24} [{bar:40}] {pos:>3}%")?.progress_chars("=> "));
    Ok(bar)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
