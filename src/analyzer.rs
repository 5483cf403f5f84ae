// src/analyzer.rs

use crate::blame;
use crate::error::AnalyzeError;
use crate::git::{CancelFlag, Vcs};
use crate::model::{AuthorStats, AuthorTable, FileStats};
use crate::progress::ProgressSink;
use crossbeam_channel::{Receiver, Sender};
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

/// Run-wide settings shared by every worker
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Credit lines to the committer instead of the author
    pub use_committer: bool,
    /// Number of worker threads, at least 1
    pub jobs: usize,
}

type FileResult = Result<FileStats, AnalyzeError>;

/// Blames every file in `files` on a pool of `options.jobs` workers and
/// folds the per-file results into per-author totals.
///
/// The first failing file aborts the run: in-flight git processes are
/// killed and nothing merged so far is returned.
pub fn analyze<V, P>(
    vcs: &V,
    files: &[String],
    options: &AnalyzeOptions,
    progress: &P,
) -> Result<Vec<AuthorStats>, AnalyzeError>
where
    V: Vcs + ?Sized,
    P: ProgressSink + ?Sized,
{
    if options.jobs == 0 {
        return Err(AnalyzeError::InvalidJobs);
    }
    let mut table = AuthorTable::default();
    if files.is_empty() {
        return Ok(table.finalize());
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.jobs)
        .thread_name(|idx| format!("blame-worker-{idx}"))
        .build()?;

    let (task_tx, task_rx) = crossbeam_channel::unbounded::<&str>();
    for file in files {
        task_tx
            .send(file.as_str())
            .map_err(|_| AnalyzeError::WorkerLost)?;
    }
    drop(task_tx);

    // One slot per file, so a worker never waits on the merge loop
    let (result_tx, result_rx) = crossbeam_channel::bounded::<FileResult>(files.len());
    let cancel = CancelFlag::new();
    info!(files = files.len(), jobs = options.jobs, "starting blame");

    pool.in_place_scope(|scope| {
        for _ in 0..options.jobs {
            let tasks = task_rx.clone();
            let results = result_tx.clone();
            let cancel = &cancel;
            scope.spawn(move |_| run_worker(vcs, options, &tasks, &results, cancel));
        }
        drop(result_tx);
        merge_results(&result_rx, files.len(), &mut table, progress, &cancel)
    })?;

    info!(authors = table.len(), "blame finished");
    Ok(table.finalize())
}

fn run_worker<V: Vcs + ?Sized>(
    vcs: &V,
    options: &AnalyzeOptions,
    tasks: &Receiver<&str>,
    results: &Sender<FileResult>,
    cancel: &CancelFlag,
) {
    for path in tasks.iter() {
        if cancel.is_cancelled() {
            break;
        }
        let result = process_file(vcs, path, options, cancel);
        let failed = result.is_err();
        if results.send(result).is_err() || failed {
            break;
        }
    }
}

/// The single place the author table is mutated. Consumes exactly `total`
/// results unless one of them is an error.
fn merge_results<P: ProgressSink + ?Sized>(
    results: &Receiver<FileResult>,
    total: usize,
    table: &mut AuthorTable,
    progress: &P,
    cancel: &CancelFlag,
) -> Result<(), AnalyzeError> {
    let mut last_percent = None;
    for processed in 1..=total {
        let stats = match results.recv() {
            Ok(Ok(stats)) => stats,
            Ok(Err(err)) => {
                warn!(error = %err, "aborting blame");
                cancel.cancel();
                return Err(err);
            }
            Err(_) => {
                cancel.cancel();
                return Err(AnalyzeError::WorkerLost);
            }
        };
        table.merge(stats);

        let percent = (processed * 100 / total) as u64;
        if last_percent != Some(percent) {
            progress.update_progress(percent);
            last_percent = Some(percent);
        }
    }
    Ok(())
}

/// Blames one file, falling back to its last log entry when the file has no
/// attributable lines.
pub fn process_file<V: Vcs + ?Sized>(
    vcs: &V,
    path: &str,
    options: &AnalyzeOptions,
    cancel: &CancelFlag,
) -> Result<FileStats, AnalyzeError> {
    let output = vcs.blame(path, cancel).map_err(|source| AnalyzeError::Git {
        path: path.to_string(),
        source,
    })?;
    if output.is_empty() {
        debug!(path, "no blame output, using last commit");
        return fallback_stats(vcs, path, options, cancel);
    }
    let stats = blame::parse_porcelain(&output, options.use_committer).map_err(|source| {
        AnalyzeError::Blame {
            path: path.to_string(),
            source,
        }
    })?;
    debug!(path, authors = stats.authors.len(), lines = stats.total_lines(), "blamed");
    Ok(stats)
}

fn fallback_stats<V: Vcs + ?Sized>(
    vcs: &V,
    path: &str,
    options: &AnalyzeOptions,
    cancel: &CancelFlag,
) -> Result<FileStats, AnalyzeError> {
    let last = vcs
        .last_commit(path, cancel)
        .map_err(|source| AnalyzeError::Git {
            path: path.to_string(),
            source,
        })?;
    let name = last.name(options.use_committer).to_string();
    Ok(FileStats::untouched(name, last.hash))
}
