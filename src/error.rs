// src/error.rs

use std::io;
use std::num::ParseIntError;
use std::process::ExitStatus;
use thiserror::Error;

/// Structural problems in `git blame --porcelain` output.
#[derive(Debug, Error)]
pub enum BlameError {
    #[error("line {line}: malformed group header '{header}'")]
    MalformedHeader { line: usize, header: String },

    #[error("line {line}: invalid group line count")]
    InvalidLineCount {
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("line {line}: commit metadata has no 'filename' entry")]
    MissingFilename { line: usize },

    #[error("line {line}: commit metadata has no '{key}' entry")]
    MissingIdentity { line: usize, key: &'static str },

    #[error("line {line}: expected a tab-prefixed source line")]
    MissingContent { line: usize },

    #[error("line {line}: group ends before its announced line count")]
    TruncatedGroup { line: usize },
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while running `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("`{command}` was cancelled")]
    Cancelled { command: String },

    #[error("unexpected output from `{command}`")]
    UnexpectedOutput { command: String },

    #[error("repository error: {0}")]
    Repository(#[from] git2::Error),
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("failed to parse blame output for '{path}'")]
    Blame {
        path: String,
        #[source]
        source: BlameError,
    },

    #[error("git query for '{path}' failed")]
    Git {
        path: String,
        #[source]
        source: GitError,
    },

    #[error("worker pool size must be at least 1")]
    InvalidJobs,

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("a worker exited before all files were processed")]
    WorkerLost,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
