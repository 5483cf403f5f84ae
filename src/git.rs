// src/git.rs

use crate::error::GitError;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// First wait between exit checks on a running git process
const MIN_POLL_INTERVAL: Duration = Duration::from_micros(50);

/// Longest wait between exit and cancellation checks
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Shared abort signal, set once by the merge loop on the first error
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Most recent history entry of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastCommit {
    pub author: String,
    pub committer: String,
    pub hash: String,
}

impl LastCommit {
    pub fn name(&self, use_committer: bool) -> &str {
        if use_committer {
            &self.committer
        } else {
            &self.author
        }
    }
}

/// The two history queries the analyzer needs, per file.
pub trait Vcs: Sync {
    /// Raw `git blame --porcelain` output; empty for a file without lines.
    fn blame(&self, path: &str, cancel: &CancelFlag) -> Result<String, GitError>;

    fn last_commit(&self, path: &str, cancel: &CancelFlag) -> Result<LastCommit, GitError>;
}

/// `Vcs` backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
    revision: String,
}

impl GitCli {
    pub fn new(workdir: impl Into<PathBuf>, revision: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            revision: revision.into(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn run(&self, args: &[&str], cancel: &CancelFlag) -> Result<String, GitError> {
        let command = format!("git {}", args.join(" "));
        debug!(%command, "running");

        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| GitError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout, stderr, status) = thread::scope(|scope| {
            let out = scope.spawn(move || read_all(stdout));
            let err = scope.spawn(move || read_all(stderr));
            let status = wait_or_kill(&mut child, cancel);
            (join_reader(out), join_reader(err), status)
        });
        let io_error = |source| GitError::Io {
            command: command.clone(),
            source,
        };

        let Some(status) = status.map_err(io_error)? else {
            return Err(GitError::Cancelled { command });
        };
        let stdout = stdout.map_err(io_error)?;
        let stderr = stderr.map_err(io_error)?;
        if !status.success() {
            return Err(GitError::Failed {
                command,
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }
}

impl Vcs for GitCli {
    fn blame(&self, path: &str, cancel: &CancelFlag) -> Result<String, GitError> {
        self.run(&["blame", "--porcelain", self.revision.as_str(), "--", path], cancel)
    }

    fn last_commit(&self, path: &str, cancel: &CancelFlag) -> Result<LastCommit, GitError> {
        let args = [
            "log",
            self.revision.as_str(),
            "--max-count=1",
            "--pretty=format:%an%n%cn%n%H",
            "--",
            path,
        ];
        let output = self.run(&args, cancel)?;
        parse_last_commit(&output).ok_or_else(|| GitError::UnexpectedOutput {
            command: format!("git {}", args.join(" ")),
        })
    }
}

/// Parses the `%an%n%cn%n%H` log format.
fn parse_last_commit(output: &str) -> Option<LastCommit> {
    let mut lines = output.lines();
    let author = lines.next()?;
    let committer = lines.next()?;
    let hash = lines.next()?.trim();
    if hash.is_empty() {
        return None;
    }
    Some(LastCommit {
        author: author.to_string(),
        committer: committer.to_string(),
        hash: hash.to_string(),
    })
}

fn read_all<R: Read>(pipe: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf)?;
    }
    Ok(buf)
}

fn join_reader(handle: thread::ScopedJoinHandle<'_, io::Result<Vec<u8>>>) -> io::Result<Vec<u8>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("pipe reader panicked")))
}

/// Waits for `child`, killing it if `cancel` is raised first. `None` means
/// the process was killed.
fn wait_or_kill(child: &mut Child, cancel: &CancelFlag) -> io::Result<Option<ExitStatus>> {
    let mut delay = MIN_POLL_INTERVAL;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if cancel.is_cancelled() {
            // already exited between the two checks is fine
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(delay);
        delay = next_poll_interval(delay);
    }
}

/// Short git calls finish within the first few polls; long ones settle at
/// `MAX_POLL_INTERVAL`.
fn next_poll_interval(delay: Duration) -> Duration {
    (delay * 2).min(MAX_POLL_INTERVAL)
}
