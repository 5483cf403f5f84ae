// src/model.rs

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A commit hash as printed by git
pub type CommitId = String;

/// Per-author accumulator, scoped to one file or to the whole run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorRecord {
    pub lines: usize,
    /// Distinct files in which the author owns at least one line
    pub files: usize,
    pub commits: HashSet<CommitId>,
}

impl AuthorRecord {
    fn absorb(&mut self, other: AuthorRecord) {
        self.lines += other.lines;
        self.files += other.files;
        self.commits.extend(other.commits);
    }
}

/// Blame result of a single file, keyed by author name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub authors: HashMap<String, AuthorRecord>,
}

impl FileStats {
    /// A file credited to one author without any owned lines.
    pub fn untouched(name: String, commit: CommitId) -> Self {
        let record = AuthorRecord {
            lines: 0,
            files: 1,
            commits: HashSet::from([commit]),
        };
        Self {
            authors: HashMap::from([(name, record)]),
        }
    }

    pub fn total_lines(&self) -> usize {
        self.authors.values().map(|record| record.lines).sum()
    }
}

/// Repository-wide totals, filled by the merge loop only
#[derive(Debug, Default)]
pub struct AuthorTable {
    authors: HashMap<String, AuthorRecord>,
}

impl AuthorTable {
    pub fn merge(&mut self, file: FileStats) {
        for (name, record) in file.authors {
            match self.authors.get_mut(&name) {
                Some(existing) => existing.absorb(record),
                None => {
                    self.authors.insert(name, record);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    /// Collapses commit sets into counts. Output is ordered by name.
    pub fn finalize(self) -> Vec<AuthorStats> {
        let mut stats: Vec<AuthorStats> = self
            .authors
            .into_iter()
            .map(|(name, record)| AuthorStats {
                name,
                lines: record.lines,
                commits: record.commits.len(),
                files: record.files,
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}

/// Final row handed to the report stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorStats {
    pub name: String,
    pub lines: usize,
    pub commits: usize,
    pub files: usize,
}
