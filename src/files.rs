// src/files.rs

use crate::error::GitError;
use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Lists every blob path in the tree of `revision`, sorted.
pub fn list_files(repo: &Repository, revision: &str) -> Result<Vec<String>, GitError> {
    let tree = repo.revparse_single(revision)?.peel_to_tree()?;
    let mut files = Vec::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            if let Some(name) = entry.name() {
                files.push(format!("{root}{name}"));
            }
        }
        TreeWalkResult::Ok
    })?;
    files.sort();
    Ok(files)
}

/// Path selection applied before blaming
#[derive(Debug, Default)]
pub struct FileFilter {
    extensions: Vec<String>,
    exclude: Option<GlobSet>,
    restrict: Option<GlobSet>,
}

impl FileFilter {
    /// `extensions` may be given with or without the leading dot. Globs use
    /// shell semantics: `*` does not cross `/`.
    pub fn new(
        extensions: &[String],
        exclude: &[String],
        restrict: &[String],
    ) -> Result<Self, globset::Error> {
        Ok(Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .filter(|ext| !ext.is_empty())
                .collect(),
            exclude: build_globs(exclude)?,
            restrict: build_globs(restrict)?,
        })
    }

    pub fn matches(&self, path: &str) -> bool {
        if !self.extensions.is_empty() {
            let ext = Path::new(path).extension().and_then(|ext| ext.to_str());
            if !ext.is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext)) {
                return false;
            }
        }
        if self.exclude.as_ref().is_some_and(|set| set.is_match(path)) {
            return false;
        }
        self.restrict.as_ref().map_or(true, |set| set.is_match(path))
    }

    pub fn apply(&self, files: Vec<String>) -> Vec<String> {
        files.into_iter().filter(|path| self.matches(path)).collect()
    }
}

fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    builder.build().map(Some)
}
