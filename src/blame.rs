// src/blame.rs

//! Parser for `git blame --porcelain`.
//!
//! The output is a sequence of groups. A group starts with a four-field
//! header `<commit> <orig_line> <final_line> <lines>`; the remaining lines of
//! the group use a three-field header. The first time a commit appears its
//! header is followed by a metadata block that ends with a `filename` entry.
//! Every header is followed by the source line, prefixed with a tab.

use crate::error::BlameError;
use crate::model::{AuthorRecord, FileStats};
use std::collections::{HashMap, HashSet};
use std::iter::{Enumerate, Peekable};
use std::str::Lines;

/// Upper bound on the keyed lines between a group header and `filename`.
/// git prints at most eleven (author and committer quads, summary,
/// boundary, previous).
const MAX_METADATA_LINES: usize = 16;

/// Per-file parse state, dropped once the file is done
#[derive(Debug, Default)]
struct ParseState {
    /// commit -> display name, so metadata is read once per commit
    seen_commits: HashMap<String, String>,
    seen_authors: HashSet<String>,
}

struct Cursor<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
}

impl<'a> Cursor<'a> {
    fn new(output: &'a str) -> Self {
        Self {
            lines: output.lines().enumerate().peekable(),
        }
    }

    /// Next line together with its 1-based line number.
    fn next(&mut self) -> Option<(usize, &'a str)> {
        self.lines.next().map(|(idx, line)| (idx + 1, line))
    }

    fn skip_filename(&mut self) {
        if let Some((_, line)) = self.lines.peek() {
            if line.starts_with("filename ") {
                self.lines.next();
            }
        }
    }

    fn expect_content(&mut self, header_line: usize) -> Result<(), BlameError> {
        match self.next() {
            Some((_, line)) if line.starts_with('\t') => Ok(()),
            Some((line_no, _)) => Err(BlameError::MissingContent { line: line_no }),
            None => Err(BlameError::MissingContent { line: header_line + 1 }),
        }
    }

    /// Reads the metadata block of a commit seen for the first time and
    /// returns the selected identity.
    fn read_metadata(&mut self, header_line: usize, use_committer: bool) -> Result<String, BlameError> {
        let wanted = if use_committer { "committer" } else { "author" };
        let mut name = None;
        for _ in 0..=MAX_METADATA_LINES {
            let Some((line_no, line)) = self.next() else {
                break;
            };
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            if key == "filename" {
                return name.ok_or(BlameError::MissingIdentity {
                    line: header_line,
                    key: wanted,
                });
            }
            if line.starts_with('\t') {
                return Err(BlameError::MissingFilename { line: line_no });
            }
            if key == wanted {
                name = Some(value.to_string());
            }
        }
        Err(BlameError::MissingFilename { line: header_line })
    }
}

struct Header<'a> {
    commit: &'a str,
    group_lines: Option<usize>,
}

impl<'a> Header<'a> {
    fn parse(line_no: usize, line: &'a str) -> Result<Self, BlameError> {
        let malformed = || BlameError::MalformedHeader {
            line: line_no,
            header: line.to_string(),
        };
        let fields: Vec<&str> = line.split(' ').collect();
        if !(3..=4).contains(&fields.len()) {
            return Err(malformed());
        }
        let commit = fields[0];
        if commit.is_empty() || !commit.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(malformed());
        }
        let group_lines = match fields.get(3) {
            Some(count) => Some(count.parse::<usize>().map_err(|source| {
                BlameError::InvalidLineCount { line: line_no, source }
            })?),
            None => None,
        };
        Ok(Self { commit, group_lines })
    }
}

/// Turns the porcelain blame of one file into per-author line and commit
/// counts. `use_committer` selects the committer name instead of the author.
pub fn parse_porcelain(output: &str, use_committer: bool) -> Result<FileStats, BlameError> {
    let mut state = ParseState::default();
    let mut stats = FileStats::default();
    let mut cursor = Cursor::new(output);

    while let Some((line_no, line)) = cursor.next() {
        let header = Header::parse(line_no, line)?;
        let group_lines = header.group_lines.ok_or_else(|| BlameError::MalformedHeader {
            line: line_no,
            header: line.to_string(),
        })?;

        let name = match state.seen_commits.get(header.commit) {
            Some(name) => {
                // git repeats `filename` when a commit spans several paths
                cursor.skip_filename();
                name.clone()
            }
            None => {
                let name = cursor.read_metadata(line_no, use_committer)?;
                state
                    .seen_commits
                    .insert(header.commit.to_string(), name.clone());
                name
            }
        };
        cursor.expect_content(line_no)?;

        let record: &mut AuthorRecord = stats.authors.entry(name.clone()).or_default();
        record.commits.insert(header.commit.to_string());
        record.lines += group_lines;
        state.seen_authors.insert(name);

        let mut last_line = line_no;
        for _ in 1..group_lines {
            let (line_no, line) = cursor
                .next()
                .ok_or(BlameError::TruncatedGroup { line: last_line })?;
            let continuation = Header::parse(line_no, line)?;
            if continuation.group_lines.is_some() {
                return Err(BlameError::TruncatedGroup { line: line_no });
            }
            record.commits.insert(continuation.commit.to_string());
            cursor.skip_filename();
            cursor.expect_content(line_no)?;
            last_line = line_no;
        }
    }

    for name in &state.seen_authors {
        if let Some(record) = stats.authors.get_mut(name) {
            record.files += 1;
        }
    }
    Ok(stats)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::HashSet;
    use std::fmt::Write;

    pub fn sha(c: char) -> String {
        std::iter::repeat(c).take(40).collect()
    }

    /// Porcelain output for `groups` of `(commit, author, lines)`. The
    /// committer of every commit is "Integrator".
    pub fn porcelain(groups: &[(&str, &str, usize)]) -> String {
        let mut seen = HashSet::new();
        let mut out = String::new();
        let mut line = 1;
        for &(commit, author, count) in groups {
            writeln!(out, "{commit} {line} {line} {count}").unwrap();
            if seen.insert(commit) {
                writeln!(out, "author {author}").unwrap();
                writeln!(out, "author-mail <{}@example.com>", author.to_lowercase()).unwrap();
                writeln!(out, "author-time 1700000000").unwrap();
                writeln!(out, "author-tz +0000").unwrap();
                writeln!(out, "committer Integrator").unwrap();
                writeln!(out, "committer-mail <ci@example.com>").unwrap();
                writeln!(out, "committer-time 1700000000").unwrap();
                writeln!(out, "committer-tz +0000").unwrap();
                writeln!(out, "summary change by {author}").unwrap();
                writeln!(out, "filename src/lib.rs").unwrap();
            }
            writeln!(out, "\tline {line}").unwrap();
            for _ in 1..count {
                line += 1;
                writeln!(out, "{commit} {line} {line}").unwrap();
                writeln!(out, "\tline {line}").unwrap();
            }
            line += 1;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{porcelain, sha};
    use super::*;

    #[test]
    fn single_group_is_credited_to_its_author() {
        let c1 = sha('a');
        let stats = parse_porcelain(&porcelain(&[(&c1, "Alice", 3)]), false).unwrap();

        let alice = &stats.authors["Alice"];
        assert_eq!(alice.lines, 3);
        assert_eq!(alice.files, 1);
        assert_eq!(alice.commits, HashSet::from([c1]));
    }

    #[test]
    fn cached_commit_reuses_name_without_metadata() {
        let (c1, c2) = (sha('a'), sha('b'));
        let output = porcelain(&[(&c1, "Alice", 2), (&c2, "Bob", 1), (&c1, "Alice", 4)]);
        let stats = parse_porcelain(&output, false).unwrap();

        assert_eq!(stats.authors["Alice"].lines, 6);
        assert_eq!(stats.authors["Alice"].commits.len(), 1);
        assert_eq!(stats.authors["Bob"].lines, 1);
    }

    #[test]
    fn lines_are_conserved_across_authors() {
        let (c1, c2, c3) = (sha('1'), sha('2'), sha('3'));
        let output = porcelain(&[(&c1, "Alice", 5), (&c2, "Bob", 7), (&c3, "Alice", 1), (&c2, "Bob", 2)]);
        let stats = parse_porcelain(&output, false).unwrap();

        let source_lines = output.lines().filter(|line| line.starts_with('\t')).count();
        assert_eq!(stats.total_lines(), source_lines);
    }

    #[test]
    fn author_with_many_commits_touches_file_once() {
        let (c1, c2, c3) = (sha('1'), sha('2'), sha('3'));
        let output = porcelain(&[(&c1, "Alice", 1), (&c2, "Alice", 1), (&c3, "Alice", 1)]);
        let stats = parse_porcelain(&output, false).unwrap();

        assert_eq!(stats.authors["Alice"].files, 1);
        assert_eq!(stats.authors["Alice"].commits.len(), 3);
    }

    #[test]
    fn committer_flag_selects_committer_name() {
        let c1 = sha('a');
        let stats = parse_porcelain(&porcelain(&[(&c1, "Alice", 2)]), true).unwrap();

        assert_eq!(stats.authors.len(), 1);
        assert_eq!(stats.authors["Integrator"].lines, 2);
    }

    #[test]
    fn continuation_commits_join_the_group_author() {
        let (c1, c2) = (sha('a'), sha('b'));
        let output = format!(
            "{c1} 1 1 2\nauthor Alice\ncommitter Alice\nsummary s\nfilename f\n\tx\n{c2} 2 2\n\ty\n"
        );
        let stats = parse_porcelain(&output, false).unwrap();

        // no author is created for a commit only seen on a continuation line
        assert_eq!(stats.authors.len(), 1);
        let alice = &stats.authors["Alice"];
        assert_eq!(alice.lines, 2);
        assert_eq!(alice.files, 1);
        assert_eq!(alice.commits, HashSet::from([c1, c2]));
    }

    #[test]
    fn boundary_previous_and_repeated_filename_are_accepted() {
        let (c1, c2) = (sha('a'), sha('b'));
        let output = format!(
            "{c1} 1 1 1\nauthor Alice\nauthor-mail <a@x>\nauthor-time 1\nauthor-tz +0000\n\
             committer Alice\ncommitter-mail <a@x>\ncommitter-time 1\ncommitter-tz +0000\n\
             summary first\nboundary\nfilename old.rs\n\tone\n\
             {c2} 2 2 1\nauthor Bob\ncommitter Bob\nsummary second\nprevious {c1} old.rs\n\
             filename new.rs\n\ttwo\n\
             {c1} 3 3 1\nfilename old.rs\n\tthree\n"
        );
        let stats = parse_porcelain(&output, false).unwrap();

        assert_eq!(stats.authors["Alice"].lines, 2);
        assert_eq!(stats.authors["Bob"].lines, 1);
        assert_eq!(stats.total_lines(), 3);
    }

    #[test]
    fn empty_output_has_no_authors() {
        let stats = parse_porcelain("", false).unwrap();
        assert!(stats.authors.is_empty());
    }

    #[test]
    fn non_numeric_line_count_is_rejected() {
        let output = format!("{} 1 1 many\nauthor A\nfilename f\n\tx\n", sha('a'));
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::InvalidLineCount { line: 1, .. }));
    }

    #[test]
    fn metadata_without_filename_is_rejected() {
        let output = format!("{} 1 1 1\nauthor A\ncommitter A\nsummary s\n\tx\n", sha('a'));
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::MissingFilename { line: 5 }));
    }

    #[test]
    fn unbounded_metadata_is_rejected() {
        let mut output = format!("{} 1 1 1\n", sha('a'));
        for _ in 0..40 {
            output.push_str("summary filler\n");
        }
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::MissingFilename { line: 1 }));
    }

    #[test]
    fn missing_author_line_is_rejected() {
        let output = format!("{} 1 1 1\ncommitter C\nfilename f\n\tx\n", sha('a'));
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::MissingIdentity { key: "author", .. }));
    }

    #[test]
    fn truncated_group_is_rejected() {
        let output = format!("{} 1 1 3\nauthor A\nfilename f\n\tx\n", sha('a'));
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::TruncatedGroup { line: 1 }));
    }

    #[test]
    fn group_start_needs_a_line_count() {
        let output = format!("{} 1 1\n\tx\n", sha('a'));
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::MalformedHeader { line: 1, .. }));
    }

    #[test]
    fn header_without_source_line_is_rejected() {
        let c1 = sha('a');
        let output = format!("{c1} 1 1 1\nauthor A\nfilename f\n\tx\n{c1} 2 2 1\nstray\n");
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::MissingContent { line: 6 }));
    }

    #[test]
    fn continuation_at_end_of_output_is_rejected() {
        let c1 = sha('a');
        let output = format!("{c1} 1 1 2\nauthor A\nfilename f\n\tx\n{c1} 2 2\n");
        let err = parse_porcelain(&output, false).unwrap_err();
        assert!(matches!(err, BlameError::MissingContent { line: 6 }));
    }
}
