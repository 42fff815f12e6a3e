//! Change statistics for a working tree.
//!
//! [`gather`] asks git for the line-level diff of the working tree against
//! HEAD (or the empty tree in a repository without commits) and for the list
//! of untracked files, and reduces both into a [`ChangeStats`]. It never
//! modifies the repository.

use crate::error::{CommitwatchError, Result};
use crate::git::{Git, RepoOperation, EMPTY_TREE};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// How many leading bytes are inspected when deciding whether a file is binary.
const BINARY_SNIFF_LEN: usize = 8000;

/// Buffer size used when streaming untracked files for their line count.
const READ_CHUNK_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeKind {
    Modified,
    Added,
    Deleted,
    Binary,
    Untracked,
}

/// One changed file in the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub added: u64,
    pub deleted: u64,
    pub kind: FileChangeKind,
}

impl FileChange {
    fn weight(&self) -> u64 {
        self.added + self.deleted
    }
}

/// Snapshot of uncommitted edits in one directory. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeStats {
    pub lines_added: u64,
    pub lines_deleted: u64,
    /// Tracked files that differ from HEAD
    pub files_changed: u64,
    pub untracked_file_count: u64,
    /// Text lines in untracked files (binary files count zero)
    pub untracked_lines: u64,
    pub is_tracked_repo: bool,
    /// Merge/rebase/etc. that git is in the middle of
    #[serde(skip)]
    pub pending_operation: Option<RepoOperation>,
    pub files: Vec<FileChange>,
}

impl ChangeStats {
    /// Stats for a directory that is not inside a working tree.
    pub fn not_tracked() -> Self {
        Self::default()
    }

    pub fn total_changed_lines(&self) -> u64 {
        self.lines_added + self.lines_deleted
    }

    /// True when nothing differs from HEAD and there are no untracked files.
    pub fn is_clean(&self) -> bool {
        self.total_changed_lines() == 0 && self.files_changed == 0 && self.untracked_file_count == 0
    }

    /// Tracked changed files plus untracked files, i.e. everything a stage-all would pick up.
    pub fn affected_files(&self) -> u64 {
        self.files_changed + self.untracked_file_count
    }
}

/// Gather change statistics for `path`.
///
/// Fails with [`CommitwatchError::NotTracked`] if the directory is not inside
/// a git working tree.
pub fn gather(path: &Path) -> Result<ChangeStats> {
    gather_with(&Git::new(path))
}

/// Gather change statistics through an already configured [`Git`].
pub fn gather_with(git: &Git) -> Result<ChangeStats> {
    let dir = git.dir();
    if !dir.is_dir() {
        return Err(CommitwatchError::DirectoryNotFound(dir.to_path_buf()));
    }
    if !git.is_repo() {
        return Err(CommitwatchError::NotTracked(dir.to_path_buf()));
    }

    let base = if git.head_exists()? { "HEAD" } else { EMPTY_TREE };
    let kinds = parse_name_status(&git.diff_name_status(base)?);
    let mut files = parse_numstat(&git.diff_numstat(base)?, &kinds);

    let mut stats = ChangeStats {
        is_tracked_repo: true,
        pending_operation: git.pending_operation()?,
        ..ChangeStats::default()
    };

    for file in &files {
        stats.lines_added += file.added;
        stats.lines_deleted += file.deleted;
        stats.files_changed += 1;
    }

    for rel in git.untracked_files()? {
        let count = count_text_lines(&dir.join(&rel));
        stats.untracked_file_count += 1;
        stats.untracked_lines += count;
        files.push(FileChange {
            path: rel,
            added: count,
            deleted: 0,
            kind: FileChangeKind::Untracked,
        });
    }

    stats.files = files;
    debug!(
        dir = %dir.display(),
        added = stats.lines_added,
        deleted = stats.lines_deleted,
        files = stats.files_changed,
        untracked = stats.untracked_file_count,
        "gathered change stats"
    );
    Ok(stats)
}

/// Parse `git diff --name-status -z` into a path -> status letter map.
fn parse_name_status(output: &str) -> HashMap<String, char> {
    let mut kinds = HashMap::new();
    let mut fields = output.split('\0').filter(|s| !s.is_empty());
    while let (Some(status), Some(path)) = (fields.next(), fields.next()) {
        if let Some(letter) = status.chars().next() {
            kinds.insert(path.to_string(), letter);
        }
    }
    kinds
}

/// Parse `git diff --numstat -z` records of the form `added\tdeleted\tpath`.
///
/// Binary files report `-` for both counts; they are kept with zero lines.
fn parse_numstat(output: &str, kinds: &HashMap<String, char>) -> Vec<FileChange> {
    output
        .split('\0')
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let mut parts = record.splitn(3, '\t');
            let added = parts.next()?;
            let deleted = parts.next()?;
            let path = parts.next()?.trim_start_matches('\n').to_string();
            if path.is_empty() {
                return None;
            }

            let binary = added == "-" || deleted == "-";
            let added: u64 = if binary { 0 } else { added.parse().ok()? };
            let deleted: u64 = if binary { 0 } else { deleted.parse().ok()? };

            let kind = if binary {
                FileChangeKind::Binary
            } else {
                match kinds.get(&path) {
                    Some('A') => FileChangeKind::Added,
                    Some('D') => FileChangeKind::Deleted,
                    _ => FileChangeKind::Modified,
                }
            };

            Some(FileChange {
                path,
                added,
                deleted,
                kind,
            })
        })
        .collect()
}

/// Count lines in a text file. Binary or unreadable files count zero.
fn count_text_lines(path: &Path) -> u64 {
    match File::open(path).and_then(count_lines_in) {
        Ok(count) => count,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "skipping unreadable untracked file");
            0
        }
    }
}

/// Stream `reader`, counting lines with bounded memory. A NUL byte in the
/// first `BINARY_SNIFF_LEN` bytes marks the content as binary.
fn count_lines_in(reader: impl Read) -> io::Result<u64> {
    let mut reader = BufReader::with_capacity(READ_CHUNK_LEN, reader);

    let mut sniff = Vec::with_capacity(BINARY_SNIFF_LEN);
    (&mut reader)
        .take(BINARY_SNIFF_LEN as u64)
        .read_to_end(&mut sniff)?;
    if sniff.contains(&0) {
        return Ok(0);
    }

    let mut newlines = count_newlines(&sniff);
    let mut last = sniff.last().copied();
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        newlines += count_newlines(chunk);
        last = chunk.last().copied();
        let len = chunk.len();
        reader.consume(len);
    }

    Ok(match last {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    })
}

fn count_newlines(buf: &[u8]) -> u64 {
    buf.iter().filter(|&&b| b == b'\n').count() as u64
}

/// Summarize changed files for a commit title, largest changes first.
///
/// Produces entries like `src/a.rs (+10/-2)`, `notes.txt (+4)` and a
/// trailing `+N more files` when the list is truncated.
pub fn format_file_changes(files: &[FileChange], max_files: usize) -> String {
    if files.is_empty() {
        return "No file changes detected".to_string();
    }

    let mut sorted: Vec<&FileChange> = files.iter().collect();
    sorted.sort_by(|a, b| b.weight().cmp(&a.weight()));

    let mut parts: Vec<String> = sorted
        .iter()
        .take(max_files)
        .map(|f| match f.kind {
            FileChangeKind::Untracked | FileChangeKind::Added => format!("{} (+{})", f.path, f.added),
            FileChangeKind::Deleted => format!("{} (-{})", f.path, f.deleted),
            FileChangeKind::Binary => format!("{} (binary)", f.path),
            FileChangeKind::Modified if f.added > 0 && f.deleted > 0 => {
                format!("{} (+{}/-{})", f.path, f.added, f.deleted)
            }
            FileChangeKind::Modified if f.added > 0 => format!("{} (~{})", f.path, f.added),
            FileChangeKind::Modified if f.deleted > 0 => format!("{} (-{})", f.path, f.deleted),
            FileChangeKind::Modified => format!("{} (modified)", f.path),
        })
        .collect();

    if files.len() > max_files {
        parts.push(format!("+{} more files", files.len() - max_files));
    }
    parts.join(", ")
}
