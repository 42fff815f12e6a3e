//! Excluded path prefixes.
//!
//! An exclusion covers the path itself and everything below it, never the
//! paths above it. Keys are expected to be normalized absolute paths (see
//! [`crate::fsutil::normalize_path`]); comparison is purely lexical.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub excluded_at: DateTime<Utc>,
}

/// Which exclusion entry covers a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionMatch {
    /// The path itself is excluded.
    Itself(PathBuf),
    /// The nearest excluded ancestor.
    Ancestor(PathBuf),
}

impl ExclusionMatch {
    pub fn blocking_path(&self) -> &Path {
        match self {
            ExclusionMatch::Itself(p) | ExclusionMatch::Ancestor(p) => p,
        }
    }
}

/// Set of excluded paths in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionIndex {
    entries: IndexMap<PathBuf, Exclusion>,
}

impl ExclusionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff `path` equals or descends from any excluded path.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluding_ancestor(path).is_some()
    }

    /// The nearest exclusion covering `path`; a self-match wins over any ancestor.
    pub fn excluding_ancestor(&self, path: &Path) -> Option<ExclusionMatch> {
        path.ancestors()
            .find(|candidate| self.entries.contains_key(*candidate))
            .map(|found| {
                if found == path {
                    ExclusionMatch::Itself(found.to_path_buf())
                } else {
                    ExclusionMatch::Ancestor(found.to_path_buf())
                }
            })
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Add an exclusion. Returns false if the path was already excluded (the
    /// original timestamp is kept).
    pub fn add(&mut self, path: PathBuf, at: DateTime<Utc>) -> bool {
        if self.entries.contains_key(&path) {
            return false;
        }
        self.entries.insert(path, Exclusion { excluded_at: at });
        true
    }

    /// Remove an exclusion. Returns whether an entry existed.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.entries.shift_remove(path).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Exclusion)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
