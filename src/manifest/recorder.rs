//! Append-only log of every file and symlink placed into the package.
//!
//! The manifest is the single source of truth for what the package
//! contains: installer script derivation and package finishing both read
//! it. Entries are immutable once appended and insertion order is
//! preserved. Duplicate destinations are legal; physical copies are
//! last-wins, and script derivation collapses duplicates itself.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What kind of placement an entry records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Symlink { target: PathBuf },
}

/// One recorded placement. `dest` is relative to the package root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source: PathBuf,
    pub dest: PathBuf,
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// Ordered, append-only placement log for one build invocation.
#[derive(Debug, Default)]
pub struct ManifestRecorder {
    entries: Vec<ManifestEntry>,
    seen: HashSet<ManifestEntry>,
}

impl ManifestRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a placement entry.
    ///
    /// Returns true if this exact (source, dest, kind) triple has never
    /// been recorded before in this recorder's lifetime. Callers use the
    /// return value to notice whether an optional resource actually
    /// matched, without turning absence into an error.
    pub fn record(
        &mut self,
        source: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        kind: EntryKind,
    ) -> bool {
        let entry = ManifestEntry {
            source: source.into(),
            dest: dest.into(),
            kind,
        };
        let first = self.seen.insert(entry.clone());
        self.entries.push(entry);
        first
    }

    /// All entries recorded at or after `since`.
    ///
    /// Take `len()` before a speculative selection attempt, then snapshot
    /// from that index afterwards to learn exactly which destinations
    /// resulted.
    pub fn snapshot(&self, since: usize) -> &[ManifestEntry] {
        &self.entries[since.min(self.entries.len())..]
    }

    /// Full entry list, in insertion order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the manifest to pretty JSON, for a sidecar dump next to
    /// the finished package.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}

/// Every strict ancestor of `path`, nearest first, excluding the root
/// (empty) component.
pub fn path_ancestors(path: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut current = path;
    while let Some(parent) = current.parent() {
        if parent.as_os_str().is_empty() {
            break;
        }
        out.push(parent.to_path_buf());
        current = parent;
    }
    out
}
