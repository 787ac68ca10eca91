//! Nested source/destination scope tracking during file selection.
//!
//! A scope pairs a source subdirectory with a destination subdirectory.
//! Scopes nest: the current resolved source and destination are the joins
//! of every frame on the stack, root to top. Pops must exactly balance
//! pushes; an unmatched pop means the selection code is broken and the
//! build must not continue.

use std::path::{Path, PathBuf};

use crate::error::{PackageError, Result};

/// One nested (source, dest) scope frame.
#[derive(Debug, Clone)]
struct ScopeFrame {
    source: PathBuf,
    dest: PathBuf,
}

/// Outcome of entering a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The source directory exists; the caller should run its body.
    Entered,
    /// The source directory is absent and the caller asked to tolerate
    /// that; the caller should skip its body but still pop.
    AbsentSource,
}

/// LIFO stack of scope frames over a fixed (source root, dest root) pair.
#[derive(Debug)]
pub struct PrefixStack {
    source_root: PathBuf,
    dest_root: PathBuf,
    frames: Vec<ScopeFrame>,
}

impl PrefixStack {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            dest_root: dest_root.into(),
            frames: Vec::new(),
        }
    }

    /// Enter a nested scope.
    ///
    /// Extends the current source path by `source_subdir` and the current
    /// destination path by `dest_subdir`. If the resulting source directory
    /// does not exist, fails unless `tolerate_absent_source` is set, in
    /// which case the caller gets [`Scope::AbsentSource`] and is expected
    /// to skip the scope body.
    pub fn push(
        &mut self,
        source_subdir: impl AsRef<Path>,
        dest_subdir: impl AsRef<Path>,
        tolerate_absent_source: bool,
    ) -> Result<Scope> {
        let frame = ScopeFrame {
            source: source_subdir.as_ref().to_path_buf(),
            dest: dest_subdir.as_ref().to_path_buf(),
        };
        self.frames.push(frame);

        let source = self.current_source();
        if source.is_dir() {
            Ok(Scope::Entered)
        } else if tolerate_absent_source {
            Ok(Scope::AbsentSource)
        } else {
            let detail = format!(
                "mandatory source directory {} does not exist",
                source.display()
            );
            self.frames.pop();
            Err(PackageError::scope(detail))
        }
    }

    /// Leave the innermost scope.
    pub fn pop(&mut self) -> Result<()> {
        match self.frames.pop() {
            Some(_) => Ok(()),
            None => Err(PackageError::scope("pop without matching push")),
        }
    }

    /// Resolved source directory of the active stack.
    ///
    /// Computed on every call rather than cached, so sibling scopes can be
    /// opened and closed repeatedly without cross-contamination.
    pub fn current_source(&self) -> PathBuf {
        self.frames
            .iter()
            .fold(self.source_root.clone(), |p, f| p.join(&f.source))
    }

    /// Resolved destination directory of the active stack.
    pub fn current_dest(&self) -> PathBuf {
        self.frames
            .iter()
            .fold(self.dest_root.clone(), |p, f| p.join(&f.dest))
    }

    /// Current nesting depth. Callers use this to assert balance.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
