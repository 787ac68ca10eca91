//! The assembler: drives file selection into the staged package.
//!
//! Owns the scope stack, the manifest recorder, and the symlink resolver
//! for one build invocation. Selection code opens nested scopes, places
//! files with [`Assembler::path`], and wires relocatable symlinks; every
//! placement lands in the manifest, which the installer and finishing
//! stages consume afterwards.

pub mod plan;
pub mod select;

use std::path::{Path, PathBuf};

use crate::error::{PackageError, Result};
use crate::manifest::{
    compute_relative, EntryKind, LinkStatus, ManifestRecorder, PrefixStack, Scope, SymlinkResolver,
};

pub use plan::PackagePlan;

pub struct Assembler {
    stack: PrefixStack,
    recorder: ManifestRecorder,
    resolver: SymlinkResolver,
    dest_root: PathBuf,
}

impl Assembler {
    pub fn new(source_root: impl Into<PathBuf>, dest_root: impl Into<PathBuf>) -> Self {
        let dest_root = dest_root.into();
        Self {
            stack: PrefixStack::new(source_root, dest_root.clone()),
            recorder: ManifestRecorder::new(),
            resolver: SymlinkResolver::new(dest_root.clone()),
            dest_root,
        }
    }

    /// Run `body` inside a nested (source, dest) scope.
    ///
    /// The scope is popped on every exit path, so stack depth at return
    /// always equals stack depth at entry. When `optional` is set and the
    /// source directory is absent, the body is skipped and the call
    /// succeeds.
    pub fn scoped(
        &mut self,
        src: impl AsRef<Path>,
        dst: impl AsRef<Path>,
        optional: bool,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let scope = self.stack.push(src, dst, optional)?;
        let result = match scope {
            Scope::Entered => body(self),
            Scope::AbsentSource => {
                println!("  skipping absent source {}", self.stack.current_source().display());
                Ok(())
            }
        };
        self.stack.pop()?;
        result
    }

    /// Select files matching `pattern` under the current source scope and
    /// copy them into the current destination scope.
    ///
    /// `dst` renames the match (single-match patterns only); by default
    /// each match keeps its own name. Directory matches are copied
    /// recursively. A mandatory pattern with no matches is an error;
    /// use [`Assembler::path_optional`] for speculative selection.
    ///
    /// Returns the number of files placed.
    pub fn path(&mut self, pattern: &str, dst: Option<&str>) -> Result<usize> {
        let matches = select::find_matches(&self.stack.current_source(), pattern);
        if matches.is_empty() {
            return Err(PackageError::scope(format!(
                "no files matched mandatory pattern '{}' under {}",
                pattern,
                self.stack.current_source().display()
            )));
        }
        if matches.len() > 1 && dst.is_some() {
            return Err(PackageError::consistency(format!(
                "pattern '{pattern}' matched {} files but a single rename \
                 destination was given",
                matches.len()
            )));
        }

        let dest_dir = self.stack.current_dest();
        let mut placed = 0;
        for m in &matches {
            let name: PathBuf = match dst {
                Some(d) => PathBuf::from(d),
                None => PathBuf::from(m.file_name().ok_or_else(|| {
                    PackageError::consistency(format!("match {} has no file name", m.display()))
                })?),
            };
            let target = dest_dir.join(&name);
            if m.is_dir() {
                for (src_file, dst_file) in select::copy_tree(m, &target)? {
                    self.record_file(&src_file, &dst_file);
                    placed += 1;
                }
            } else {
                select::copy_file(m, &target)?;
                self.record_file(m, &target);
                placed += 1;
            }
        }
        Ok(placed)
    }

    /// Speculative selection: like [`Assembler::path`] but an empty match
    /// set is not an error. Returns the package-relative destinations that
    /// actually resulted, via a snapshot diff of the manifest.
    pub fn path_optional(&mut self, pattern: &str, dst: Option<&str>) -> Result<Vec<PathBuf>> {
        let mark = self.recorder.len();
        match self.path(pattern, dst) {
            Ok(_) => {}
            Err(PackageError::Scope(_)) => {
                println!("  skipping '{pattern}' (no matches)");
            }
            Err(other) => return Err(other),
        }
        Ok(self
            .recorder
            .snapshot(mark)
            .iter()
            .map(|e| e.dest.clone())
            .collect())
    }

    /// Place a basename from an out-of-scope directory, keeping its name.
    pub fn path_from(&mut self, dir: &Path, name: &str) -> Result<usize> {
        let src = dir.join(name);
        if !src.exists() {
            return Err(PackageError::scope(format!(
                "mandatory file {} does not exist",
                src.display()
            )));
        }
        let target = self.stack.current_dest().join(name);
        if src.is_dir() {
            let mut placed = 0;
            for (s, d) in select::copy_tree(&src, &target)? {
                self.record_file(&s, &d);
                placed += 1;
            }
            Ok(placed)
        } else {
            select::copy_file(&src, &target)?;
            self.record_file(&src, &target);
            Ok(1)
        }
    }

    /// Create a symlink at `dest_rel` (relative to the current dest scope)
    /// pointing at the relative `target`.
    pub fn symlink(&mut self, target: &Path, dest_rel: &Path, critical: bool) -> Result<LinkStatus> {
        let dest = self.stack.current_dest().join(dest_rel);
        self.resolver
            .create(&mut self.recorder, target, &dest, critical)
    }

    /// Create a symlink at `dest_rel` whose target is computed as the
    /// relative offset from the link's directory to `source_abs`, so the
    /// result survives relocating the whole bundle.
    pub fn relative_symlink(
        &mut self,
        source_abs: &Path,
        dest_rel: &Path,
        critical: bool,
    ) -> Result<LinkStatus> {
        let dest = self.stack.current_dest().join(dest_rel);
        let dest_dir = dest.parent().ok_or_else(|| {
            PackageError::path(&dest, "symlink destination has no parent directory")
        })?;
        let target = compute_relative(source_abs, dest_dir, true)?;
        self.resolver
            .create(&mut self.recorder, &target, &dest, critical)
    }

    /// Replace every recorded symlink with a plain copy of its resolved
    /// target, for platforms whose package format has no symlink support.
    /// The copies are recorded as File entries so script derivation sees
    /// them. Returns the number of links materialized.
    pub fn materialize_symlinks(&mut self) -> Result<usize> {
        let links: Vec<PathBuf> = self
            .recorder
            .entries()
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::Symlink { .. }))
            .map(|e| e.dest.clone())
            .collect();

        let mut materialized = 0;
        for dest_rel in links {
            let dest = self.dest_root.join(&dest_rel);
            let meta = match std::fs::symlink_metadata(&dest) {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            if !meta.file_type().is_symlink() {
                continue;
            }
            let resolved = std::fs::canonicalize(&dest).map_err(|err| {
                PackageError::path(
                    &dest,
                    format!("cannot resolve symlink for materialization: {err}"),
                )
            })?;
            std::fs::remove_file(&dest)?;
            select::copy_file(&resolved, &dest)?;
            self.recorder
                .record(resolved, dest_rel, EntryKind::File);
            materialized += 1;
        }
        Ok(materialized)
    }

    /// Absolute staged path of a package-relative destination.
    pub fn dest_path_of(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dest_root.join(rel)
    }

    pub fn current_source(&self) -> PathBuf {
        self.stack.current_source()
    }

    pub fn current_dest(&self) -> PathBuf {
        self.stack.current_dest()
    }

    pub fn manifest(&self) -> &ManifestRecorder {
        &self.recorder
    }

    pub fn into_manifest(self) -> ManifestRecorder {
        self.recorder
    }

    fn record_file(&mut self, src: &Path, dst: &Path) {
        let rel = dst.strip_prefix(&self.dest_root).unwrap_or(dst);
        self.recorder
            .record(src.to_path_buf(), rel.to_path_buf(), EntryKind::File);
    }
}
