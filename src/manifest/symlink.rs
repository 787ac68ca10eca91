//! Idempotent symlink reconciliation for relocatable bundles.
//!
//! Package-internal symlinks must carry relative targets: an absolute
//! target would bake a build-host path into an artifact that has to
//! survive being moved as a unit. Creation is reconciling rather than
//! blind: a link that already points at the requested target is left
//! completely untouched, and stale state from a previous run (wrong link,
//! plain file, whole directory) is removed and replaced.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{PackageError, Result};
use crate::manifest::recorder::{EntryKind, ManifestRecorder};

/// What `create` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Fresh link created at an absent destination.
    Created,
    /// Destination already held the requested link; nothing was touched.
    AlreadyCorrect,
    /// Stale destination state (wrong link, file, or directory) was
    /// removed and the link recreated.
    Replaced,
    /// Creation failed but the caller marked the link optional; the
    /// failure was reported and swallowed.
    Failed,
}

/// Creates package-internal symlinks and records them in the manifest.
#[derive(Debug)]
pub struct SymlinkResolver {
    package_root: PathBuf,
}

impl SymlinkResolver {
    pub fn new(package_root: impl Into<PathBuf>) -> Self {
        Self {
            package_root: package_root.into(),
        }
    }

    /// Reconcile a symlink at `dest` pointing to the relative `target`.
    ///
    /// `dest` is the absolute on-disk location of the link. Parent
    /// directories are created on demand. The placement is recorded in the
    /// manifest (dest stored relative to the package root). When
    /// `critical` is false, failures after classification are reported and
    /// swallowed so genuinely optional cross-links cannot abort the build.
    pub fn create(
        &self,
        recorder: &mut ManifestRecorder,
        target: &Path,
        dest: &Path,
        critical: bool,
    ) -> Result<LinkStatus> {
        if target.is_absolute() {
            return Err(PackageError::path(
                target,
                "symlink target must be relative; an absolute target would \
                 hard-code a build-machine path into a relocatable bundle",
            ));
        }

        match self.reconcile(target, dest) {
            Ok(status) => {
                if status != LinkStatus::AlreadyCorrect {
                    let dest_rel = dest
                        .strip_prefix(&self.package_root)
                        .unwrap_or(dest)
                        .to_path_buf();
                    recorder.record(
                        target,
                        dest_rel,
                        EntryKind::Symlink {
                            target: target.to_path_buf(),
                        },
                    );
                }
                Ok(status)
            }
            Err(err) if critical => Err(PackageError::path(
                dest,
                format!("cannot create symlink to {}: {}", target.display(), err),
            )),
            Err(err) => {
                println!(
                    "  warning: optional symlink {} -> {} failed: {}",
                    dest.display(),
                    target.display(),
                    err
                );
                Ok(LinkStatus::Failed)
            }
        }
    }

    fn reconcile(&self, target: &Path, dest: &Path) -> io::Result<LinkStatus> {
        // symlink_metadata classifies without following the link itself.
        match fs::symlink_metadata(dest) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                std::os::unix::fs::symlink(target, dest)?;
                Ok(LinkStatus::Created)
            }
            Err(err) => Err(err),
            Ok(meta) if meta.file_type().is_symlink() => {
                if fs::read_link(dest)? == target {
                    return Ok(LinkStatus::AlreadyCorrect);
                }
                fs::remove_file(dest)?;
                std::os::unix::fs::symlink(target, dest)?;
                Ok(LinkStatus::Replaced)
            }
            Ok(meta) if meta.is_dir() => {
                println!(
                    "  replacing directory {} with symlink",
                    dest.display()
                );
                fs::remove_dir_all(dest)?;
                std::os::unix::fs::symlink(target, dest)?;
                Ok(LinkStatus::Replaced)
            }
            Ok(_) => {
                println!("  replacing file {} with symlink", dest.display());
                fs::remove_file(dest)?;
                std::os::unix::fs::symlink(target, dest)?;
                Ok(LinkStatus::Replaced)
            }
        }
    }
}

/// Relative path from `dest_dir` to `source`.
///
/// With `resolve_symlinks` set (the usual case) both sides are
/// canonicalized first, so the result is correct even when `dest_dir` is
/// itself reached through a symlink chain. Callers deliberately building a
/// symlink to a symlink pass false to keep the chain intact.
pub fn compute_relative(
    source: &Path,
    dest_dir: &Path,
    resolve_symlinks: bool,
) -> Result<PathBuf> {
    let (source, dest_dir) = if resolve_symlinks {
        (canonicalize_deep(source)?, canonicalize_deep(dest_dir)?)
    } else {
        (source.to_path_buf(), dest_dir.to_path_buf())
    };

    if !source.is_absolute() || !dest_dir.is_absolute() {
        return Err(PackageError::path(
            &source,
            format!(
                "relative offset requires absolute paths (dest dir {})",
                dest_dir.display()
            ),
        ));
    }

    let src: Vec<Component> = source.components().collect();
    let dst: Vec<Component> = dest_dir.components().collect();
    let common = src
        .iter()
        .zip(dst.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..dst.len() {
        rel.push("..");
    }
    for comp in &src[common..] {
        rel.push(comp.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Ok(rel)
}

/// Like `fs::canonicalize`, but tolerant of a not-yet-created tail: the
/// deepest existing ancestor is canonicalized and the remaining components
/// are re-appended as-is.
fn canonicalize_deep(path: &Path) -> Result<PathBuf> {
    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(mut base) => {
                for comp in tail.iter().rev() {
                    base.push(comp);
                }
                return Ok(base);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        tail.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => {
                        return Err(PackageError::path(
                            path,
                            "no existing ancestor to canonicalize against",
                        ))
                    }
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}
