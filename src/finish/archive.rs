//! Tarball finishing: permissions, strip, archive, checksum.
//!
//! The staged package directory is temporarily renamed to its
//! installer-facing name so the archive's top-level entry is right, then
//! renamed back whether or not archiving succeeded.

use std::fs;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::BuildConfiguration;
use crate::process::Cmd;

/// Restores a renamed directory to its original name on drop.
///
/// The explicit [`RenameGuard::restore`] reports rename failures; the
/// `Drop` fallback is best-effort for the unwinding path.
struct RenameGuard {
    current: PathBuf,
    original: PathBuf,
    restored: bool,
}

impl RenameGuard {
    fn rename(original: &Path, staged: &Path) -> Result<Self> {
        fs::rename(original, staged).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                original.display(),
                staged.display()
            )
        })?;
        Ok(Self {
            current: staged.to_path_buf(),
            original: original.to_path_buf(),
            restored: false,
        })
    }

    fn restore(mut self) -> Result<()> {
        self.restored = true;
        fs::rename(&self.current, &self.original).with_context(|| {
            format!(
                "Failed to restore {} to {}",
                self.current.display(),
                self.original.display()
            )
        })
    }
}

impl Drop for RenameGuard {
    fn drop(&mut self) {
        if !self.restored {
            let _ = fs::rename(&self.current, &self.original);
        }
    }
}

/// Produce the xz tarball for the staged package.
///
/// Returns the path of the created archive. The staged directory is back
/// under its original name when this returns, on success and on failure.
pub fn create_archive(config: &BuildConfiguration) -> Result<PathBuf> {
    let dest = &config.dest_root;
    let build_dir = dest
        .parent()
        .context("destination directory has no parent to archive from")?;
    let installer_name = config.installer_base_name();
    let staged = build_dir.join(&installer_name);
    let archive = build_dir.join(format!("{installer_name}.tar.xz"));

    println!("Creating archive {}", archive.display());
    let guard = RenameGuard::rename(dest, &staged)?;
    // --numeric-owner hides the username of the builder.
    let tar_result = Cmd::new("tar")
        .arg("-C")
        .arg_path(build_dir)
        .arg("--numeric-owner")
        .arg("-cJf")
        .arg_path(&archive)
        .arg(&installer_name)
        .error_msg("Archive creation failed")
        .run();
    let restore_result = guard.restore();
    tar_result?;
    restore_result?;

    write_checksum(&archive)?;
    Ok(archive)
}

/// Normalize access permissions across the staged tree before archiving:
/// directories become 755 and files keep their class (executable, plain,
/// owner-only) but gain group/other read bits.
pub fn normalize_permissions(root: &Path) -> Result<()> {
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_symlink() {
            continue;
        }
        let meta = entry.metadata()?;
        let mode = meta.permissions().mode() & 0o777;
        let new_mode = if meta.is_dir() {
            0o755
        } else {
            match mode {
                0o700 => 0o755,
                0o500 => 0o555,
                0o600 => 0o644,
                0o400 => 0o444,
                other => other,
            }
        };
        if new_mode != mode {
            fs::set_permissions(entry.path(), fs::Permissions::from_mode(new_mode))?;
        }
    }
    Ok(())
}

/// Strip packaged binaries, keeping enough symbol info for annotated
/// backtraces. Best-effort: a missing or failing strip never aborts the
/// package.
pub fn strip_binaries(root: &Path) {
    for subdir in ["bin", "lib", "lib32", "lib64"] {
        let dir = root.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let result = Cmd::new("strip")
                .arg("-S")
                .arg_path(entry.path())
                .allow_fail()
                .run();
            if let Err(err) = result {
                println!("  strip unavailable, skipping: {err}");
                return;
            }
        }
    }
}

/// Write a `<name>.sha256` sidecar next to an artifact.
pub fn write_checksum(artifact: &Path) -> Result<PathBuf> {
    let mut file = fs::File::open(artifact)
        .with_context(|| format!("Failed to open {} for checksum", artifact.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    let name = artifact
        .file_name()
        .context("artifact has no file name")?
        .to_string_lossy();
    let sidecar = artifact.with_extension(
        artifact
            .extension()
            .map(|e| format!("{}.sha256", e.to_string_lossy()))
            .unwrap_or_else(|| "sha256".to_string()),
    );
    fs::write(&sidecar, format!("{digest:x}  {name}\n"))?;
    Ok(sidecar)
}
