//! Per-platform packaging capabilities.
//!
//! One `Platform` record is selected at startup from the configured
//! target and passed around explicitly; per-OS behavior differences live
//! in this data, not in a subclass tower.

use crate::error::{PackageError, Result};

/// How package-internal symlinks are shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymlinkStyle {
    /// Real relative symlinks; the bundle relocates as a unit.
    RelativeLinks,
    /// No symlink support in the target format; links are materialized as
    /// plain copies at assembly time.
    CopyInPlace,
}

/// How the finished package is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStrategy {
    /// xz-compressed tarball with a rename-guard around archiving.
    TarXz,
    /// Mountable disk image, populated and converted to compressed form.
    DiskImage,
    /// NSIS installer executable built from derived script fragments.
    NsisInstaller,
}

/// Whether installer control scripts are derived from the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallScriptStyle {
    Nsis,
    None,
}

/// Capability record for one target platform.
#[derive(Debug, Clone)]
pub struct Platform {
    pub name: &'static str,
    pub symlink_style: SymlinkStyle,
    pub archive_strategy: ArchiveStrategy,
    pub install_script_style: InstallScriptStyle,
}

impl Platform {
    /// Select capabilities for a target name.
    pub fn for_target(target: &str) -> Result<Self> {
        match target {
            "linux" => Ok(Self {
                name: "linux",
                symlink_style: SymlinkStyle::RelativeLinks,
                archive_strategy: ArchiveStrategy::TarXz,
                install_script_style: InstallScriptStyle::None,
            }),
            "darwin" | "macos" => Ok(Self {
                name: "darwin",
                symlink_style: SymlinkStyle::RelativeLinks,
                archive_strategy: ArchiveStrategy::DiskImage,
                install_script_style: InstallScriptStyle::None,
            }),
            "windows" => Ok(Self {
                name: "windows",
                symlink_style: SymlinkStyle::CopyInPlace,
                archive_strategy: ArchiveStrategy::NsisInstaller,
                install_script_style: InstallScriptStyle::Nsis,
            }),
            other => Err(PackageError::consistency(format!(
                "unknown target platform '{other}' (expected linux, darwin, or windows)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_targets() {
        assert_eq!(
            Platform::for_target("linux").unwrap().archive_strategy,
            ArchiveStrategy::TarXz
        );
        assert_eq!(
            Platform::for_target("macos").unwrap().archive_strategy,
            ArchiveStrategy::DiskImage
        );
        let win = Platform::for_target("windows").unwrap();
        assert_eq!(win.install_script_style, InstallScriptStyle::Nsis);
        assert_eq!(win.symlink_style, SymlinkStyle::CopyInPlace);
    }

    #[test]
    fn test_unknown_target_is_error() {
        assert!(Platform::for_target("beos").is_err());
    }
}
