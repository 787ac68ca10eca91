//! Package finishing: turn the staged tree plus its manifest into the
//! shipped artifact for the selected platform.

pub mod archive;
pub mod dmg;
pub mod sign;
pub mod windows;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::BuildConfiguration;
use crate::manifest::ManifestRecorder;
use crate::platform::{ArchiveStrategy, Platform};
use crate::retry::Sleeper;

/// Produce the final installer or archive. Returns the artifact path.
pub fn finish_package(
    config: &BuildConfiguration,
    platform: &Platform,
    manifest: &ManifestRecorder,
    sleeper: &mut dyn Sleeper,
) -> Result<PathBuf> {
    match platform.archive_strategy {
        ArchiveStrategy::TarXz => {
            archive::normalize_permissions(&config.dest_root)?;
            archive::strip_binaries(&config.dest_root);
            archive::create_archive(config)
        }
        ArchiveStrategy::DiskImage => dmg::create_disk_image(config, sleeper),
        ArchiveStrategy::NsisInstaller => windows::create_installer(config, manifest.entries()),
    }
}
