//! Disk-image finishing for the darwin installer.
//!
//! Lifecycle: create sparse image, attach, populate, finalize Finder
//! metadata, optionally sign in place, detach, convert to a compressed
//! read-only image. The mount is a scoped acquisition: from attach
//! onwards it must be released on every exit path, including when
//! population, metadata, or signing fails, so the mounted volume is held
//! by a guard whose `Drop` force-detaches.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;

use crate::assemble::select;
use crate::config::{BuildConfiguration, ChannelType};
use crate::error::PackageError;
use crate::finish::{archive, sign};
use crate::process::Cmd;
use crate::retry::{poll_until, Sleeper};

/// Device id and mount path parsed from `hdiutil attach` output.
///
/// Both are mandatory: without the device the image cannot be detached,
/// and without the mount path it cannot be populated.
pub fn parse_attach_output(output: &str) -> crate::error::Result<(String, PathBuf)> {
    let device_re = Regex::new(r"(/dev/disk\d+)\b").expect("static regex");
    let mount_re = Regex::new(r"HFS\s+(.+)").expect("static regex");

    let device = device_re
        .captures(output)
        .map(|c| c[1].to_string())
        .ok_or_else(|| {
            PackageError::tool(
                "hdiutil attach",
                format!("no device node in output:\n{output}"),
            )
        })?;
    let mount = mount_re
        .captures(output)
        .map(|c| PathBuf::from(c[1].trim()))
        .ok_or_else(|| {
            PackageError::tool(
                "hdiutil attach",
                format!("no mount path in output:\n{output}"),
            )
        })?;
    Ok((device, mount))
}

/// A mounted disk image. Detached on drop if not explicitly released.
struct MountedImage {
    device: String,
    mount: PathBuf,
    detached: bool,
}

impl MountedImage {
    fn attach(sparse: &Path) -> Result<Self> {
        let result = Cmd::new("hdiutil")
            .arg("attach")
            .arg("-private")
            .arg_path(sparse)
            .error_msg("Failed to mount disk image")
            .run()?;
        let (device, mount) = parse_attach_output(&result.stdout)?;
        println!("  mounted {} at {}", device, mount.display());
        Ok(Self {
            device,
            mount,
            detached: false,
        })
    }

    fn detach(mut self) -> Result<()> {
        self.detached = true;
        Cmd::new("hdiutil")
            .arg("detach")
            .arg("-force")
            .arg(&self.device)
            .error_msg("Failed to detach disk image")
            .run()?;
        Ok(())
    }
}

impl Drop for MountedImage {
    fn drop(&mut self) {
        if !self.detached {
            let _ = Cmd::new("hdiutil")
                .arg("detach")
                .arg("-force")
                .arg(&self.device)
                .allow_fail()
                .run();
        }
    }
}

/// Build the final compressed disk image for the staged package.
pub fn create_disk_image(
    config: &BuildConfiguration,
    sleeper: &mut dyn Sleeper,
) -> Result<PathBuf> {
    let build_dir = config
        .dest_root
        .parent()
        .context("destination directory has no parent")?;
    let base = config.installer_base_name();
    let sparse = build_dir.join(format!("{base}.sparseimage"));
    let final_dmg = build_dir.join(format!("{base}.dmg"));

    // Stale images from an aborted run would make create/convert fail.
    for stale in [&sparse, &final_dmg] {
        if stale.exists() {
            fs::remove_file(stale)?;
        }
    }

    println!("Creating disk image {}", sparse.display());
    Cmd::new("hdiutil")
        .arg("create")
        .arg_path(&sparse)
        .args(["-volname", &config.volume_name()])
        .args(["-fs", "HFS+"])
        .args(["-type", "SPARSE"])
        .args(["-megabytes", "1300"])
        .args(["-layout", "SPUD"])
        .error_msg("Failed to create disk image")
        .run()?;

    let mounted = MountedImage::attach(&sparse)?;
    populate_and_finalize(config, &mounted.mount, sleeper)?;
    mounted.detach()?;

    println!("Converting to compressed image {}", final_dmg.display());
    Cmd::new("hdiutil")
        .arg("convert")
        .arg_path(&sparse)
        .args(["-format", "UDZO"])
        .args(["-imagekey", "zlib-level=9"])
        .arg("-o")
        .arg_path(&final_dmg)
        .error_msg("Failed to convert disk image")
        .run()?;
    fs::remove_file(&sparse)?;

    archive::write_checksum(&final_dmg)?;
    Ok(final_dmg)
}

/// Everything that happens while the volume is mounted.
fn populate_and_finalize(
    config: &BuildConfiguration,
    volume: &Path,
    sleeper: &mut dyn Sleeper,
) -> Result<()> {
    let app_name = format!("{}.app", config.app_name());
    println!("  copying staged bundle into {}", volume.display());
    select::copy_tree(&config.dest_root, &volume.join(&app_name))?;

    // Finder dressing (background, volume icon, icon layout) ships from a
    // per-channel template; unknown channel types fall back to release.
    if let Some(template) = dmg_template_dir(config) {
        let mut copied = Vec::new();
        for (from, name) in finder_dressing(&template) {
            let to = volume.join(name);
            select::copy_file(&from, &to)?;
            copied.push(to);
        }

        // Copies onto the mounted volume are sometimes not visible
        // immediately; wait briefly, then run the real command either way
        // and let it report any genuine failure.
        for (path, seen) in confirm_visible(&copied, sleeper) {
            if seen {
                println!("  confirmed existence: {}", path.display());
            } else {
                println!("  {} still not visible, proceeding", path.display());
            }
            Cmd::new("SetFile")
                .args(["-a", "V"])
                .arg_path(&path)
                .error_msg("Failed to hide Finder metadata file")
                .run()?;
        }

        // Drag-to-install target: a prebuilt alias to /Applications shipped
        // in the template, marked alias + custom icon so Finder treats it
        // as one.
        let alias = template.join("Applications");
        if alias.exists() {
            let to = volume.join("Applications");
            select::copy_file(&alias, &to)?;
            Cmd::new("SetFile")
                .args(["-a", "AC"])
                .arg_path(&to)
                .error_msg("Failed to mark Applications alias")
                .run()?;
        }

        Cmd::new("SetFile")
            .args(["-a", "C"])
            .arg_path(volume)
            .error_msg("Failed to set volume custom icon bit")
            .run()?;
    }

    if let Some(identity) = &config.signing_identity {
        // Sign the copy inside the image so the extended attributes the
        // signature depends on are the ones that ship.
        let app_in_dmg = volume.join(&app_name);
        sign::sign_bundle(
            &app_in_dmg,
            identity,
            config.build_secrets_checkout.as_deref(),
            sleeper,
        )?;
    }
    Ok(())
}

/// (template file, on-volume name) pairs for the Finder dressing actually
/// present in the template directory.
fn finder_dressing(template: &Path) -> Vec<(PathBuf, &'static str)> {
    [
        ("_VolumeIcon.icns", ".VolumeIcon.icns"),
        ("background.jpg", "background.jpg"),
        ("_DS_Store", ".DS_Store"),
    ]
    .into_iter()
    .filter_map(|(src, dst)| {
        let from = template.join(src);
        from.exists().then_some((from, dst))
    })
    .collect()
}

/// Wait briefly for each copied file to become visible on the mounted
/// volume. Every input comes back paired with whether it was observed;
/// the caller acts on all of them regardless, so a slow mount can delay
/// the attribute step but never skip it.
fn confirm_visible(
    paths: &[PathBuf],
    sleeper: &mut dyn Sleeper,
) -> Vec<(PathBuf, bool)> {
    paths
        .iter()
        .map(|path| {
            let seen = poll_until(3, Duration::from_secs(1), sleeper, || path.exists());
            (path.clone(), seen)
        })
        .collect()
}

fn dmg_template_dir(config: &BuildConfiguration) -> Option<PathBuf> {
    let installers = config.source_root.join("installers/darwin");
    let channel_dir = match config.channel_type() {
        ChannelType::Release => "release-dmg",
        ChannelType::Beta => "beta-dmg",
        ChannelType::Project => "project-dmg",
        ChannelType::Test => "release-dmg",
    };
    let dir = installers.join(channel_dir);
    if dir.is_dir() {
        Some(dir)
    } else {
        let fallback = installers.join("release-dmg");
        fallback.is_dir().then_some(fallback)
    }
}
