//! The `package` command: assemble, record, finish.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::assemble::{Assembler, PackagePlan};
use crate::config::BuildConfiguration;
use crate::finish::finish_package;
use crate::platform::{Platform, SymlinkStyle};
use crate::retry::ThreadSleeper;

/// Run a full packaging invocation against a plan file.
pub fn run(plan_path: &Path, platform_override: Option<String>) -> Result<()> {
    let base = std::env::current_dir()?;
    let mut config = BuildConfiguration::load(&base);
    if let Some(platform) = platform_override {
        config.platform = platform;
    }
    let platform = Platform::for_target(&config.platform)?;

    println!("=== Packaging {} for {} ===\n", config.channel, platform.name);
    config.print();
    println!();

    fs::create_dir_all(&config.dest_root)?;
    let plan = PackagePlan::from_json_file(plan_path)?;

    let mut asm = Assembler::new(&config.source_root, &config.dest_root);
    plan.run(&mut asm).context("File selection failed")?;

    if platform.symlink_style == SymlinkStyle::CopyInPlace {
        let materialized = asm.materialize_symlinks()?;
        if materialized > 0 {
            println!("Materialized {materialized} symlinks as plain copies");
        }
    }

    let manifest = asm.into_manifest();
    println!("Recorded {} placements", manifest.len());

    let sidecar = manifest_sidecar_path(&config);
    fs::write(&sidecar, manifest.to_json()?)
        .with_context(|| format!("Failed to write {}", sidecar.display()))?;
    println!("Manifest written to {}\n", sidecar.display());

    let mut sleeper = ThreadSleeper;
    let artifact = finish_package(&config, &platform, &manifest, &mut sleeper)?;
    println!("\n=== Package complete ===");
    println!("  {}", artifact.display());
    Ok(())
}

fn manifest_sidecar_path(config: &BuildConfiguration) -> PathBuf {
    config
        .dest_root
        .parent()
        .unwrap_or(&config.dest_root)
        .join(format!("{}.manifest.json", config.installer_base_name()))
}
