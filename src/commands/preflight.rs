//! The `preflight` command: verify host tools before a build.

use anyhow::{bail, Result};

use crate::platform::{ArchiveStrategy, Platform};

/// Tools the finishing stage will invoke for this platform. The second
/// element marks tools whose absence only degrades the build.
fn required_tools(platform: &Platform) -> Vec<(&'static str, bool)> {
    match platform.archive_strategy {
        ArchiveStrategy::TarXz => vec![("tar", false), ("xz", false), ("strip", true)],
        ArchiveStrategy::DiskImage => vec![
            ("hdiutil", false),
            ("SetFile", true),
            ("codesign", true),
            ("spctl", true),
        ],
        ArchiveStrategy::NsisInstaller => vec![("makensis", false), ("signtool.exe", true)],
    }
}

pub fn run(target: &str) -> Result<()> {
    let platform = Platform::for_target(target)?;
    println!("Preflight for {}:", platform.name);

    let mut missing_mandatory = Vec::new();
    for (tool, optional) in required_tools(&platform) {
        match which::which(tool) {
            Ok(path) => println!("  OK       {tool} ({})", path.display()),
            Err(_) if optional => println!("  MISSING  {tool} (optional)"),
            Err(_) => {
                println!("  MISSING  {tool}");
                missing_mandatory.push(tool);
            }
        }
    }

    if !missing_mandatory.is_empty() {
        bail!(
            "missing mandatory tools: {}",
            missing_mandatory.join(", ")
        );
    }
    println!("All mandatory tools present.");
    Ok(())
}
