//! The `script` command: derive installer instructions from a recorded
//! manifest without touching the filesystem.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::installer::{install_sequence, nsis, uninstall_sequence};
use crate::manifest::ManifestEntry;

/// Print the install or uninstall sequence for a manifest JSON dump,
/// either as platform-agnostic instructions or rendered NSIS text.
pub fn run(manifest_path: &Path, uninstall: bool, render_nsis: bool, staging: Option<&Path>) -> Result<()> {
    let text = fs::read_to_string(manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    let entries: Vec<ManifestEntry> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse {}", manifest_path.display()))?;

    if uninstall {
        let seq = uninstall_sequence(&entries)?;
        if render_nsis {
            print!("{}", nsis::render_uninstall(&seq));
        } else {
            for inst in &seq {
                println!("{inst}");
            }
        }
    } else {
        let seq = install_sequence(&entries)?;
        if render_nsis {
            let staging = staging.unwrap_or_else(|| Path::new("."));
            print!("{}", nsis::render_install(&seq, staging));
        } else {
            for inst in &seq {
                println!("{inst}");
            }
        }
    }
    Ok(())
}
