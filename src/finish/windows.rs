//! NSIS installer finishing.
//!
//! Derives the install/uninstall command fragments from the manifest,
//! splices them into the installer template, and runs `makensis`. Staged
//! executables are signed first when an identity is configured; a signing
//! failure there is reported and tolerated so unsigned test builds still
//! produce an installer.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::BuildConfiguration;
use crate::finish::{archive, sign};
use crate::installer::{install_sequence, nsis, uninstall_sequence};
use crate::manifest::ManifestEntry;
use crate::process::Cmd;

const NSI_TEMPLATE: &str = r#";; Generated installer script - do not edit.
Unicode true
Name "%%NAME%%"
Caption "%%NAME%% %%VERSION%%"
OutFile "%%OUTFILE%%"
InstallDir "$PROGRAMFILES64\%%NAME%%"

Section "Install"
%%INSTALL_FILES%%
WriteUninstaller "$INSTDIR\uninstall.exe"
SectionEnd

Section "Uninstall"
%%DELETE_FILES%%
Delete "$INSTDIR\uninstall.exe"
RMDir "$INSTDIR"
SectionEnd
"#;

/// Build the installer executable for the staged package.
pub fn create_installer(
    config: &BuildConfiguration,
    entries: &[ManifestEntry],
) -> Result<PathBuf> {
    let build_dir = config
        .dest_root
        .parent()
        .context("destination directory has no parent")?;

    if let Some(identity) = &config.signing_identity {
        sign_staged_executables(config, identity);
    }

    let install = nsis::render_install(&install_sequence(entries)?, &config.dest_root);
    let uninstall = nsis::render_uninstall(&uninstall_sequence(entries)?);

    let base = config.installer_base_name();
    let outfile = build_dir.join(format!("{base}_Setup.exe"));
    let script = NSI_TEMPLATE
        .replace("%%NAME%%", &config.app_name())
        .replace("%%VERSION%%", &config.version)
        .replace("%%OUTFILE%%", &outfile.to_string_lossy())
        .replace("%%INSTALL_FILES%%", install.trim_end())
        .replace("%%DELETE_FILES%%", uninstall.trim_end());

    let nsi_path = build_dir.join(format!("{base}.nsi"));
    fs::write(&nsi_path, script)
        .with_context(|| format!("Failed to write {}", nsi_path.display()))?;

    println!("Building installer {}", outfile.display());
    Cmd::new("makensis")
        .arg_path(&nsi_path)
        .error_msg("Installer build failed")
        .run()?;

    archive::write_checksum(&outfile)?;
    Ok(outfile)
}

/// Sign every top-level staged executable; failures are reported, not
/// fatal.
fn sign_staged_executables(config: &BuildConfiguration, identity: &str) {
    let Ok(read) = fs::read_dir(&config.dest_root) else {
        return;
    };
    for entry in read.flatten() {
        let path = entry.path();
        let is_exe = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("exe"));
        if !is_exe {
            continue;
        }
        if let Err(err) = sign::sign_executable(&path, identity, config) {
            println!("Couldn't sign {}: {err:#}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::EntryKind;
    use std::path::Path;

    #[test]
    fn test_script_substitution() {
        let entries = vec![ManifestEntry {
            source: PathBuf::from("viewer.exe"),
            dest: PathBuf::from("viewer.exe"),
            kind: EntryKind::File,
        }];
        let install = nsis::render_install(
            &install_sequence(&entries).unwrap(),
            Path::new("build/packaged"),
        );
        let script = NSI_TEMPLATE
            .replace("%%NAME%%", "Shipwright")
            .replace("%%INSTALL_FILES%%", install.trim_end());
        assert!(script.contains("Name \"Shipwright\""));
        assert!(script.contains("File build\\packaged\\viewer.exe"));
    }
}
