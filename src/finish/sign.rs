//! Code signing for finished packages.
//!
//! Signing talks to notoriously flaky external services, so the darwin
//! path runs under bounded retry with backoff; exhaustion is a
//! SigningError that aborts the run. The windows path signs the staged
//! executables before the installer is built; the caller treats a failure
//! there as reportable but non-fatal, matching long-standing behavior.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::BuildConfiguration;
use crate::error::PackageError;
use crate::process::Cmd;
use crate::retry::{retry, Backoff, Sleeper};

/// Sign an application bundle in place with `codesign`, retrying with
/// backoff, then verify acceptance with `spctl`.
///
/// When `secrets_checkout` is set the keychain is unlocked first using
/// the password file the build host checkout provides.
pub fn sign_bundle(
    bundle: &Path,
    identity: &str,
    secrets_checkout: Option<&Path>,
    sleeper: &mut dyn Sleeper,
) -> crate::error::Result<()> {
    let identity = if identity.is_empty() {
        "Developer ID Application"
    } else {
        identity
    };
    println!("Signing {} as '{}'", bundle.display(), identity);

    let keychain = match secrets_checkout {
        Some(checkout) => Some(unlock_keychain(checkout).map_err(|e| {
            PackageError::tool("security", format!("keychain unlock failed: {e:#}"))
        })?),
        None => None,
    };

    retry("codesign", Backoff::default(), sleeper, || {
        let mut cmd = Cmd::new("codesign").args(["--verbose", "--deep", "--force"]);
        if let Some(keychain) = &keychain {
            cmd = cmd.arg("--keychain").arg_path(keychain);
        }
        cmd.args(["--sign", identity])
            .arg_path(bundle)
            .error_msg("codesign failed")
            .run()?;
        Ok(())
    })
    .map_err(|exhausted| PackageError::Signing {
        attempts: exhausted.attempts,
        last_error: exhausted.last_error.to_string(),
    })?;

    Cmd::new("spctl")
        .args(["-a", "-texec", "-vv"])
        .arg_path(bundle)
        .error_msg("Signature assessment failed")
        .run()
        .map_err(|e| PackageError::tool("spctl", format!("{e:#}")))?;
    Ok(())
}

/// Unlock the build host keychain and return its path.
fn unlock_keychain(secrets_checkout: &Path) -> Result<PathBuf> {
    let password_path = secrets_checkout.join("code-signing-osx/password.txt");
    let password = fs::read_to_string(&password_path)
        .with_context(|| format!("Failed to read {}", password_path.display()))?;
    let home = std::env::var("HOME").context("HOME is not set")?;
    let keychain = PathBuf::from(home).join("Library/Keychains/packaging.keychain");

    Cmd::new("security")
        .arg("unlock-keychain")
        .args(["-p", password.trim_end()])
        .arg_path(&keychain)
        .error_msg("Failed to unlock signing keychain")
        .run()?;
    Ok(keychain)
}

/// Sign one staged executable with `signtool`.
///
/// The timestamp password comes from the environment so it never lands in
/// a plan file or on a command line stored in logs.
pub fn sign_executable(exe: &Path, identity: &str, config: &BuildConfiguration) -> Result<()> {
    let password =
        std::env::var("SHIPWRIGHT_SIGNING_PWD").context("SHIPWRIGHT_SIGNING_PWD is not set")?;
    Cmd::new("signtool.exe")
        .args(["sign", "/v"])
        .args(["/n", identity])
        .args(["/p", &password])
        .args(["/d", &config.channel])
        .args(["/t", "http://timestamp.comodoca.com/authenticode"])
        .arg_path(exe)
        .error_msg("signtool failed")
        .run()?;
    Ok(())
}
