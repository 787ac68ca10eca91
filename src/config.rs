//! Build configuration for a packaging run.
//!
//! One immutable [`BuildConfiguration`] is constructed at startup and
//! passed explicitly into every component; nothing reads configuration
//! from globals. Values come from a `.env` file next to the build tree
//! with real environment variables taking precedence.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Vendor prefix expected at the start of every channel name.
pub const CHANNEL_VENDOR_BASE: &str = "Shipwright";

/// Release class derived from the channel name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Release,
    Beta,
    Project,
    Test,
}

impl ChannelType {
    fn from_channel(channel: &str) -> Self {
        // Suffix after the vendor base decides the class; a bare vendor
        // channel is a release build.
        let suffix = channel
            .strip_prefix(CHANNEL_VENDOR_BASE)
            .unwrap_or(channel)
            .trim();
        if suffix.is_empty() || suffix.eq_ignore_ascii_case("release") {
            Self::Release
        } else if suffix.eq_ignore_ascii_case("beta") {
            Self::Beta
        } else if suffix.to_ascii_lowercase().starts_with("project") {
            Self::Project
        } else {
            Self::Test
        }
    }
}

/// Immutable configuration for one packaging invocation.
#[derive(Debug, Clone)]
pub struct BuildConfiguration {
    /// Full channel name, e.g. "Shipwright Project Voyager".
    pub channel: String,
    /// Dotted version, e.g. "7.1.3.82".
    pub version: String,
    /// Target architecture label, e.g. "x86_64".
    pub arch: String,
    /// Platform name the package is assembled for.
    pub platform: String,
    /// Source artifact tree (build output to select files from).
    pub source_root: PathBuf,
    /// Destination staging directory (package root being assembled).
    pub dest_root: PathBuf,
    /// Code-signing identity, if signing was requested.
    pub signing_identity: Option<String>,
    /// Checkout holding keychain credentials on build hosts.
    pub build_secrets_checkout: Option<PathBuf>,
}

impl BuildConfiguration {
    /// Load configuration from `.env` in `base_dir` plus the environment.
    ///
    /// `.env` lines are plain `KEY=value` with `#` comments; environment
    /// variables override file values.
    pub fn load(base_dir: &Path) -> Self {
        let mut vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if let Ok(content) = fs::read_to_string(&env_path) {
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    let value = value.trim().trim_matches('"').trim_matches('\'');
                    vars.insert(key.trim().to_string(), value.to_string());
                }
            }
        }

        for (key, value) in std::env::vars() {
            vars.insert(key, value);
        }

        let get = |key: &str, default: &str| -> String {
            vars.get(key).cloned().unwrap_or_else(|| default.to_string())
        };
        let path_for = |key: &str, default: &str| -> PathBuf {
            let p = PathBuf::from(get(key, default));
            if p.is_absolute() {
                p
            } else {
                base_dir.join(p)
            }
        };

        Self {
            channel: get("SHIPWRIGHT_CHANNEL", CHANNEL_VENDOR_BASE),
            version: get("SHIPWRIGHT_VERSION", "0.0.0.0"),
            arch: get("SHIPWRIGHT_ARCH", std::env::consts::ARCH),
            platform: get("SHIPWRIGHT_PLATFORM", std::env::consts::OS),
            source_root: path_for("SHIPWRIGHT_SOURCE", "build/artifacts"),
            dest_root: path_for("SHIPWRIGHT_DEST", "build/packaged"),
            signing_identity: vars.get("SHIPWRIGHT_SIGNING_IDENTITY").cloned(),
            build_secrets_checkout: vars.get("BUILD_SECRETS_CHECKOUT").map(PathBuf::from),
        }
    }

    pub fn channel_type(&self) -> ChannelType {
        ChannelType::from_channel(&self.channel)
    }

    /// Channel name with whitespace squeezed out, for file names.
    pub fn channel_oneword(&self) -> String {
        self.channel.split_whitespace().collect()
    }

    /// User-facing application name (the channel is the brand).
    pub fn app_name(&self) -> String {
        self.channel.clone()
    }

    /// Deterministic base name for the produced installer or archive,
    /// e.g. `Shipwright_7_1_3_82_x86_64`.
    pub fn installer_base_name(&self) -> String {
        format!(
            "{}_{}_{}",
            self.channel_oneword(),
            self.version.replace('.', "_"),
            self.arch
        )
    }

    /// Mounted volume name for the disk-image installer. Fixed per vendor:
    /// renaming the volume breaks the background image and icon layout
    /// baked into the .DS_Store.
    pub fn volume_name(&self) -> String {
        format!("{} Installer", CHANNEL_VENDOR_BASE)
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  channel:  {} ({:?})", self.channel, self.channel_type());
        println!("  version:  {}", self.version);
        println!("  arch:     {}", self.arch);
        println!("  platform: {}", self.platform);
        println!("  source:   {}", self.source_root.display());
        println!("  dest:     {}", self.dest_root.display());
        println!(
            "  signing:  {}",
            self.signing_identity.as_deref().unwrap_or("(not requested)")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(channel: &str) -> BuildConfiguration {
        BuildConfiguration {
            channel: channel.to_string(),
            version: "7.1.3.82".to_string(),
            arch: "x86_64".to_string(),
            platform: "linux".to_string(),
            source_root: PathBuf::from("/src"),
            dest_root: PathBuf::from("/dst"),
            signing_identity: None,
            build_secrets_checkout: None,
        }
    }

    #[test]
    fn test_channel_type_derivation() {
        assert_eq!(config("Shipwright").channel_type(), ChannelType::Release);
        assert_eq!(
            config("Shipwright Release").channel_type(),
            ChannelType::Release
        );
        assert_eq!(config("Shipwright Beta").channel_type(), ChannelType::Beta);
        assert_eq!(
            config("Shipwright Project Voyager").channel_type(),
            ChannelType::Project
        );
        assert_eq!(
            config("Shipwright Custom Build").channel_type(),
            ChannelType::Test
        );
    }

    #[test]
    fn test_installer_base_name_substitution() {
        let cfg = config("Shipwright Beta");
        assert_eq!(cfg.installer_base_name(), "ShipwrightBeta_7_1_3_82_x86_64");
    }

    #[test]
    fn test_volume_name_is_vendor_fixed() {
        assert_eq!(config("Shipwright Beta").volume_name(), "Shipwright Installer");
    }
}
