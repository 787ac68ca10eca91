//! shipwright - manifest-driven package assembly.
//!
//! Selects build artifacts into a staged package tree per a platform
//! plan, records every placement in an ordered manifest, wires
//! relocatable symlinks, and finishes the result as a platform installer
//! or archive (tar.xz, disk image, or NSIS installer).
#![allow(dead_code)]

mod assemble;
mod commands;
mod config;
mod error;
mod finish;
mod installer;
mod manifest;
mod platform;
mod process;
mod retry;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(about = "Assemble and finish application distribution packages")]
#[command(
    after_help = "QUICK START:\n  shipwright preflight        Check host tools\n  shipwright package -p plan.json   Build the package\n  shipwright script -m manifest.json  Derive installer commands"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble the package from a plan and produce the final artifact
    Package {
        /// Package plan JSON file
        #[arg(short, long)]
        plan: PathBuf,
        /// Override the target platform (linux, darwin, windows)
        #[arg(long)]
        platform: Option<String>,
    },

    /// Derive installer instructions from a recorded manifest
    Script {
        /// Manifest JSON produced by a package run
        #[arg(short, long)]
        manifest: PathBuf,
        /// Emit the uninstall sequence instead of the install sequence
        #[arg(long)]
        uninstall: bool,
        /// Render concrete NSIS syntax instead of plain instructions
        #[arg(long)]
        nsis: bool,
        /// Staging directory for NSIS file sources
        #[arg(long)]
        staging: Option<PathBuf>,
    },

    /// Verify required host tools before a build
    Preflight {
        /// Target platform to check for (defaults to the configured one)
        #[arg(long)]
        platform: Option<String>,
    },

    /// Show the effective configuration
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Package { plan, platform } => commands::package::run(&plan, platform),
        Commands::Script {
            manifest,
            uninstall,
            nsis,
            staging,
        } => commands::script::run(&manifest, uninstall, nsis, staging.as_deref()),
        Commands::Preflight { platform } => {
            let target = platform.unwrap_or_else(|| {
                let base = std::env::current_dir().unwrap_or_default();
                config::BuildConfiguration::load(&base).platform
            });
            commands::preflight::run(&target)
        }
        Commands::Show => commands::show::run(),
    }
}
