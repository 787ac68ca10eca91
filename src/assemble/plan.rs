//! Data-driven package plans.
//!
//! The per-platform catalogues of what ships are plain data, not code:
//! a plan is a tree of scopes and selection steps loaded from JSON and
//! replayed against an [`Assembler`](super::Assembler). Optional steps
//! tolerate absence; everything else is mandatory and aborts the build
//! when missing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Assembler;

/// One selection step in a package plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    /// Enter a nested (source, dest) scope around `steps`.
    Prefix {
        #[serde(default)]
        src: String,
        #[serde(default)]
        dst: String,
        #[serde(default)]
        optional: bool,
        steps: Vec<PlanStep>,
    },
    /// Select files matching `pattern` into the current dest scope.
    File {
        pattern: String,
        #[serde(default)]
        dst: Option<String>,
        #[serde(default)]
        optional: bool,
    },
    /// Create a symlink with an explicit relative target.
    Symlink {
        target: PathBuf,
        dest: PathBuf,
        #[serde(default)]
        critical: bool,
    },
    /// Create a symlink whose target is computed relative to the link
    /// location from an already-staged destination.
    RelativeSymlink {
        source: PathBuf,
        dest: PathBuf,
        #[serde(default)]
        critical: bool,
    },
}

/// An ordered list of selection steps for one platform build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagePlan {
    pub steps: Vec<PlanStep>,
}

impl PackagePlan {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse plan {}", path.display()))
    }

    /// Replay every step against the assembler.
    pub fn run(&self, asm: &mut Assembler) -> crate::error::Result<()> {
        run_steps(&self.steps, asm)
    }
}

fn run_steps(steps: &[PlanStep], asm: &mut Assembler) -> crate::error::Result<()> {
    for step in steps {
        match step {
            PlanStep::Prefix {
                src,
                dst,
                optional,
                steps,
            } => {
                asm.scoped(src, dst, *optional, |a| run_steps(steps, a))?;
            }
            PlanStep::File {
                pattern,
                dst,
                optional,
            } => {
                if *optional {
                    asm.path_optional(pattern, dst.as_deref())?;
                } else {
                    asm.path(pattern, dst.as_deref())?;
                }
            }
            PlanStep::Symlink {
                target,
                dest,
                critical,
            } => {
                asm.symlink(target, dest, *critical)?;
            }
            PlanStep::RelativeSymlink {
                source,
                dest,
                critical,
            } => {
                let staged = asm.dest_path_of(source);
                asm.relative_symlink(&staged, dest, *critical)?;
            }
        }
    }
    Ok(())
}
