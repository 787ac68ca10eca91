//! Typed errors for the package assembly engine.
//!
//! Structural failures (scope imbalance, manifest corruption, retry
//! exhaustion) abort the whole run; callers that treat a step as optional
//! catch the error at the call site, report it, and continue.

use std::path::PathBuf;

/// Errors raised by the assembly engine.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Scope push/pop imbalance, or a mandatory source directory is missing.
    #[error("scope error: {0}")]
    Scope(String),

    /// A symlink target is absolute, or a target cannot be made relative
    /// to its destination.
    #[error("path error for {path}: {reason}")]
    Path { path: PathBuf, reason: String },

    /// A manifest invariant was violated (e.g. malformed destination path
    /// during script derivation).
    #[error("manifest inconsistency: {0}")]
    Consistency(String),

    /// An external tool exited with failure or produced unparseable
    /// required output.
    #[error("external tool '{tool}' failed: {detail}")]
    ExternalTool { tool: String, detail: String },

    /// Signing retries exhausted.
    #[error("signing failed after {attempts} attempts: {last_error}")]
    Signing { attempts: u32, last_error: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PackageError>;

impl PackageError {
    pub fn scope(msg: impl Into<String>) -> Self {
        Self::Scope(msg.into())
    }

    pub fn path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    pub fn tool(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            detail: detail.into(),
        }
    }
}
