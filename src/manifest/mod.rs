//! The placement manifest and the machinery that feeds it.
//!
//! Selection code opens nested source/dest scopes ([`prefix`]), every
//! placed file or symlink lands in the append-only log ([`recorder`]),
//! and relocatable symlinks are reconciled idempotently ([`symlink`]).

pub mod prefix;
pub mod recorder;
pub mod symlink;

pub use prefix::{PrefixStack, Scope};
pub use recorder::{path_ancestors, EntryKind, ManifestEntry, ManifestRecorder};
pub use symlink::{compute_relative, LinkStatus, SymlinkResolver};
