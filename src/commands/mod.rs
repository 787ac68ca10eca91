//! Command handlers for the CLI.

pub mod package;
pub mod preflight;
pub mod script;
pub mod show;
