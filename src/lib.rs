//! shipwright library exports for integration testing.

pub mod assemble;
pub mod config;
pub mod error;
pub mod finish;
pub mod installer;
pub mod manifest;
pub mod platform;
pub mod process;
pub mod retry;
