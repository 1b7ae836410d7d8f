//! CLI command implementations.

pub mod config;
pub mod demangle;
pub mod import;
