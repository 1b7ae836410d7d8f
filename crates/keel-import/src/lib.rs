//! C header import for the Keel compiler.
//!
//! Reads C declarations through a [`frontend::Frontend`] and registers
//! their Keel equivalents, tagged `foreign`, in a
//! [`DeclRegistry`](keel_core::DeclRegistry).
//!
//! ## Modules
//!
//! - [`frontend`] — The C frontend interface and the in-tree source frontend
//! - [`bridge`] — C type to Keel type conversion
//! - [`importer`] — Struct, typedef, function and enum import
//! - [`macros`] — Literal macro import
//! - [`config`] — `keel-import.toml` configuration

pub mod bridge;
pub mod config;
pub mod error;
pub mod frontend;
pub mod importer;
pub mod macros;

// Re-export key types for convenience
pub use bridge::{convert_function_type, convert_type};
pub use config::ImportConfig;
pub use error::{ImportError, Outcome, SkipReason};
pub use frontend::{Frontend, FrontendError, SourceFrontend, TranslationUnit};
pub use importer::{HeaderReport, HeaderStatus, ImportStats, ImportSummary, Importer};
pub use macros::parse_macro_literal;
