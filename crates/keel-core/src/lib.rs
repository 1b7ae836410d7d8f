//! Core data structures for the Keel compiler.
//!
//! Everything the importer, the mangler and later compiler phases agree on
//! lives here: the type universe, declarations, the shared declaration
//! registry and the compiler's own lexer.
//!
//! ## Modules
//!
//! - [`ident`] — Identifiers with optional source positions
//! - [`types`] — The `DataType` universe
//! - [`decl`] — Type, function, global and alias declarations
//! - [`registry`] — Append-only declaration registry for one compilation
//! - [`lexer`] — The Keel lexer, also reused on isolated macro tokens

pub mod decl;
pub mod ident;
pub mod lexer;
pub mod registry;
pub mod types;

// Re-export key types for convenience
pub use decl::{
    Attribute, ConstValue, Declaration, Field, FuncDecl, FuncKind, GlobalConst, Param, TypeAlias,
    TypeDecl,
};
pub use ident::{Identifier, Span};
pub use lexer::{LexError, Lexer};
pub use registry::DeclRegistry;
pub use types::{DataType, FloatKind};
