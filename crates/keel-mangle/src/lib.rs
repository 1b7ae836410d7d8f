//! Symbol mangling for Keel declarations.
//!
//! Every non-foreign function, closure and standalone type gets a symbol
//! that encodes its full resolved signature, so overloads never collide at
//! link time. Foreign functions keep their C name. All Keel symbols start
//! with [`MANGLE_PREFIX`], which keeps the two namespaces disjoint.
//!
//! ## Modules
//!
//! - [`mangle`] — Declaration and type encoders
//! - [`demangle`] — Decoding symbols back into readable signatures

pub mod demangle;
pub mod mangle;

// Re-export key types for convenience
pub use demangle::{demangle, Demangled};
pub use mangle::{is_mangled, mangle_closure, mangle_function, mangle_type};

/// Prefix shared by every mangled symbol.
pub const MANGLE_PREFIX: &str = "_K";
