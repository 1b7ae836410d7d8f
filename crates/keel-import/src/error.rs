//! Import error and skip types.

use std::fmt;

use serde::Serialize;

use crate::frontend::FrontendError;

/// Errors that stop an import run.
///
/// Declarations that cannot be imported are not errors; they produce an
/// [`Outcome::Skipped`] and the run goes on.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The C frontend is in a state it has no status code for.
    #[error("{0}")]
    Frontend(#[from] FrontendError),

    /// Malformed import configuration.
    #[error("invalid import configuration: {detail}")]
    InvalidConfig { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;

/// Why a declaration was intentionally left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Some type in the declaration has no Keel equivalent.
    Unconvertible(String),
    /// A declaration with this name is already registered.
    AlreadyDeclared,
    /// A struct that is declared but never defined.
    ForwardDeclaration,
    /// The frontend could not report the parameter count.
    UnknownArity,
    /// A typedef whose name spells its own target.
    SelfAlias,
    NotAFunction,
    /// A record that is not a struct, such as a union.
    NotAStruct,
    /// A macro with no body.
    MacroTooShort,
    /// A macro whose body does not start with a literal.
    NotALiteral,
    /// An integer literal with a suffix other than `u`/`l`.
    InvalidSuffix,
    /// An integer literal that does not fit in 64 bits.
    LiteralOutOfRange,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unconvertible(what) => write!(f, "unconvertible {what}"),
            SkipReason::AlreadyDeclared => write!(f, "already declared"),
            SkipReason::ForwardDeclaration => write!(f, "forward declaration"),
            SkipReason::UnknownArity => write!(f, "unknown arity"),
            SkipReason::SelfAlias => write!(f, "alias of itself"),
            SkipReason::NotAFunction => write!(f, "not a function"),
            SkipReason::NotAStruct => write!(f, "not a struct"),
            SkipReason::MacroTooShort => write!(f, "macro too short"),
            SkipReason::NotALiteral => write!(f, "macro is not a literal"),
            SkipReason::InvalidSuffix => write!(f, "invalid literal suffix"),
            SkipReason::LiteralOutOfRange => write!(f, "literal out of range"),
        }
    }
}

/// Result of importing one declaration.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Imported(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn imported(self) -> Option<T> {
        match self {
            Outcome::Imported(value) => Some(value),
            Outcome::Skipped(_) => None,
        }
    }

    pub fn is_imported(&self) -> bool {
        matches!(self, Outcome::Imported(_))
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Outcome::Imported(_) => None,
            Outcome::Skipped(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Imported(value) => Outcome::Imported(f(value)),
            Outcome::Skipped(reason) => Outcome::Skipped(reason),
        }
    }
}

impl<T> From<SkipReason> for Outcome<T> {
    fn from(reason: SkipReason) -> Self {
        Outcome::Skipped(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let imported: Outcome<u8> = Outcome::Imported(3);
        assert!(imported.is_imported());
        assert_eq!(imported.skip_reason(), None);
        assert_eq!(imported.map(|v| v * 2).imported(), Some(6));

        let skipped: Outcome<u8> = SkipReason::SelfAlias.into();
        assert_eq!(skipped.skip_reason(), Some(&SkipReason::SelfAlias));
        assert_eq!(skipped.imported(), None);
    }

    #[test]
    fn frontend_errors_convert() {
        let err: ImportError = FrontendError::Unknown(9).into();
        assert_eq!(err.to_string(), "unknown frontend status code 9");
    }

    #[test]
    fn skip_reasons_render() {
        assert_eq!(
            SkipReason::Unconvertible("field `x`".into()).to_string(),
            "unconvertible field `x`"
        );
        assert_eq!(SkipReason::InvalidSuffix.to_string(), "invalid literal suffix");
    }
}
