//! Identifiers.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// A source position (1-based line and column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

/// A declared name.
///
/// Equality, ordering and hashing look at `name` only; the span is carried
/// for diagnostics and never distinguishes two identifiers.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub span: Option<Span>,
}

impl Identifier {
    /// An identifier with no source position.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: None,
        }
    }

    /// An identifier located at `span`.
    pub fn at(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span: Some(span),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Identifier {}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

// Hash of an Identifier is the hash of its name, so map lookups by &str agree.
impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.name
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::new(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::new(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn equality_ignores_span() {
        let a = Identifier::at("foo", Span { line: 1, column: 4 });
        let b = Identifier::at("foo", Span { line: 90, column: 1 });
        assert_eq!(a, b);
        assert_eq!(a, Identifier::new("foo"));
    }

    #[test]
    fn equality_is_case_sensitive() {
        assert_ne!(Identifier::new("Foo"), Identifier::new("foo"));
    }

    #[test]
    fn map_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Identifier::at("size_t", Span { line: 3, column: 9 }), 1);
        assert_eq!(map.get("size_t"), Some(&1));
        assert!(map.get("ssize_t").is_none());
    }

    #[test]
    fn serializes_as_bare_name() {
        let id = Identifier::at("printf", Span { line: 1, column: 1 });
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"printf\"");
    }
}
