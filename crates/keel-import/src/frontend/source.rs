//! The in-tree frontend: parses header text directly.

use std::path::Path;

use tracing::debug;

use super::{parse, tokenize, Frontend, FrontendError, TranslationUnit};

/// A [`Frontend`] that reads C headers from disk and parses a declaration
/// subset of C without running a preprocessor.
///
/// Includes and conditionals are not followed, so every branch of a header
/// is seen. Compiler arguments are accepted for interface parity and ignored.
#[derive(Debug, Default, Clone)]
pub struct SourceFrontend;

impl SourceFrontend {
    pub fn new() -> Self {
        Self
    }

    /// Parse header text that is already in memory.
    pub fn parse_source(&self, path: &Path, source: &str) -> TranslationUnit {
        let tokens = tokenize::tokenize(source);
        let cursors = parse::parse(&tokens);
        debug!(
            path = %path.display(),
            tokens = tokens.len(),
            cursors = cursors.len(),
            "parsed header"
        );
        TranslationUnit::new(path, cursors, tokens)
    }
}

impl Frontend for SourceFrontend {
    fn parse(&mut self, path: &Path, args: &[String]) -> Result<TranslationUnit, FrontendError> {
        if args.iter().any(|a| a.is_empty()) {
            return Err(FrontendError::InvalidArguments);
        }
        let bytes = std::fs::read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        Ok(self.parse_source(path, &source))
    }
}
