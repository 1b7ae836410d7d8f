//! Import configuration (`keel-import.toml`).
//!
//! Names the headers to import, where to find them and what to pass to the
//! C frontend. Every field has a default, so an empty file is a valid
//! configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};

/// Headers imported when the configuration does not name any.
pub const DEFAULT_HEADERS: &[&str] = &[
    "stdlib.h", "stdio.h", "stdint.h", "stddef.h", "math.h", "string.h", "_types.h", "pthread.h",
];

#[cfg(target_os = "macos")]
const SDK_INCLUDE: &str =
    "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk/usr/include/";

/// Configuration for one import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ImportConfig {
    /// Header file names, resolved against `search_prefix`.
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,
    /// Directory the header names are resolved against.
    #[serde(default = "default_search_prefix")]
    pub search_prefix: PathBuf,
    /// The runtime's own header, imported after the system headers.
    #[serde(default = "default_runtime_header")]
    pub runtime_header: Option<PathBuf>,
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<PathBuf>,
    /// Extra frontend flags, passed before the include directories.
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,
}

fn default_headers() -> Vec<String> {
    DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect()
}

#[cfg(target_os = "macos")]
fn default_search_prefix() -> PathBuf {
    PathBuf::from(SDK_INCLUDE)
}

#[cfg(not(target_os = "macos"))]
fn default_search_prefix() -> PathBuf {
    PathBuf::from("/usr/local/include/")
}

fn default_runtime_header() -> Option<PathBuf> {
    Some(PathBuf::from("/usr/local/include/keel/keel.h"))
}

fn default_include_dirs() -> Vec<PathBuf> {
    #[allow(unused_mut)]
    let mut dirs: Vec<PathBuf> = ["/usr/include", "/usr/local/include", "/usr/local/llvm/include"]
        .into_iter()
        .map(PathBuf::from)
        .collect();
    #[cfg(target_os = "macos")]
    dirs.push(PathBuf::from(SDK_INCLUDE));
    dirs
}

fn default_flags() -> Vec<String> {
    vec!["-c".to_string()]
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            headers: default_headers(),
            search_prefix: default_search_prefix(),
            runtime_header: default_runtime_header(),
            include_dirs: default_include_dirs(),
            flags: default_flags(),
        }
    }
}

impl ImportConfig {
    /// Parse a configuration from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let config: ImportConfig = toml::from_str(input)?;

        if config.headers.iter().any(|h| h.trim().is_empty()) {
            return Err(ImportError::InvalidConfig {
                detail: "header names must not be empty".to_string(),
            });
        }

        Ok(config)
    }

    /// Parse a configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Every header to import, in order: the configured headers under the
    /// search prefix, then the runtime header.
    pub fn header_paths(&self) -> Vec<PathBuf> {
        self.headers
            .iter()
            .map(|h| self.search_prefix.join(h))
            .chain(self.runtime_header.iter().cloned())
            .collect()
    }

    /// Arguments handed to the frontend for every header.
    pub fn compiler_args(&self) -> Vec<String> {
        self.flags
            .iter()
            .cloned()
            .chain(self.include_dirs.iter().map(|d| format!("-I{}", d.display())))
            .collect()
    }
}
