//! `keel config`.

use std::path::Path;

use anyhow::{Context, Result};
use keel_import::ImportConfig;

pub fn run(path: Option<&Path>) -> Result<()> {
    print!("{}", render(path)?);
    Ok(())
}

fn render(path: Option<&Path>) -> Result<String> {
    let config = match path {
        Some(path) => {
            ImportConfig::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => ImportConfig::default(),
    };
    Ok(config.to_toml()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_render_as_toml() {
        let text = render(None).unwrap();
        assert!(text.contains("headers = ["));
        assert!(text.contains("\"stdlib.h\""));
        assert!(text.contains("search-prefix"));
        assert_eq!(ImportConfig::parse(&text).unwrap(), ImportConfig::default());
    }

    #[test]
    fn file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("keel-import.toml");
        std::fs::write(&good, "headers = [\"zlib.h\"]\n").unwrap();
        assert!(render(Some(&good)).unwrap().contains("\"zlib.h\""));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "headers = [\"\"]\n").unwrap();
        let err = render(Some(&bad)).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));

        assert!(render(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
