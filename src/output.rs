use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GeneratorError, Result};

/// The complete output of one generation run, held in memory until every
/// synthesis step has succeeded. Nothing touches the disk on failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeMap<PathBuf, String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generated Rust source file: parse the token text and render it
    /// through prettyplease so regeneration is byte-identical and readable.
    pub fn add_rust_source(&mut self, path: impl Into<PathBuf>, source: &str) -> Result<()> {
        let path = path.into();
        let file = syn::parse_file(source).map_err(|e| GeneratorError::Render {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.files.insert(path, prettyplease::unparse(&file));
        Ok(())
    }

    /// Add a non-Rust file verbatim.
    pub fn add_verbatim(&mut self, path: impl Into<PathBuf>, content: String) {
        self.files.insert(path.into(), content);
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(Path::new(path)).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_path(), content.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file under `root`, creating directories as needed.
    /// Regeneration overwrites in place.
    pub fn write_all(&self, root: &Path) -> Result<()> {
        for (path, content) in &self.files {
            let full = root.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&full, content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_sources_are_formatted() {
        let mut files = FileSet::new();
        files
            .add_rust_source("src/lib.rs", "pub mod entities ; pub mod routes ;")
            .unwrap();

        let content = files.get("src/lib.rs").unwrap();
        assert_eq!(content, "pub mod entities;\npub mod routes;\n");
    }

    #[test]
    fn invalid_source_is_a_render_error() {
        let mut files = FileSet::new();
        let err = files.add_rust_source("src/broken.rs", "pub fn {").unwrap_err();
        assert!(matches!(err, GeneratorError::Render { .. }));
        assert!(files.is_empty());
    }
}
