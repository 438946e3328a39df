//! Module Source
//!
//! Text definitions of executable units in the WebAssembly text format.
//!
//! Sources come from two places: a `.wat` file written by hand, or the
//! [`FillLoop`] template which renders the benchmark loop. Either way the
//! text is immutable once built and is consumed by the compiler.

pub mod template;

pub use template::{FillLoop, MemoryDecl, StoredValue, BENCH_INNER, BENCH_OUTER, DEFAULT_EXPORT};

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Immutable module text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
    text: String,
}

impl ModuleSource {
    /// Wrap an existing text blob
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Read a `.wat` file from disk
    pub fn from_file(path: &Path) -> io::Result<Self> {
        fs::read_to_string(path).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for ModuleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for ModuleSource {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<&str> for ModuleSource {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(module)").unwrap();
        file.flush().unwrap();

        let source = ModuleSource::from_file(file.path()).unwrap();
        assert_eq!(source.as_str(), "(module)");
        assert_eq!(source.len(), 8);
    }

    #[test]
    fn test_whitespace_is_empty() {
        assert!(ModuleSource::new("  \n\t").is_empty());
        assert!(!ModuleSource::from("(module)").is_empty());
    }
}
