//! Pre-built artifacts
//!
//! Binary modules assembled ahead of time (`loopbench asm`) and read back by
//! the `artifact` strategy. Loading is strict about existence and the binary
//! magic so that a wrong path fails here, before anything is timed.

use crate::compile::WASM_MAGIC;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("artifact not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a binary wasm module")]
    NotWasm(PathBuf),
}

/// Read a pre-built binary module
pub fn load_artifact(path: &Path) -> Result<Vec<u8>, LoadError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    if !bytes.starts_with(&WASM_MAGIC) {
        return Err(LoadError::NotWasm(path.to_path_buf()));
    }

    tracing::debug!(path = %path.display(), size = bytes.len(), "loaded artifact");
    Ok(bytes)
}

/// Write a binary module, creating parent directories as needed
pub fn write_artifact(path: &Path, wasm: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, wasm)
}
