use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub trait AssetFS: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, AssetError>;
}

#[derive(Debug, Default)]
pub struct StdAssetFS;

impl AssetFS for StdAssetFS {
    fn read(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                AssetError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })
    }
}

/// In-memory file table, keyed by the exact path string used to read it.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssetFS {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryAssetFS {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl AssetFS for MemoryAssetFS {
    fn read(&self, path: &Path) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound {
                path: path.display().to_string(),
            })
    }
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("file '{path}' not found")]
    NotFound { path: String },
    #[error("'{path}' was not found in any of: {searched}")]
    NotFoundInSearchPath { path: String, searched: String },
    #[error("failed to read '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{path}' is not valid UTF-8 text")]
    NotText { path: String },
}
