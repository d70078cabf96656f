use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{LinkError, OutputFormat};

/// Per-project defaults read from a RON file. Every field is optional and command
/// line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub unused_byte: Option<u8>,
    #[serde(default)]
    pub ihex_strip: Option<bool>,
    #[serde(default)]
    pub listing: Option<bool>,
}

impl ProjectConfig {
    /// Relative include directories are taken from `base`.
    fn rebase(mut self, base: &Path) -> Self {
        for dir in &mut self.include_dirs {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }
}

pub fn load_config(path: &Path) -> Result<ProjectConfig, LinkError> {
    let text = std::fs::read_to_string(path).map_err(|source| LinkError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ProjectConfig = ron::from_str(&text).map_err(|source| LinkError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(match path.parent() {
        Some(base) if !base.as_os_str().is_empty() => config.rebase(base),
        _ => config,
    })
}
