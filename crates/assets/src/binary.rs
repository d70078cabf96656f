use std::path::{Path, PathBuf};

use crate::{AssetError, AssetFS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl Located {
    pub fn into_text(self) -> Result<String, AssetError> {
        String::from_utf8(self.bytes).map_err(|_| AssetError::NotText {
            path: self.path.display().to_string(),
        })
    }
}

/// Reads `path` as given, then relative to each search directory in order.
///
/// Absolute paths are only tried as given.
pub fn locate(
    fs: &dyn AssetFS,
    path: &str,
    search_dirs: &[PathBuf],
) -> Result<Located, AssetError> {
    let requested = Path::new(path);
    let mut candidates = vec![requested.to_path_buf()];
    if requested.is_relative() {
        candidates.extend(search_dirs.iter().map(|dir| dir.join(requested)));
    }

    for candidate in &candidates {
        match fs.read(candidate) {
            Ok(bytes) => {
                return Ok(Located {
                    path: candidate.clone(),
                    bytes,
                });
            }
            Err(AssetError::NotFound { .. }) => continue,
            Err(other) => return Err(other),
        }
    }

    if candidates.len() == 1 {
        return Err(AssetError::NotFound {
            path: path.to_string(),
        });
    }
    Err(AssetError::NotFoundInSearchPath {
        path: path.to_string(),
        searched: search_dirs
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}
