mod binary;
mod charset;
mod traits;

pub use crate::binary::{Located, locate};
pub use crate::charset::{petscii, petscii_byte};
pub use crate::traits::{AssetError, AssetFS, MemoryAssetFS, StdAssetFS};
