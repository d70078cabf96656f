//! Turns the segment map produced by `c816_core` into output files: a flat memory
//! image laid out by file offset, or that image as Intel HEX records.

use std::path::PathBuf;

use thiserror::Error;

mod config;
mod render;
mod types;

pub use config::{ProjectConfig, load_config};
pub use render::{intel_hex, memory_image, render_output};
pub use types::{OutputFormat, OutputOptions};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to read project config '{}'", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse project config '{}': {source}", .path.display())]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}
