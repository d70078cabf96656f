use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::info;

use c816_assets::{AssetFS, StdAssetFS};

use crate::builder::{SegmentOutput, assemble_lines};
use crate::diag::{Diagnostic, RenderOptions, render_diagnostics_with_options};
use crate::parser::parse;
use crate::span::SourceMap;

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    /// Searched in order after a path fails to open as given.
    pub include_dirs: Vec<PathBuf>,
    pub listing: bool,
    pub render: RenderOptions,
}

#[derive(Debug, Clone)]
pub struct AssembleOutput {
    /// Keyed by lowercase segment name, ordered by start address.
    pub segments: IndexMap<String, SegmentOutput>,
    pub listing: Option<String>,
    pub warnings: Vec<Diagnostic>,
    pub rendered_warnings: String,
}

#[derive(Debug, Error)]
#[error("assembly failed")]
pub struct AssembleError {
    pub diagnostics: Vec<Diagnostic>,
    pub rendered: String,
}

pub fn assemble_source(
    source_name: &str,
    source_text: &str,
    options: &AssembleOptions,
) -> Result<AssembleOutput, AssembleError> {
    let fs = StdAssetFS;
    assemble_source_with_fs(source_name, source_text, options, &fs)
}

pub fn assemble_source_with_fs(
    source_name: &str,
    source_text: &str,
    options: &AssembleOptions,
    fs: &dyn AssetFS,
) -> Result<AssembleOutput, AssembleError> {
    let mut source_map = SourceMap::default();
    let source_id = source_map.add_source(source_name, source_text);

    let parsed = parse(source_id, source_name, source_text, &[])
        .map_err(|diagnostics| fail_with_rendered(&source_map, diagnostics, options))?;

    let mut assembly = assemble_lines(
        parsed.lines,
        &mut source_map,
        fs,
        &options.include_dirs,
        options.listing,
    )
    .map_err(|error| fail_with_rendered(&source_map, error.to_diagnostics(), options))?;

    let mut warnings = parsed.warnings;
    warnings.append(&mut assembly.warnings);
    let rendered_warnings = render_diagnostics_with_options(&source_map, &warnings, options.render);
    info!(
        segments = assembly.segments.len(),
        warnings = warnings.len(),
        "assembled {source_name}"
    );

    Ok(AssembleOutput {
        segments: assembly.segments,
        listing: assembly.listing,
        warnings,
        rendered_warnings,
    })
}

/// Reads `path` from disk and assembles it. The file's own directory is searched
/// before the configured include directories.
pub fn assemble_file(
    path: &Path,
    options: &AssembleOptions,
) -> Result<AssembleOutput, AssembleError> {
    let source_name = path.display().to_string();
    let source_text = std::fs::read_to_string(path).map_err(|error| {
        let diagnostic =
            Diagnostic::error_without_span(format!("cannot read '{source_name}': {error}"));
        fail_with_rendered(&SourceMap::default(), vec![diagnostic], options)
    })?;

    let mut options = options.clone();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        options.include_dirs.insert(0, parent.to_path_buf());
    }
    assemble_source(&source_name, &source_text, &options)
}

fn fail_with_rendered(
    source_map: &SourceMap,
    diagnostics: Vec<Diagnostic>,
    options: &AssembleOptions,
) -> AssembleError {
    let rendered = render_diagnostics_with_options(source_map, &diagnostics, options.render);
    AssembleError {
        diagnostics,
        rendered,
    }
}
