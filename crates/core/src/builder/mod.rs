mod build;
mod names;
mod segment;

use std::path::PathBuf;

use c816_assets::AssetFS;
use c816_eval::{Expr, Number};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, trace};

use crate::actions::{Action, FlowFrame};
use crate::ast::{Line, Location};
use crate::diag::Diagnostic;
use crate::error::{AsmErrorKind, AsmResult};
use crate::listing::{Listing, format_rows};
use crate::span::SourceMap;

pub(crate) use self::build::{Capture, MacroDefinition};
pub(crate) use self::names::MacroFrame;
pub use self::segment::{CodeChunk, Direction, LabelDeclaration, LabelReference, Segment};

/// One segment of the assembled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentOutput {
    pub code: Vec<CodeChunk>,
    pub size: i64,
    pub start: i64,
    /// Negative when the segment is not part of the output image.
    pub file_offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Keyed by lowercase segment name, ordered by start address.
    pub segments: IndexMap<String, SegmentOutput>,
    pub listing: Option<String>,
    pub warnings: Vec<Diagnostic>,
}

/// Runs the four stages over parsed lines: build actions, validate, finalize labels,
/// generate.
pub fn assemble_lines(
    lines: Vec<Line>,
    sources: &mut SourceMap,
    fs: &dyn AssetFS,
    include_dirs: &[PathBuf],
    listing: bool,
) -> AsmResult<Assembly> {
    let mut context = Context::new(sources, fs, include_dirs);
    let mut actions = context.build(lines)?;
    debug!(actions = actions.len(), "built actions");

    context.validate(&mut actions)?;
    context.finalize_labels()?;
    context.generate(&mut actions, listing)?;
    Ok(context.into_assembly())
}

/// Everything the passes share. Actions receive it mutably in `validate` and
/// `generate`; nested bodies recurse back through [`Context::validate_one`] and
/// [`Context::generate_one`].
pub(crate) struct Context<'a> {
    sources: &'a mut SourceMap,
    fs: &'a dyn AssetFS,
    include_dirs: &'a [PathBuf],
    warnings: Vec<Diagnostic>,

    // build
    actions: Vec<Action>,
    captures: Vec<Capture>,
    macros: FxHashMap<String, MacroDefinition>,
    equates: FxHashMap<String, Number>,
    declared_globals: FxHashSet<String>,
    declared_labels: FxHashSet<String>,

    // validate and generate
    segments: IndexMap<String, Segment>,
    global_requests: FxHashMap<String, String>,
    global_labels: FxHashMap<String, String>,
    segment: Option<String>,
    pub(crate) address: i64,
    pub(crate) acc16: bool,
    pub(crate) idx16: bool,
    pub(crate) flow: Vec<FlowFrame>,
    open_flow: Vec<usize>,
    pub(crate) frames: Vec<MacroFrame>,
    sizes: Vec<i64>,
    emitted: usize,
    resolved: FxHashMap<String, FxHashMap<(String, i64), i64>>,
    listing: Option<Listing>,
}

impl<'a> Context<'a> {
    fn new(sources: &'a mut SourceMap, fs: &'a dyn AssetFS, include_dirs: &'a [PathBuf]) -> Self {
        Self {
            sources,
            fs,
            include_dirs,
            warnings: Vec::new(),
            actions: Vec::new(),
            captures: Vec::new(),
            macros: FxHashMap::default(),
            equates: FxHashMap::default(),
            declared_globals: FxHashSet::default(),
            declared_labels: FxHashSet::default(),
            segments: IndexMap::new(),
            global_requests: FxHashMap::default(),
            global_labels: FxHashMap::default(),
            segment: None,
            address: 0,
            acc16: false,
            idx16: false,
            flow: Vec::new(),
            open_flow: Vec::new(),
            frames: Vec::new(),
            sizes: Vec::new(),
            emitted: 0,
            resolved: FxHashMap::default(),
            listing: None,
        }
    }

    fn reset_cursor(&mut self) {
        self.segment = None;
        self.address = 0;
        self.acc16 = false;
        self.idx16 = false;
    }

    fn validate(&mut self, actions: &mut [Action]) -> AsmResult<()> {
        debug!("validate pass");
        self.reset_cursor();
        self.flow.clear();
        self.open_flow.clear();
        self.sizes.clear();

        for action in actions.iter_mut() {
            self.validate_one(action)?;
        }

        if let Some(&open) = self.open_flow.last() {
            let frame = &self.flow[open];
            return Err(AsmErrorKind::UnexpectedFlowControl {
                message: format!("flow control {} not terminated", frame.name()),
            }
            .at(&frame.location));
        }
        Ok(())
    }

    pub(crate) fn validate_one(&mut self, action: &mut Action) -> AsmResult<()> {
        let size = action.validate(self)?;
        if size > 0 {
            trace!(
                segment = self.segment.as_deref().unwrap_or_default(),
                address = self.address,
                size,
                "sized action"
            );
            self.advance(size, action.location(), true)?;
        }
        self.sizes.push(size);
        Ok(())
    }

    fn advance(&mut self, size: i64, location: &Location, validating: bool) -> AsmResult<()> {
        let end = self.address.checked_add(size);
        let segment = self.current_segment_mut(location)?;
        let Some(address) = end.filter(|address| *address <= segment.end) else {
            let name = segment.name.clone();
            if validating {
                error!(segment = %name, %location, "segment reaches beyond its limits");
            }
            return Err(AsmErrorKind::SegmentOverflow { segment: name }.at(location));
        };
        segment.last_build_address = address;
        self.address = address;
        Ok(())
    }

    fn finalize_labels(&mut self) -> AsmResult<()> {
        debug!(segments = self.segments.len(), "finalize labels");
        let mut resolved = FxHashMap::default();
        for (key, segment) in &self.segments {
            let mut table = FxHashMap::default();
            for reference in segment.references() {
                let (stem, direction) = segment::split_direction(&reference.name);
                let declaration = segment
                    .label(stem)
                    .or_else(|| self.global_label(stem))
                    .ok_or_else(|| {
                        AsmErrorKind::UndefinedLabel {
                            name: stem.to_string(),
                        }
                        .at(&reference.location)
                    })?;
                let address =
                    segment::resolve_address(&declaration.addresses, reference.address, direction)
                        .ok_or_else(|| {
                            AsmErrorKind::AmbiguousReference {
                                name: stem.to_string(),
                            }
                            .at(&reference.location)
                        })?;
                trace!(name = %reference.name, reference = reference.address, address, "resolved label");
                table.insert((reference.name.clone(), reference.address), address);
            }
            resolved.insert(key.clone(), table);
        }
        self.resolved = resolved;
        Ok(())
    }

    fn global_label(&self, name: &str) -> Option<&LabelDeclaration> {
        let key = self.global_labels.get(name)?;
        self.segments.get(key)?.label(name)
    }

    fn generate(&mut self, actions: &mut [Action], listing: bool) -> AsmResult<()> {
        debug!(listing, "generate pass");
        self.reset_cursor();
        self.emitted = 0;
        self.listing = listing.then(Listing::default);
        for segment in self.segments.values_mut() {
            segment.last_build_address = segment.start;
            segment.clear_bytes();
        }

        for action in actions.iter_mut() {
            self.generate_one(action)?;
        }
        Ok(())
    }

    pub(crate) fn generate_one(&mut self, action: &mut Action) -> AsmResult<()> {
        let bytes = action.generate(self)?;
        let location = action.location();

        let expected = self.sizes.get(self.emitted).copied().unwrap_or_default();
        self.emitted += 1;
        if bytes.len() as i64 != expected {
            return Err(AsmErrorKind::SizeMismatch {
                expected,
                actual: bytes.len() as i64,
            }
            .at(location));
        }

        if !bytes.is_empty() {
            let address = self.address;
            self.current_segment_mut(location)?
                .set_bytes(address, &bytes)
                .map_err(|kind| kind.at(location))?;
            self.advance(bytes.len() as i64, location, false)?;
        }
        Ok(())
    }

    fn into_assembly(self) -> Assembly {
        let mut ordered: Vec<(&String, &Segment)> = self.segments.iter().collect();
        ordered.sort_by_key(|(_, segment)| segment.start);

        let segments = ordered
            .iter()
            .map(|(_, segment)| {
                (
                    segment.name.to_lowercase(),
                    SegmentOutput {
                        code: segment.code_chunks(),
                        size: segment.size,
                        start: segment.start,
                        file_offset: segment.file_offset,
                    },
                )
            })
            .collect();

        let order: Vec<&str> = ordered.iter().map(|(key, _)| key.as_str()).collect();
        let listing = self.listing.map(|listing| listing.finish(order));

        Assembly {
            segments,
            listing,
            warnings: self.warnings,
        }
    }

    pub(crate) fn add_segment(&mut self, segment: Segment) -> AsmResult<()> {
        let key = segment.name.to_uppercase();
        if self.segments.contains_key(&key) {
            return Err(AsmErrorKind::SegmentRedefinition { name: key }.at(&segment.location));
        }
        debug!(segment = %segment.name, start = segment.start, size = segment.size, "created segment");
        self.segments.insert(key, segment);
        Ok(())
    }

    pub(crate) fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.get(&name.to_uppercase())
    }

    /// Makes `name` the current segment and moves the cursor to where it left off.
    pub(crate) fn enter_segment(&mut self, name: &str, location: &Location) -> AsmResult<()> {
        let key = name.to_uppercase();
        let Some(segment) = self.segments.get(&key) else {
            return Err(AsmErrorKind::UnknownCompilerDirective { name: key }.at(location));
        };
        trace!(segment = %segment.name, address = segment.last_build_address, "entered segment");
        self.address = segment.last_build_address;
        self.segment = Some(key);
        Ok(())
    }

    pub(crate) fn require_segment(&self, location: &Location) -> AsmResult<&Segment> {
        self.segment
            .as_ref()
            .and_then(|key| self.segments.get(key))
            .ok_or_else(|| AsmErrorKind::MissingSegment.at(location))
    }

    pub(crate) fn current_segment_mut(&mut self, location: &Location) -> AsmResult<&mut Segment> {
        match self.segment.as_ref() {
            Some(key) => self
                .segments
                .get_mut(key)
                .ok_or_else(|| AsmErrorKind::MissingSegment.at(location)),
            None => Err(AsmErrorKind::MissingSegment.at(location)),
        }
    }

    pub(crate) fn equate(&self, name: &str) -> Option<Number> {
        self.equates.get(name).copied()
    }

    pub(crate) fn macro_definition(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub(crate) fn fs(&self) -> &'a dyn AssetFS {
        self.fs
    }

    pub(crate) fn include_dirs(&self) -> &'a [PathBuf] {
        self.include_dirs
    }

    pub(crate) fn push_flow(&mut self, frame: FlowFrame) -> usize {
        let id = self.flow.len();
        self.flow.push(frame);
        self.open_flow.push(id);
        id
    }

    pub(crate) fn pop_flow(&mut self) -> Option<usize> {
        self.open_flow.pop()
    }

    /// Collapses an operand at generate time, with labels resolved for the current
    /// action's address.
    pub(crate) fn collapse(&self, expr: &Expr, location: &Location) -> AsmResult<Number> {
        let scope = names::LabelScope {
            table: self.segment.as_ref().and_then(|key| self.resolved.get(key)),
            address: self.address,
        };
        expr.collapse_with(&scope)
            .map_err(|source| names::eval_error(source).at(location))
    }

    pub(crate) fn listing_enabled(&self) -> bool {
        self.listing.is_some()
    }

    fn listing_target(&mut self) -> Option<(&mut Listing, &str, i64)> {
        let listing = self.listing.as_mut()?;
        let segment = self.segment.as_deref()?;
        Some((listing, segment, self.address))
    }

    pub(crate) fn list_header(&mut self, text: &str) {
        if let Some(listing) = self.listing.as_mut() {
            listing.write_header(text);
        }
    }

    pub(crate) fn list_block(&mut self) {
        if let Some((listing, segment, address)) = self.listing_target() {
            listing.start_block(segment, address);
        }
    }

    pub(crate) fn list_text(&mut self, text: &str) {
        if let Some((listing, segment, address)) = self.listing_target() {
            listing.write(segment, address, text);
        }
    }

    pub(crate) fn list_row(&mut self, address: i64, bytes: &[u8], inst: &str, comment: Option<&str>) {
        if let Some((listing, segment, _)) = self.listing_target() {
            listing.row(segment, address, bytes, inst, comment);
        }
    }

    /// Data rows of four bytes starting at the cursor.
    pub(crate) fn list_rows(&mut self, address: i64, bytes: &[u8], inst: &str) {
        if let Some((listing, segment, _)) = self.listing_target() {
            listing.write(segment, address, &format_rows(address, bytes, inst));
        }
    }

    pub(crate) fn list_right(&mut self, comment: &str) {
        if let Some((listing, segment, address)) = self.listing_target() {
            listing.right_comment(segment, address, comment);
        }
    }

    pub(crate) fn list_left(&mut self, text: &str) {
        if let Some((listing, segment, address)) = self.listing_target() {
            listing.left_line(segment, address, text);
        }
    }
}
