use c816_assets::locate;
use c816_eval::{Expr, Name, Number, required_bytes};

use crate::ast::Location;
use crate::builder::{Context, Segment};
use crate::error::{AsmErrorKind, AsmResult};

/// `.SEGMENT "name", start, size, file_offset`
#[derive(Debug, Clone)]
pub(crate) struct CreateSegment {
    pub name: String,
    pub start: i64,
    pub size: i64,
    pub file_offset: i64,
    pub location: Location,
}

impl CreateSegment {
    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.add_segment(Segment::new(
            self.name.clone(),
            self.start,
            self.size,
            self.file_offset,
            self.location.clone(),
        ))?;
        Ok(0)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        let file_offset = if self.file_offset < 0 {
            "\"not present\"".to_string()
        } else {
            format!("0x{:04X}", self.file_offset)
        };
        ctx.list_header(&format!(
            "\t\t;; segment \"{}\" size = 0x{:04X} start = 0x{:04X} file_offset = {}\n",
            self.name, self.size, self.start, file_offset
        ));
        Ok(Vec::new())
    }
}

/// `.name` for a declared segment: continue emitting where that segment left off.
#[derive(Debug, Clone)]
pub(crate) struct ChangeSegment {
    pub name: String,
    pub location: Location,
}

impl ChangeSegment {
    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.enter_segment(&self.name, &self.location)?;
        Ok(0)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        ctx.enter_segment(&self.name, &self.location)?;
        if ctx.listing_enabled() {
            let name = ctx
                .segment(&self.name)
                .map(|segment| segment.name.clone())
                .unwrap_or_else(|| self.name.clone());
            let banner = format!(
                "\n        ;; segment \"{}\", org = 0x{:04X}\n        ;;\n        ;; Accumulator/Memory = {}-bit, Index registers = {}-bit\n        ;;\n",
                name,
                ctx.address,
                if ctx.acc16 { 16 } else { 8 },
                if ctx.idx16 { 16 } else { 8 },
            );
            ctx.list_block();
            ctx.list_text(&banner);
        }
        Ok(Vec::new())
    }
}

/// `.ORG address`. `START` names the start of the current segment.
#[derive(Debug, Clone)]
pub(crate) struct SetOrigin {
    operand: Expr,
    pub location: Location,
    origin: i64,
}

impl SetOrigin {
    pub fn new(operand: Expr, location: Location) -> Self {
        Self {
            operand,
            location,
            origin: 0,
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        let start = ctx.require_segment(&self.location)?.start;
        let start = Number::hex(start, required_bytes(start).max(2));

        ctx.bind_macro_arguments(&mut self.operand, &self.location)?;
        self.operand
            .visit_unbound_names(&mut |name: &mut Name| {
                let value = if name.matches("START") {
                    start
                } else if let Some(value) = ctx.equate(&name.ident) {
                    value
                } else {
                    return Err(AsmErrorKind::NameNotEvaluatable {
                        name: name.ident.clone(),
                    });
                };
                name.bind(Expr::number(value))
                    .map_err(|source| AsmErrorKind::Eval { source })
            })
            .map_err(|kind| kind.at(&self.location))?;

        let origin = self.operand.collapse().map_err(|_| {
            AsmErrorKind::InvalidParameter {
                message: "cannot evaluate argument to ORG".to_string(),
            }
            .at(&self.location)
        })?;
        self.origin = origin.value;
        ctx.address = self.origin;
        Ok(0)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        ctx.require_segment(&self.location)?;
        ctx.address = self.origin;
        ctx.list_block();
        ctx.list_left(&format!(";; set org = 0x{:04X}", self.origin));
        ctx.list_left(";;");
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModeRegister {
    Accumulator,
    Index,
}

/// `.A8`, `.A16`, `.I8` and `.I16`.
#[derive(Debug, Clone)]
pub(crate) struct SetWidth {
    pub register: ModeRegister,
    pub wide: bool,
    pub location: Location,
}

impl SetWidth {
    pub fn apply(&self, ctx: &mut Context<'_>) {
        match self.register {
            ModeRegister::Accumulator => ctx.acc16 = self.wide,
            ModeRegister::Index => ctx.idx16 = self.wide,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct DeclareLabel {
    pub name: String,
    pub location: Location,
}

impl DeclareLabel {
    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.declare_label_here(&self.name, &self.location)?;
        Ok(0)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        ctx.list_left(&format!(";; {}:", self.name));
        Ok(Vec::new())
    }
}

/// `.GLOBAL name`, one action per name.
#[derive(Debug, Clone)]
pub(crate) struct SetGlobal {
    pub name: String,
    pub location: Location,
}

/// `.GLOBALALL`: every later label of the current segment is global.
#[derive(Debug, Clone)]
pub(crate) struct SetGlobalAll {
    pub location: Location,
}

impl SetGlobalAll {
    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.current_segment_mut(&self.location)?.global_all = true;
        Ok(0)
    }
}

/// `.INCBIN "file"`. The file is read at validate time.
#[derive(Debug, Clone)]
pub(crate) struct IncludeBinary {
    path: String,
    pub location: Location,
    data: Vec<u8>,
}

impl IncludeBinary {
    pub fn new(path: String, location: Location) -> Self {
        Self {
            path,
            location,
            data: Vec::new(),
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.require_segment(&self.location)?;
        let located = locate(ctx.fs(), &self.path, ctx.include_dirs())
            .map_err(|source| AsmErrorKind::asset(&self.path, source).at(&self.location))?;
        self.data = located.bytes;
        Ok(self.data.len() as i64)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        ctx.list_rows(ctx.address, &self.data, &format!(".INCBIN \"{}\"", self.path));
        Ok(self.data.clone())
    }
}

/// Marks where an `.INCLUDE`d file's lines start; the lines themselves are
/// already part of the action list.
#[derive(Debug, Clone)]
pub(crate) struct IncludeSource {
    path: String,
    pub location: Location,
}

impl IncludeSource {
    pub fn new(path: String, location: Location) -> Self {
        Self { path, location }
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        ctx.list_left(&format!(";; .include \"{}\"", self.path));
        Ok(Vec::new())
    }
}
