mod actions;
pub mod ast;
pub mod builder;
pub mod diag;
pub mod driver;
pub mod error;
pub mod lexer;
pub mod listing;
pub mod parser;
pub mod span;

pub use builder::{Assembly, CodeChunk, SegmentOutput};
pub use diag::{Diagnostic, RenderOptions};
pub use driver::{
    AssembleError, AssembleOptions, AssembleOutput, assemble_file, assemble_source,
    assemble_source_with_fs,
};
pub use error::{AsmError, AsmErrorKind};
