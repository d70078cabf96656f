use c816_assets::AssetError;
use c816_eval::EvalError;
use thiserror::Error;

use crate::ast::Location;
use crate::diag::Diagnostic;

/// Every way an assembly can fail once the source has parsed.
#[derive(Debug, Error)]
pub enum AsmErrorKind {
    #[error("cannot redefine segment '{name}'")]
    SegmentRedefinition { name: String },
    #[error("statement requires a segment")]
    MissingSegment,
    #[error("{reason}: {name}")]
    ReservedName { name: String, reason: &'static str },
    #[error("{reason}: {name}")]
    LabelRedefinition { name: String, reason: &'static str },
    #[error("{message}")]
    InvalidName { message: String },
    #[error("error processing equate '{name}': {source}")]
    EquateDefinition {
        name: String,
        #[source]
        source: EvalError,
    },
    #[error("{message}")]
    IncorrectParameterCount { message: String },
    #[error("{message}")]
    InvalidParameter { message: String },
    #[error("{message}")]
    FeatureNotImplemented { message: String },
    #[error("segment \"{segment}\" reaches beyond segment limits")]
    SegmentOverflow { segment: String },
    #[error("bytes at 0x{address:06X} in segment \"{segment}\" are written twice")]
    ByteOverlap { segment: String, address: i64 },
    #[error("unknown opcode '{mnemonic}'")]
    UnknownOpcode { mnemonic: String },
    #[error("could not determine addressing mode for '{mnemonic}'")]
    UnknownAddressingMode { mnemonic: String },
    #[error("{message}")]
    RelativeBranchOutOfRange { message: String },
    #[error("{message}")]
    ParameterTooLarge { message: String },
    #[error("argument {position} redefines label as global again")]
    GlobalRedefinition { position: usize },
    #[error("label '{name}' can't be global")]
    InvalidGlobal { name: String },
    #[error("name \"{name}\" used but not defined")]
    UndefinedLabel { name: String },
    #[error("ambiguous reference to '{name}'")]
    AmbiguousReference { name: String },
    #[error("unknown segment name or compiler directive '{name}'")]
    UnknownCompilerDirective { name: String },
    #[error("cannot collapse name: {name}")]
    NameNotEvaluatable { name: String },
    #[error("{message}")]
    UnmatchedFlowControl { message: String },
    #[error("{message}")]
    UnexpectedFlowControl { message: String },
    #[error("{message}")]
    Macro { message: String },
    #[error("MACRO requires label definition")]
    MissingMacroLabel,
    #[error("macro '{name}' is expanded inside its own expansion")]
    MacroRecursion { name: String },
    #[error("VALOOP used outside of macro")]
    VaLoopWithoutMacro,
    #[error("use of ellipsis (...) is not valid here")]
    EllipsisNotValid,
    #[error("could not locate file '{path}'")]
    FileNotFound { path: String },
    #[error("cannot read '{path}'")]
    Asset {
        path: String,
        #[source]
        source: AssetError,
    },
    #[error("cannot parse included file '{file}'")]
    IncludedSyntax {
        file: String,
        diagnostics: Vec<Diagnostic>,
    },
    #[error("action emitted {actual} bytes after being sized at {expected}")]
    SizeMismatch { expected: i64, actual: i64 },
    #[error("{source}")]
    Eval {
        #[from]
        source: EvalError,
    },
}

impl AsmErrorKind {
    pub fn at(self, location: &Location) -> AsmError {
        AsmError {
            kind: self,
            location: location.clone(),
        }
    }

    /// A failed file lookup: missing files get their own kind.
    pub(crate) fn asset(path: &str, source: AssetError) -> Self {
        match source {
            AssetError::NotFound { .. } | AssetError::NotFoundInSearchPath { .. } => {
                Self::FileNotFound {
                    path: path.to_string(),
                }
            }
            source => Self::Asset {
                path: path.to_string(),
                source,
            },
        }
    }

    fn help(&self) -> Option<&'static str> {
        match self {
            Self::MissingSegment => Some("select a segment first, for example '.code' after '.segment \"code\", ...'"),
            Self::UnknownCompilerDirective { .. } => {
                Some("declare the segment with '.segment' before switching to it")
            }
            Self::AmbiguousReference { .. } => {
                Some("add '+' to refer forward or '-' to refer backward")
            }
            Self::SegmentOverflow { .. } => Some("enlarge the segment or move code elsewhere"),
            Self::VaLoopWithoutMacro => Some("'.valoop' walks the variadic arguments of a macro"),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
#[error("{location}: {kind}")]
pub struct AsmError {
    pub kind: AsmErrorKind,
    pub location: Location,
}

impl AsmError {
    /// The diagnostics this error stands for. Syntax errors of an included file
    /// carry their own.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic> {
        if let AsmErrorKind::IncludedSyntax { diagnostics, .. } = &self.kind {
            return diagnostics.clone();
        }

        let mut diagnostic = Diagnostic::error(self.location.span, self.kind.to_string());
        if let Some(help) = self.kind.help() {
            diagnostic = diagnostic.with_help(help);
        }
        for site in self.location.included_from.iter().rev() {
            diagnostic = diagnostic.with_note(format!("included from {}:{}", site.file, site.line));
        }
        vec![diagnostic]
    }
}

pub type AsmResult<T> = Result<T, AsmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IncludeSite;
    use crate::diag::Supplemental;
    use crate::span::{SourceId, Span};

    fn location() -> Location {
        Location {
            file: "inner.s".to_string(),
            line: 4,
            span: Span::new(SourceId(1), 10, 20),
            included_from: vec![
                IncludeSite {
                    file: "main.s".to_string(),
                    line: 2,
                },
                IncludeSite {
                    file: "middle.s".to_string(),
                    line: 7,
                },
            ],
        }
    }

    #[test]
    fn displays_file_and_line() {
        let error = AsmErrorKind::UnknownOpcode {
            mnemonic: "foo".to_string(),
        }
        .at(&location());
        assert_eq!(error.to_string(), "inner.s:4: unknown opcode 'foo'");
    }

    #[test]
    fn include_chain_becomes_notes_innermost_first() {
        let error = AsmErrorKind::MissingSegment.at(&location());
        let diagnostics = error.to_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        let notes: Vec<_> = diagnostics[0]
            .supplements
            .iter()
            .filter_map(|supplement| match supplement {
                Supplemental::Note(note) => Some(note.as_str()),
                Supplemental::Help(_) => None,
            })
            .collect();
        assert_eq!(
            notes,
            vec!["included from middle.s:7", "included from main.s:2"]
        );
        assert_eq!(diagnostics[0].primary, Some(Span::new(SourceId(1), 10, 20)));
    }
}
