use std::fmt;

use c816_eval::Expr;

use crate::span::{Span, Spanned};

/// The `.INCLUDE` line a file was pulled in from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeSite {
    pub file: String,
    pub line: usize,
}

/// Where a line came from: file, 1-based line number, its span in the source map and
/// the chain of includes that led to it, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub span: Span,
    pub included_from: Vec<IncludeSite>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One `name operand, operand, ...` unit. Several may share a line, separated by `:`.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub name: Spanned<String>,
    pub operands: Vec<Expr>,
    /// Trailing `...`, only meaningful on `.MACRO`.
    pub ellipsis: bool,
    pub span: Span,
}

impl Statement {
    pub fn is(&self, directive: &str) -> bool {
        self.name.node.eq_ignore_ascii_case(directive)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equate {
    pub name: Spanned<String>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// A name written in column 1.
    pub label: Option<Spanned<String>>,
    pub equate: Option<Equate>,
    pub statements: Vec<Statement>,
    pub location: Location,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.equate.is_none() && self.statements.is_empty()
    }
}
