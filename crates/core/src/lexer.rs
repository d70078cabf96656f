use c816_eval::{Number, Radix, required_bytes};
use logos::Logos;

use crate::diag::Diagnostic;
use crate::span::{SourceId, Span};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip(r"[ \t\r\f]+"))]
#[logos(skip(r";[^\r\n]*", allow_greedy = true))]
#[logos(skip(r"//[^\r\n]*", allow_greedy = true))]
pub enum TokenKind {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("...")]
    Ellipsis,
    #[token("#")]
    Hash,
    #[token("=")]
    Assign,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("**")]
    StarStar,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    LtLt,
    #[token(">>")]
    GtGt,
    #[token("==")]
    EqEq,
    #[token("!=")]
    #[token("<>")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,

    #[regex(r#""(\\"|[^\r\n"])*""#, parse_string)]
    Str(String),

    #[regex(r#"p"(\\"|[^\r\n"])*""#, parse_petscii_string)]
    PetsciiStr(String),

    #[regex(r"(\$|0x)[a-fA-F0-9]+(:[a-fA-F0-9]+)*", parse_hex)]
    #[regex(r"(&|0o)[0-7]+", parse_octal)]
    #[regex(r"(%|0b)[01_]+", parse_binary)]
    #[regex(r"[0-9]+", parse_decimal)]
    Number(Number),

    #[regex(r"[A-Za-z_.][A-Za-z0-9_]*", parse_name)]
    #[regex(r"@[0-9A-Za-z_]+[+-]?", parse_name)]
    #[regex(r"\\([0-9]+|[Liv])", parse_name)]
    Name(String),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Lexes one physical line. `offset` is the byte position of the line within its
/// file so token spans index the whole source.
pub fn lex(source_id: SourceId, input: &str, offset: usize) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut lexer = TokenKind::lexer(input);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();

    while let Some(next) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(source_id, offset + range.start, offset + range.end);
        match next {
            Ok(kind) => {
                tokens.push(Token {
                    kind,
                    span,
                    text: lexer.slice().to_string(),
                });
            }
            Err(_) => {
                let token = format_token_for_message(lexer.slice());
                diagnostics.push(
                    Diagnostic::error(span, format!("unexpected token {token}"))
                        .with_help("remove or fix this token"),
                );
            }
        }
    }

    if diagnostics.is_empty() {
        Ok(tokens)
    } else {
        Err(diagnostics)
    }
}

fn parse_hex(lex: &mut logos::Lexer<TokenKind>) -> Option<Number> {
    let slice = lex.slice();
    let digits = slice
        .strip_prefix("0x")
        .or_else(|| slice.strip_prefix('$'))?
        .replace(':', "");
    let value = i64::from_str_radix(&digits, 16).ok()?;
    let width = u8::try_from(digits.len().div_ceil(2)).ok()?;
    Some(Number::new(value, Radix::Hex, width))
}

fn parse_octal(lex: &mut logos::Lexer<TokenKind>) -> Option<Number> {
    let slice = lex.slice();
    let digits = slice
        .strip_prefix("0o")
        .or_else(|| slice.strip_prefix('&'))?;
    let value = i64::from_str_radix(digits, 8).ok()?;
    Some(Number::new(value, Radix::Oct, required_bytes(value)))
}

fn parse_binary(lex: &mut logos::Lexer<TokenKind>) -> Option<Number> {
    let slice = lex.slice();
    let digits = slice
        .strip_prefix("0b")
        .or_else(|| slice.strip_prefix('%'))?
        .replace('_', "");
    if digits.is_empty() {
        return None;
    }
    let value = i64::from_str_radix(&digits, 2).ok()?;
    let width = u8::try_from(digits.len().div_ceil(8)).ok()?;
    Some(Number::new(value, Radix::Bin, width))
}

fn parse_decimal(lex: &mut logos::Lexer<TokenKind>) -> Option<Number> {
    let value = lex.slice().parse::<i64>().ok()?;
    Some(Number::decimal(value))
}

fn parse_name(lex: &mut logos::Lexer<TokenKind>) -> String {
    lex.slice().to_string()
}

fn parse_string(lex: &mut logos::Lexer<TokenKind>) -> String {
    let slice = lex.slice();
    unescape_quotes(&slice[1..slice.len() - 1])
}

fn parse_petscii_string(lex: &mut logos::Lexer<TokenKind>) -> String {
    let slice = lex.slice();
    unescape_quotes(&slice[2..slice.len() - 1])
}

// Only `\"` is an escape; other backslashes stay, so include paths survive.
fn unescape_quotes(content: &str) -> String {
    content.replace("\\\"", "\"")
}

fn format_token_for_message(token: &str) -> String {
    let escaped: String = token.chars().flat_map(char::escape_default).collect();
    format!("'{escaped}'")
}
