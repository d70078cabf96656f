mod expr;
mod preprocess;

use crate::ast::{Equate, IncludeSite, Line, Location, Statement};
use crate::diag::Diagnostic;
use crate::lexer::{TokenKind, lex};
use crate::span::{SourceId, Span, Spanned};
use chumsky::{
    IterParser, Parser as _,
    error::{RichPattern, RichReason},
    extra,
    input::{Input as _, Stream, ValueInput},
    prelude::{Rich, SimpleSpan, end, just},
};

use self::expr::operand_parser;
use self::preprocess::strip_block_comments;

type ParseError<'src> = Rich<'src, TokenKind>;
type ParseExtra<'src> = extra::Err<ParseError<'src>>;

#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    pub lines: Vec<Line>,
    pub warnings: Vec<Diagnostic>,
}

enum RawLine {
    Equate(Equate),
    Statements {
        statements: Vec<Statement>,
        trailing_separator: Option<Span>,
    },
}

/// Splits `source_text` into lines and parses each one. Blank lines are dropped.
///
/// Every line is lexed and parsed independently so one bad line does not hide the
/// errors of the next.
pub fn parse(
    source_id: SourceId,
    file_name: &str,
    source_text: &str,
    included_from: &[IncludeSite],
) -> Result<ParsedSource, Vec<Diagnostic>> {
    let (text, warnings) = strip_block_comments(source_id, source_text);
    let mut lines = Vec::new();
    let mut diagnostics = Vec::new();
    let mut offset = 0;

    for (index, raw) in text.split('\n').enumerate() {
        let line_offset = offset;
        offset += raw.len() + 1;
        let location = Location {
            file: file_name.to_string(),
            line: index + 1,
            span: Span::new(source_id, line_offset, line_offset + raw.trim_end().len()),
            included_from: included_from.to_vec(),
        };
        match parse_line(source_id, raw, line_offset, location) {
            Ok(Some(line)) => lines.push(line),
            Ok(None) => {}
            Err(mut errors) => diagnostics.append(&mut errors),
        }
    }

    if diagnostics.is_empty() {
        Ok(ParsedSource { lines, warnings })
    } else {
        Err(diagnostics)
    }
}

fn parse_line(
    source_id: SourceId,
    text: &str,
    offset: usize,
    location: Location,
) -> Result<Option<Line>, Vec<Diagnostic>> {
    let tokens = lex(source_id, text, offset)?;
    let Some(end_offset) = tokens.last().map(|token| token.span.end) else {
        return Ok(None);
    };
    if let [first, second, ..] = tokens.as_slice() {
        if let TokenKind::Name(name) = &first.kind {
            let label_only = matches!(second.kind, TokenKind::Colon | TokenKind::Assign);
            if first.span.start == offset && !label_only {
                let span = Span::new(source_id, first.span.start, end_offset);
                return Err(vec![
                    Diagnostic::error(
                        span,
                        format!("invalid syntax: unexpected words after '{name}'"),
                    )
                    .with_help("a name in the first column declares a label"),
                ]);
            }
        }
    }

    let token_stream = Stream::from_iter(tokens.into_iter().map(|token| {
        let span = (token.span.start..token.span.end).into();
        (token.kind, span)
    }))
    .map((end_offset..end_offset).into(), |(kind, span): (_, _)| {
        (kind, span)
    });

    let (output, errors) = line_parser(source_id)
        .parse(token_stream)
        .into_output_errors();
    if !errors.is_empty() {
        return Err(errors
            .into_iter()
            .map(|error| rich_error_to_diagnostic(source_id, error, "invalid syntax"))
            .collect());
    }

    match output {
        Some(raw) => finish_line(raw, offset, location).map(Some).map_err(|error| vec![error]),
        None => Ok(None),
    }
}

/// Applies the column rules: a first name starting the line is a label declaration,
/// and a trailing `:` may only close such a label.
fn finish_line(raw: RawLine, offset: usize, location: Location) -> Result<Line, Diagnostic> {
    let (mut statements, trailing_separator) = match raw {
        RawLine::Equate(equate) => {
            return Ok(Line {
                label: None,
                equate: Some(equate),
                statements: Vec::new(),
                location,
            });
        }
        RawLine::Statements {
            statements,
            trailing_separator,
        } => (statements, trailing_separator),
    };

    // Words after a first-column name were rejected before parsing.
    let label = if statements
        .first()
        .is_some_and(|first| first.name.span.start == offset)
    {
        Some(statements.remove(0).name)
    } else {
        None
    };

    if let Some(separator) = trailing_separator {
        if !statements.is_empty() {
            return Err(Diagnostic::error(
                separator,
                "invalid syntax: trailing statement separator",
            ));
        }
    }

    Ok(Line {
        label,
        equate: None,
        statements,
        location,
    })
}

fn line_parser<'src, I>(source_id: SourceId) -> impl chumsky::Parser<'src, I, RawLine, ParseExtra<'src>>
where
    I: ValueInput<'src, Token = TokenKind, Span = SimpleSpan>,
{
    let equate = spanned(name_parser(), source_id)
        .then_ignore(just(TokenKind::Assign))
        .then(operand_parser())
        .map(|(name, expr)| RawLine::Equate(Equate { name, expr }));

    let statement = statement_parser(source_id);
    let statements = statement
        .clone()
        .then(
            just(TokenKind::Colon)
                .ignore_then(statement)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then(
            just(TokenKind::Colon)
                .map_with(move |_, extra| {
                    let span: SimpleSpan = extra.span();
                    Span::new(source_id, span.start, span.end)
                })
                .or_not(),
        )
        .map(|((first, rest), trailing_separator)| {
            let mut statements = Vec::with_capacity(rest.len() + 1);
            statements.push(first);
            statements.extend(rest);
            RawLine::Statements {
                statements,
                trailing_separator,
            }
        });

    equate.or(statements).then_ignore(end())
}

fn statement_parser<'src, I>(
    source_id: SourceId,
) -> impl chumsky::Parser<'src, I, Statement, ParseExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = TokenKind, Span = SimpleSpan>,
{
    let operands = operand_parser()
        .then(
            just(TokenKind::Comma)
                .ignore_then(operand_parser())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(|(first, rest)| {
            let mut operands = Vec::with_capacity(rest.len() + 1);
            operands.push(first);
            operands.extend(rest);
            operands
        })
        .then(
            just(TokenKind::Comma)
                .then(just(TokenKind::Ellipsis))
                .or_not()
                .map(|ellipsis| ellipsis.is_some()),
        );
    let bare_ellipsis = just(TokenKind::Ellipsis).to((Vec::new(), true));

    spanned(name_parser(), source_id)
        .then(bare_ellipsis.or(operands).or_not())
        .map_with(move |(name, tail), extra| {
            let (operands, ellipsis) = tail.unwrap_or_default();
            let span: SimpleSpan = extra.span();
            Statement {
                name,
                operands,
                ellipsis,
                span: Span::new(source_id, span.start, span.end),
            }
        })
        .boxed()
}

fn name_parser<'src, I>() -> impl chumsky::Parser<'src, I, String, ParseExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = TokenKind, Span = SimpleSpan>,
{
    chumsky::select! { TokenKind::Name(value) => value }
        .labelled("name")
        .boxed()
}

fn spanned<'src, I, T, P>(
    parser: P,
    source_id: SourceId,
) -> impl chumsky::Parser<'src, I, Spanned<T>, ParseExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = TokenKind, Span = SimpleSpan>,
    P: chumsky::Parser<'src, I, T, ParseExtra<'src>> + Clone,
{
    parser.map_with(move |node, extra| {
        let span: SimpleSpan = extra.span();
        Spanned::new(node, Span::new(source_id, span.start, span.end))
    })
}

fn rich_error_to_diagnostic(
    source_id: SourceId,
    error: Rich<'_, TokenKind>,
    context: &str,
) -> Diagnostic {
    let range = error.span().into_range();
    let span = Span::new(source_id, range.start, range.end);
    let message = match error.reason() {
        RichReason::Custom(custom) => format!("{context}: {custom}"),
        RichReason::ExpectedFound { expected, found } => {
            let expected = format_expected_patterns(expected);
            let found = found
                .as_deref()
                .map(token_kind_message)
                .unwrap_or_else(|| "end of input".to_string());
            format!("{context}: expected {expected}, found {found}")
        }
    };
    Diagnostic::error(span, message)
}

fn format_expected_patterns(expected: &[RichPattern<'_, TokenKind>]) -> String {
    let mut values = Vec::new();
    for pattern in expected {
        let text = rich_pattern_message(pattern);
        if !values.contains(&text) {
            values.push(text);
        }
    }

    match values.split_last() {
        None => "something else".to_string(),
        Some((single, [])) => single.clone(),
        Some((last, [first])) => format!("{first} or {last}"),
        Some((last, head)) => format!("{}, or {last}", head.join(", ")),
    }
}

fn rich_pattern_message(pattern: &RichPattern<'_, TokenKind>) -> String {
    match pattern {
        RichPattern::Token(token) => token_kind_message(token),
        RichPattern::Label(label) => label.to_string(),
        RichPattern::Identifier(identifier) => format!("'{}'", identifier),
        RichPattern::Any => "any token".to_string(),
        RichPattern::SomethingElse => "something else".to_string(),
        RichPattern::EndOfInput => "end of input".to_string(),
    }
}

fn token_kind_message(token: &TokenKind) -> String {
    match token {
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Ellipsis => "'...'".to_string(),
        TokenKind::Hash => "'#'".to_string(),
        TokenKind::Assign => "'='".to_string(),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::StarStar => "'**'".to_string(),
        TokenKind::Star => "'*'".to_string(),
        TokenKind::Slash => "'/'".to_string(),
        TokenKind::Percent => "'%'".to_string(),
        TokenKind::Amp => "'&'".to_string(),
        TokenKind::Pipe => "'|'".to_string(),
        TokenKind::Caret => "'^'".to_string(),
        TokenKind::Tilde => "'~'".to_string(),
        TokenKind::LtLt => "'<<'".to_string(),
        TokenKind::GtGt => "'>>'".to_string(),
        TokenKind::EqEq => "'=='".to_string(),
        TokenKind::BangEq => "'!='".to_string(),
        TokenKind::LtEq => "'<='".to_string(),
        TokenKind::GtEq => "'>='".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Bang => "'!'".to_string(),
        TokenKind::AmpAmp => "'&&'".to_string(),
        TokenKind::PipePipe => "'||'".to_string(),
        TokenKind::Str(_) | TokenKind::PetsciiStr(_) => "string literal".to_string(),
        TokenKind::Number(_) => "number literal".to_string(),
        TokenKind::Name(value) => format!("name '{value}'"),
    }
}
