use c816_eval::{BinaryOp, Expr, UnaryOp};
use chumsky::{IterParser, Parser as _, input::ValueInput, prelude::SimpleSpan, prelude::just, recursive::recursive};

use crate::lexer::TokenKind;

use super::ParseExtra;

/// One operand of a statement: an expression, or `#expr` for an immediate.
///
/// Precedence, loosest first: `||`, `&&`, prefix `!`, comparisons, `|`, `^`, `&`,
/// shifts, `+ -`, `* / %`, prefix `+ - ~ < >`, `**`.
pub(super) fn operand_parser<'src, I>() -> impl chumsky::Parser<'src, I, Expr, ParseExtra<'src>> + Clone
where
    I: ValueInput<'src, Token = TokenKind, Span = SimpleSpan>,
{
    recursive(|operand| {
        let list = operand
            .clone()
            .separated_by(just(TokenKind::Comma))
            .at_least(1)
            .collect::<Vec<_>>();

        let atom = chumsky::select! {
            TokenKind::Number(number) => Expr::number(number),
            TokenKind::Str(text) => Expr::Str { text, petscii: false },
            TokenKind::PetsciiStr(text) => Expr::Str { text, petscii: true },
            TokenKind::Name(ident) => Expr::name(ident),
        }
        .or(just(TokenKind::Amp)
            .ignore_then(chumsky::select! { TokenKind::Name(ident) => ident })
            .map(Expr::long_name))
        .or(list
            .clone()
            .delimited_by(just(TokenKind::LParen), just(TokenKind::RParen))
            .map(|items| Expr::group(items, false)))
        .or(list
            .delimited_by(just(TokenKind::LBracket), just(TokenKind::RBracket))
            .map(|items| Expr::group(items, true)))
        .labelled("expression")
        .boxed();

        let power = atom
            .clone()
            .then(
                just(TokenKind::StarStar)
                    .to(BinaryOp::Pow)
                    .then(atom)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let unary = chumsky::select! {
            TokenKind::Plus => UnaryOp::Posigate,
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Tilde => UnaryOp::Not,
            TokenKind::Lt => UnaryOp::LowByte,
            TokenKind::Gt => UnaryOp::HighByte,
        }
        .repeated()
        .collect::<Vec<_>>()
        .then(power)
        .map(fold_prefix)
        .boxed();

        let product = unary
            .clone()
            .then(
                chumsky::select! {
                    TokenKind::Star => BinaryOp::Mul,
                    TokenKind::Slash => BinaryOp::Div,
                    TokenKind::Percent => BinaryOp::Mod,
                }
                .then(unary)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let sum = product
            .clone()
            .then(
                chumsky::select! {
                    TokenKind::Plus => BinaryOp::Add,
                    TokenKind::Minus => BinaryOp::Sub,
                }
                .then(product)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let shift = sum
            .clone()
            .then(
                chumsky::select! {
                    TokenKind::LtLt => BinaryOp::Shl,
                    TokenKind::GtGt => BinaryOp::Shr,
                }
                .then(sum)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let bit_and = shift
            .clone()
            .then(
                just(TokenKind::Amp)
                    .to(BinaryOp::And)
                    .then(shift)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let bit_xor = bit_and
            .clone()
            .then(
                just(TokenKind::Caret)
                    .to(BinaryOp::Xor)
                    .then(bit_and)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let bit_or = bit_xor
            .clone()
            .then(
                just(TokenKind::Pipe)
                    .to(BinaryOp::Or)
                    .then(bit_xor)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let comparison = bit_or
            .clone()
            .then(
                chumsky::select! {
                    TokenKind::EqEq => BinaryOp::Eq,
                    TokenKind::BangEq => BinaryOp::Ne,
                    TokenKind::Lt => BinaryOp::Lt,
                    TokenKind::Gt => BinaryOp::Gt,
                    TokenKind::LtEq => BinaryOp::Le,
                    TokenKind::GtEq => BinaryOp::Ge,
                }
                .then(bit_or)
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let logical_not = just(TokenKind::Bang)
            .to(UnaryOp::LogicalNot)
            .repeated()
            .collect::<Vec<_>>()
            .then(comparison)
            .map(fold_prefix)
            .boxed();

        let logical_and = logical_not
            .clone()
            .then(
                just(TokenKind::AmpAmp)
                    .to(BinaryOp::LogicalAnd)
                    .then(logical_not)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        let logical_or = logical_and
            .clone()
            .then(
                just(TokenKind::PipePipe)
                    .to(BinaryOp::LogicalOr)
                    .then(logical_and)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(fold_binary)
            .boxed();

        just(TokenKind::Hash)
            .ignore_then(logical_or.clone())
            .map(Expr::immediate)
            .or(logical_or)
    })
    .boxed()
}

fn fold_binary((lhs, chain): (Expr, Vec<(BinaryOp, Expr)>)) -> Expr {
    chain
        .into_iter()
        .fold(lhs, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
}

fn fold_prefix((ops, inner): (Vec<UnaryOp>, Expr)) -> Expr {
    ops.into_iter()
        .rev()
        .fold(inner, |inner, op| Expr::unary(op, inner))
}
