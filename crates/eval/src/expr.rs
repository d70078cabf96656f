use std::fmt;

use indexmap::IndexMap;

use crate::{EvalError, Number, required_bytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Posigate,
    Not,
    LowByte,
    HighByte,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Mod,
    And,
    Xor,
    Or,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "**",
            Self::Mod => "%",
            Self::And => "&",
            Self::Xor => "^",
            Self::Or => "|",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::LogicalAnd => "&&",
            Self::LogicalOr => "||",
        }
    }

    /// Masking operators may prove that fewer bytes are needed than either operand states.
    fn can_shrink(self) -> bool {
        matches!(self, Self::And | Self::Shr)
    }

    fn is_boolean(self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::Ne
                | Self::Lt
                | Self::Gt
                | Self::Le
                | Self::Ge
                | Self::LogicalAnd
                | Self::LogicalOr
        )
    }
}

/// Resolution environment consulted for names that carry no bound value.
pub trait NameScope {
    fn resolve(&self, name: &str, long: bool) -> Option<Number>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyScope;

impl NameScope for EmptyScope {
    fn resolve(&self, _name: &str, _long: bool) -> Option<Number> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub ident: String,
    /// Written as `&name`: the full 24-bit address is kept instead of the bank offset.
    pub long: bool,
    value: Option<Box<Expr>>,
}

impl Name {
    pub fn new(ident: impl Into<String>, long: bool) -> Self {
        Self {
            ident: ident.into(),
            long,
            value: None,
        }
    }

    pub fn value(&self) -> Option<&Expr> {
        self.value.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    /// Binds `value` to this name.
    ///
    /// Rebinding is accepted when both values evaluate to the same integer or when
    /// either side cannot be evaluated yet; the first binding is kept.
    pub fn bind(&mut self, value: Expr) -> Result<(), EvalError> {
        let Some(existing) = &self.value else {
            self.value = Some(Box::new(value));
            return Ok(());
        };

        if let (Ok(existing), Ok(value)) = (existing.eval(), value.eval()) {
            if existing != value {
                return Err(EvalError::BindConflict {
                    name: self.ident.clone(),
                    existing,
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn matches(&self, ident: &str) -> bool {
        self.ident.eq_ignore_ascii_case(ident)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(Number),
    Name(Name),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `( ... )` or, when `long`, `[ ... ]`.
    Group {
        items: Vec<Expr>,
        long: bool,
    },
    Str {
        text: String,
        petscii: bool,
    },
    Immediate(Box<Expr>),
}

impl Expr {
    pub fn number(value: Number) -> Self {
        Self::Number(value)
    }

    pub fn name(ident: impl Into<String>) -> Self {
        Self::Name(Name::new(ident, false))
    }

    pub fn long_name(ident: impl Into<String>) -> Self {
        Self::Name(Name::new(ident, true))
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Self::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn group(items: Vec<Expr>, long: bool) -> Self {
        Self::Group { items, long }
    }

    pub fn immediate(expr: Expr) -> Self {
        Self::Immediate(Box::new(expr))
    }

    pub fn as_name(&self) -> Option<&Name> {
        match self {
            Self::Name(name) => Some(name),
            _ => None,
        }
    }

    /// The structural form of this expression: bound names are followed to their value,
    /// so a macro parameter carrying `#1` or `(ptr), y` reads as that operand.
    pub fn shape(&self) -> &Expr {
        match self {
            Self::Name(name) => name.value().map(Expr::shape).unwrap_or(self),
            other => other,
        }
    }

    /// True for a bare, unbound reference to `ident` (case-insensitive), such as a
    /// register operand.
    pub fn is_name(&self, ident: &str) -> bool {
        matches!(self.shape(), Self::Name(name) if !name.is_bound() && name.matches(ident))
    }

    pub fn is_group(&self) -> bool {
        matches!(self.shape(), Self::Group { .. })
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self.shape(), Self::Immediate(_))
    }

    pub fn eval(&self) -> Result<i64, EvalError> {
        self.eval_with(&EmptyScope)
    }

    pub fn eval_with(&self, scope: &dyn NameScope) -> Result<i64, EvalError> {
        self.collapse_with(scope).map(|number| number.value)
    }

    pub fn collapse(&self) -> Result<Number, EvalError> {
        self.collapse_with(&EmptyScope)
    }

    /// Evaluates to a literal whose width follows the operator width rules.
    pub fn collapse_with(&self, scope: &dyn NameScope) -> Result<Number, EvalError> {
        match self {
            Self::Number(number) => Ok(*number),
            Self::Name(name) => match &name.value {
                Some(value) => value.collapse_with(scope),
                None => scope
                    .resolve(&name.ident, name.long)
                    .ok_or_else(|| EvalError::UnresolvedName {
                        name: name.ident.clone(),
                    }),
            },
            Self::Group { items, .. } => match items.as_slice() {
                [single] => single.collapse_with(scope),
                _ => Err(EvalError::GroupValue { count: items.len() }),
            },
            Self::Str { .. } => Err(EvalError::StringValue),
            Self::Immediate(inner) => inner.collapse_with(scope),
            Self::Unary { op, expr } => {
                let operand = expr.collapse_with(scope)?;
                collapse_unary(*op, operand)
            }
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.collapse_with(scope)?;
                let rhs = rhs.collapse_with(scope)?;
                collapse_binary(*op, lhs, rhs)
            }
        }
    }

    /// Upper-bound byte width estimate usable before labels are known.
    ///
    /// Returns `None` only for operands that have no width at all (strings and
    /// multi-item groups).
    pub fn guess_size(&self) -> Option<u8> {
        match self {
            Self::Number(number) => Some(number.width),
            Self::Name(name) => match &name.value {
                Some(value) => value
                    .guess_size()
                    .map(|size| if name.long { size.max(3) } else { size }),
                None if name.long => Some(3),
                None => Some(2),
            },
            Self::Group { items, .. } => match items.as_slice() {
                [single] => single.guess_size(),
                _ => None,
            },
            Self::Str { .. } => None,
            Self::Immediate(inner) => inner.guess_size(),
            Self::Unary { op, expr } => match op {
                UnaryOp::Negate | UnaryOp::Posigate | UnaryOp::Not => expr.guess_size(),
                UnaryOp::LowByte | UnaryOp::HighByte | UnaryOp::LogicalNot => Some(1),
            },
            Self::Binary { op, lhs, rhs } => {
                if let Ok(number) = self.collapse() {
                    return Some(number.width);
                }
                if op.is_boolean() {
                    return Some(1);
                }
                let left = lhs.guess_size()?;
                let right = rhs.collapse().ok();
                match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Pow => {
                        Some(left.max(rhs.guess_size()?))
                    }
                    BinaryOp::Div => Some(left),
                    BinaryOp::Mod => Some(
                        right
                            .map(|right| required_bytes(right.value.saturating_sub(1)))
                            .unwrap_or(left),
                    ),
                    BinaryOp::And => Some(left.min(rhs.guess_size()?)),
                    BinaryOp::Xor | BinaryOp::Or => Some(left.max(rhs.guess_size()?)),
                    BinaryOp::Shl => Some(match right {
                        Some(right) if right.value > 0 => {
                            let extra = ((right.value.min(64) + 7) / 8) as u8;
                            left.saturating_add(extra).min(8)
                        }
                        _ => left,
                    }),
                    BinaryOp::Shr => Some(match right {
                        Some(right) if right.value > 0 => {
                            let dropped = (right.value / 8).min(8) as u8;
                            left.saturating_sub(dropped).max(1)
                        }
                        _ => left,
                    }),
                    _ => Some(1),
                }
            }
        }
    }

    /// Every name in the tree, bound values included, grouped by identifier.
    pub fn find_referenced_names(&self) -> IndexMap<String, Vec<&Name>> {
        let mut names: IndexMap<String, Vec<&Name>> = IndexMap::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, names: &mut IndexMap<String, Vec<&'a Name>>) {
        match self {
            Self::Number(_) | Self::Str { .. } => {}
            Self::Name(name) => {
                names.entry(name.ident.clone()).or_default().push(name);
                if let Some(value) = &name.value {
                    value.collect_names(names);
                }
            }
            Self::Unary { expr, .. } | Self::Immediate(expr) => expr.collect_names(names),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_names(names);
                rhs.collect_names(names);
            }
            Self::Group { items, .. } => {
                for item in items {
                    item.collect_names(names);
                }
            }
        }
    }

    /// Calls `visit` on every name that has no value yet, descending into bound values.
    pub fn visit_unbound_names<E>(
        &mut self,
        visit: &mut impl FnMut(&mut Name) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Self::Number(_) | Self::Str { .. } => Ok(()),
            Self::Name(name) => match name.value.as_deref_mut() {
                Some(value) => value.visit_unbound_names(visit),
                None => visit(name),
            },
            Self::Unary { expr, .. } | Self::Immediate(expr) => expr.visit_unbound_names(visit),
            Self::Binary { lhs, rhs, .. } => {
                lhs.visit_unbound_names(visit)?;
                rhs.visit_unbound_names(visit)
            }
            Self::Group { items, .. } => {
                for item in items {
                    item.visit_unbound_names(visit)?;
                }
                Ok(())
            }
        }
    }
}

fn collapse_unary(op: UnaryOp, operand: Number) -> Result<Number, EvalError> {
    let number = match op {
        UnaryOp::Negate => Number::new(
            operand.value.checked_neg().ok_or(EvalError::Overflow)?,
            operand.radix,
            operand.width,
        ),
        UnaryOp::Posigate => operand,
        UnaryOp::Not => Number::new(operand.complement(), operand.radix, operand.width),
        UnaryOp::LowByte => Number::new(operand.value & 0xFF, operand.radix, 1),
        UnaryOp::HighByte => Number::new((operand.value >> 8) & 0xFF, operand.radix, 1),
        UnaryOp::LogicalNot => Number::new(i64::from(operand.value == 0), operand.radix, 1),
    };
    Ok(number)
}

fn collapse_binary(op: BinaryOp, lhs: Number, rhs: Number) -> Result<Number, EvalError> {
    let value = match op {
        BinaryOp::Add => lhs.checked_add(rhs)?,
        BinaryOp::Sub => lhs.checked_sub(rhs)?,
        BinaryOp::Mul => lhs.checked_mul(rhs)?,
        BinaryOp::Div => lhs.checked_div(rhs)?,
        BinaryOp::Pow => lhs.checked_pow(rhs)?,
        BinaryOp::Mod => lhs.checked_rem(rhs)?,
        BinaryOp::And => lhs.value & rhs.value,
        BinaryOp::Xor => lhs.value ^ rhs.value,
        BinaryOp::Or => lhs.value | rhs.value,
        BinaryOp::Shl => lhs.checked_shl(rhs)?,
        BinaryOp::Shr => lhs.checked_shr(rhs)?,
        BinaryOp::Eq => i64::from(lhs.value == rhs.value),
        BinaryOp::Ne => i64::from(lhs.value != rhs.value),
        BinaryOp::Lt => i64::from(lhs.value < rhs.value),
        BinaryOp::Gt => i64::from(lhs.value > rhs.value),
        BinaryOp::Le => i64::from(lhs.value <= rhs.value),
        BinaryOp::Ge => i64::from(lhs.value >= rhs.value),
        BinaryOp::LogicalAnd => i64::from(lhs.is_truthy() && rhs.is_truthy()),
        BinaryOp::LogicalOr => i64::from(lhs.is_truthy() || rhs.is_truthy()),
    };

    let width = if op.is_boolean() {
        1
    } else if op.can_shrink() {
        required_bytes(value)
    } else {
        required_bytes(value).max(lhs.width).max(rhs.width)
    };
    Ok(Number::new(value, lhs.radix, width))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Name(name) => {
                if name.long {
                    write!(f, "&{}", name.ident)
                } else {
                    write!(f, "{}", name.ident)
                }
            }
            Self::Unary { op, expr } => {
                let symbol = match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::Posigate => "+",
                    UnaryOp::Not => "~",
                    UnaryOp::LowByte => "<",
                    UnaryOp::HighByte => ">",
                    UnaryOp::LogicalNot => "!",
                };
                write!(f, "{symbol}{expr}")
            }
            Self::Binary { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
            Self::Group { items, long } => {
                let (open, close) = if *long { ('[', ']') } else { ('(', ')') };
                write!(f, "{open}")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
            Self::Str { text, petscii } => {
                if *petscii {
                    write!(f, "p\"{text}\"")
                } else {
                    write!(f, "\"{text}\"")
                }
            }
            Self::Immediate(inner) => write!(f, "#{inner}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Radix;

    fn dec(value: i64) -> Expr {
        Expr::Number(Number::decimal(value))
    }

    fn hex(value: i64, width: u8) -> Expr {
        Expr::Number(Number::hex(value, width))
    }

    fn bin(value: i64, width: u8) -> Expr {
        Expr::Number(Number::new(value, Radix::Bin, width))
    }

    struct Labels(Vec<(&'static str, i64)>);

    impl NameScope for Labels {
        fn resolve(&self, name: &str, long: bool) -> Option<Number> {
            self.0.iter().find(|(label, _)| *label == name).map(|(_, value)| {
                if long {
                    Number::hex(*value, 3)
                } else {
                    Number::hex(*value & 0xFFFF, 2)
                }
            })
        }
    }

    #[test]
    fn evaluates_basic_arithmetic() {
        let expr = Expr::binary(BinaryOp::Add, dec(5), dec(42));
        assert_eq!(expr.eval(), Ok(47));
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::unary(UnaryOp::Negate, dec(5)),
            Expr::unary(UnaryOp::Posigate, dec(42)),
        );
        assert_eq!(expr.eval(), Ok(37));
        assert_eq!(Expr::binary(BinaryOp::Pow, dec(3), dec(4)).eval(), Ok(81));
        assert_eq!(Expr::binary(BinaryOp::Mod, dec(117), dec(6)).eval(), Ok(3));
        assert_eq!(Expr::binary(BinaryOp::Div, dec(169), dec(3)).eval(), Ok(56));
    }

    #[test]
    fn evaluates_bitwise_operators() {
        let f1 = || bin(0xF1, 1);
        let af = || hex(0xAF, 1);
        assert_eq!(Expr::binary(BinaryOp::And, f1(), af()).eval(), Ok(0xA1));
        assert_eq!(Expr::binary(BinaryOp::Xor, f1(), af()).eval(), Ok(0x5E));
        assert_eq!(Expr::binary(BinaryOp::Or, f1(), af()).eval(), Ok(0xFF));

        let not = Expr::binary(
            BinaryOp::Or,
            Expr::unary(UnaryOp::Not, f1()),
            Expr::unary(UnaryOp::Not, af()),
        );
        assert_eq!(not.eval(), Ok(0x5E));

        let shifted = Expr::binary(BinaryOp::Shl, Expr::unary(UnaryOp::Not, bin(0x71, 1)), dec(2));
        assert_eq!(shifted.eval(), Ok(0x238));
        let shifted = Expr::binary(BinaryOp::Shr, Expr::unary(UnaryOp::Not, bin(0x71, 1)), dec(3));
        assert_eq!(shifted.eval(), Ok(0x11));
    }

    #[test]
    fn groups_evaluate_to_their_single_item() {
        let expr = Expr::binary(
            BinaryOp::Mul,
            Expr::unary(
                UnaryOp::Negate,
                Expr::group(vec![Expr::binary(BinaryOp::Mul, dec(5), dec(5))], false),
            ),
            dec(3),
        );
        assert_eq!(expr.eval(), Ok(-75));
        assert_eq!(
            Expr::group(vec![dec(5), dec(20)], false).eval(),
            Err(EvalError::GroupValue { count: 2 })
        );
    }

    #[test]
    fn and_can_shrink_but_or_cannot() {
        let a = hex(0x1234, 2);
        let b = hex(0x0F, 1);
        let and = Expr::binary(BinaryOp::And, a.clone(), b.clone())
            .collapse()
            .expect("collapse");
        assert_eq!(and.value, 0x04);
        assert_eq!(and.width, 1);

        let or = Expr::binary(BinaryOp::Or, a.clone(), b.clone())
            .collapse()
            .expect("collapse");
        assert!(or.width >= 2);
        let xor = Expr::binary(BinaryOp::Xor, a.clone(), b.clone())
            .collapse()
            .expect("collapse");
        assert!(xor.width >= 2);
        let shl = Expr::binary(BinaryOp::Shl, hex(0x01, 2), dec(1))
            .collapse()
            .expect("collapse");
        assert_eq!(shl.width, 2);
        let shr = Expr::binary(BinaryOp::Shr, hex(0x1234, 2), dec(8))
            .collapse()
            .expect("collapse");
        assert_eq!((shr.value, shr.width), (0x12, 1));
    }

    #[test]
    fn unary_width_rules() {
        let word = hex(0x1234, 2);
        let low = Expr::unary(UnaryOp::LowByte, word.clone())
            .collapse()
            .expect("collapse");
        assert_eq!((low.value, low.width), (0x34, 1));
        let high = Expr::unary(UnaryOp::HighByte, word.clone())
            .collapse()
            .expect("collapse");
        assert_eq!((high.value, high.width), (0x12, 1));
        let negated = Expr::unary(UnaryOp::Negate, word)
            .collapse()
            .expect("collapse");
        assert_eq!(negated.width, 2);
    }

    #[test]
    fn comparisons_yield_single_byte_booleans() {
        let cmp = Expr::binary(BinaryOp::Lt, hex(0x1234, 2), hex(0x2000, 2))
            .collapse()
            .expect("collapse");
        assert_eq!((cmp.value, cmp.width), (1, 1));
        let both = Expr::binary(BinaryOp::LogicalAnd, dec(1), dec(0))
            .collapse()
            .expect("collapse");
        assert_eq!(both.value, 0);
    }

    #[test]
    fn unresolved_name_fails_until_bound() {
        let mut expr = Expr::binary(BinaryOp::Add, Expr::name("counter"), dec(1));
        assert_eq!(
            expr.eval(),
            Err(EvalError::UnresolvedName {
                name: "counter".to_string()
            })
        );
        expr.visit_unbound_names(&mut |name: &mut Name| name.bind(hex(0x10, 1)))
            .expect("bind");
        assert_eq!(expr.eval(), Ok(0x11));
    }

    #[test]
    fn binding_is_idempotent_for_equal_values() {
        let mut name = Name::new("value", false);
        name.bind(dec(3)).expect("first bind");
        name.bind(Expr::binary(BinaryOp::Add, dec(1), dec(2)))
            .expect("same value");
        assert_eq!(
            name.bind(dec(4)),
            Err(EvalError::BindConflict {
                name: "value".to_string(),
                existing: 3,
                value: 4
            })
        );
    }

    #[test]
    fn resolves_labels_through_scope() {
        let labels = Labels(vec![("start", 0x01_C000)]);
        assert_eq!(Expr::name("start").eval_with(&labels), Ok(0xC000));
        assert_eq!(Expr::long_name("start").eval_with(&labels), Ok(0x01_C000));
        assert!(Expr::name("missing").eval_with(&labels).is_err());
    }

    #[test]
    fn guesses_sizes_without_labels() {
        assert_eq!(Expr::name("label").guess_size(), Some(2));
        assert_eq!(Expr::long_name("label").guess_size(), Some(3));
        assert_eq!(
            Expr::binary(BinaryOp::Add, Expr::name("label"), hex(1, 1)).guess_size(),
            Some(2)
        );
        assert_eq!(
            Expr::binary(BinaryOp::And, Expr::name("label"), hex(0xFF, 1)).guess_size(),
            Some(1)
        );
        assert_eq!(
            Expr::unary(UnaryOp::LowByte, Expr::name("label")).guess_size(),
            Some(1)
        );
        assert_eq!(
            Expr::binary(BinaryOp::Mod, Expr::name("label"), dec(16)).guess_size(),
            Some(1)
        );
        assert_eq!(
            Expr::binary(BinaryOp::Shr, Expr::long_name("label"), dec(16)).guess_size(),
            Some(1)
        );
        assert_eq!(Expr::group(vec![dec(1), dec(2)], false).guess_size(), None);
    }

    #[test]
    fn left_shifts_grow_by_whole_bytes() {
        let shifted = |by| Expr::binary(BinaryOp::Shl, Expr::name("label"), dec(by)).guess_size();
        assert_eq!(shifted(1), Some(3));
        assert_eq!(shifted(8), Some(3));
        assert_eq!(shifted(9), Some(4));
        assert_eq!(shifted(i64::MAX), Some(8));
    }

    #[test]
    fn finds_names_inside_bound_values() {
        let mut param = Name::new("\\0", false);
        param
            .bind(Expr::binary(BinaryOp::Mul, Expr::name("data"), dec(2)))
            .expect("bind");
        let expr = Expr::unary(UnaryOp::LowByte, Expr::Name(param));
        let names = expr.find_referenced_names();
        assert_eq!(names.keys().cloned().collect::<Vec<_>>(), vec!["\\0", "data"]);
    }

    #[test]
    fn shape_follows_bound_parameters() {
        let mut param = Name::new("\\0", false);
        param.bind(Expr::immediate(hex(1, 1))).expect("bind");
        let operand = Expr::Name(param);
        assert!(operand.is_immediate());
        assert_eq!(operand.guess_size(), Some(1));

        let mut register = Name::new("\\1", false);
        register.bind(Expr::name("X")).expect("bind");
        assert!(Expr::Name(register).is_name("x"));
    }

    #[test]
    fn displays_source_like_text() {
        let expr = Expr::immediate(Expr::binary(BinaryOp::Add, Expr::name("base"), hex(2, 1)));
        assert_eq!(expr.to_string(), "#base + 0x02");
        let group = Expr::group(vec![hex(0x10, 1), Expr::name("x")], false);
        assert_eq!(group.to_string(), "(0x10, x)");
    }
}
