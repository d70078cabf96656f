use c816_eval::{EvalError, Expr, Name, NameScope, Number, required_bytes};
use c816_isa65816::is_mnemonic;
use rustc_hash::FxHashMap;

use super::Context;
use crate::ast::Location;
use crate::error::{AsmErrorKind, AsmResult};

/// Names that can never become labels, equates or macros.
pub(crate) const RESERVED: [&str; 16] = [
    "A", "X", "Y", "S", ".", "IF", "ELSE", "ENDIF", "DO", "UNTIL", "FOREVER", "WHILE", "ENDWHILE",
    "SWITCH", "CASE", "ENDSWITCH",
];

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED.iter().any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Bindings visible inside one macro expansion.
#[derive(Debug, Clone)]
pub(crate) struct MacroFrame {
    pub name: String,
    pub params: Vec<String>,
    pub varargs: bool,
    pub args: Vec<Expr>,
    /// Index and value of the variadic argument the current `.VALOOP` round visits.
    pub valoop: Option<(usize, Expr)>,
}

impl MacroFrame {
    pub fn vararg_count(&self) -> usize {
        self.args.len().saturating_sub(self.params.len())
    }

    fn argument(&self, ident: &str) -> Result<Option<Expr>, AsmErrorKind> {
        let Some(special) = ident.strip_prefix('\\') else {
            let position = self.params.iter().position(|param| param == ident);
            return Ok(position.and_then(|position| self.args.get(position).cloned()));
        };

        if !self.varargs {
            return Err(AsmErrorKind::InvalidName {
                message: "cannot use vararg values if the macro doesn't accept varargs".to_string(),
            });
        }

        let outside = |what: &str| AsmErrorKind::InvalidName {
            message: format!("invalid use of \\{what} outside of VALOOP"),
        };
        match special {
            "L" => Ok(Some(Expr::number(Number::decimal(self.vararg_count() as i64)))),
            "i" => match &self.valoop {
                Some((index, _)) => Ok(Some(Expr::number(Number::decimal(*index as i64)))),
                None => Err(outside("i")),
            },
            "v" => match &self.valoop {
                Some((_, value)) => Ok(Some(value.clone())),
                None => Err(outside("v")),
            },
            index => Ok(index
                .parse::<usize>()
                .ok()
                .and_then(|index| self.args.get(self.params.len() + index).cloned())),
        }
    }
}

/// Looks up label addresses recorded by the finalize stage for the action at
/// `address`.
pub(crate) struct LabelScope<'a> {
    pub table: Option<&'a FxHashMap<(String, i64), i64>>,
    pub address: i64,
}

impl NameScope for LabelScope<'_> {
    fn resolve(&self, name: &str, long: bool) -> Option<Number> {
        let value = *self.table?.get(&(name.to_string(), self.address))?;
        if long {
            Some(Number::hex(value, required_bytes(value).max(3)))
        } else {
            let value = value & 0xFFFF;
            Some(Number::hex(value, required_bytes(value)))
        }
    }
}

/// Maps an evaluation failure to the assembler error it means.
pub(crate) fn eval_error(source: EvalError) -> AsmErrorKind {
    match source {
        EvalError::UnresolvedName { name } => AsmErrorKind::UndefinedLabel { name },
        source => AsmErrorKind::Eval { source },
    }
}

fn bind(name: &mut Name, value: Expr) -> Result<(), AsmErrorKind> {
    name.bind(value).map_err(|source| AsmErrorKind::Eval { source })
}

impl Context<'_> {
    /// Binds macro parameters of the innermost expansion inside `expr`.
    pub(crate) fn bind_macro_arguments(&self, expr: &mut Expr, location: &Location) -> AsmResult<()> {
        let Some(frame) = self.frames.last() else {
            return Ok(());
        };
        expr.visit_unbound_names(&mut |name: &mut Name| match frame.argument(&name.ident)? {
            Some(value) => bind(name, value),
            None => Ok(()),
        })
        .map_err(|kind| kind.at(location))
    }

    /// Binds equates and `.` inside `expr`. With a `fallback`, every other name is
    /// bound to it as well.
    pub(crate) fn bind_equates(
        &self,
        expr: &mut Expr,
        fallback: Option<Number>,
        location: &Location,
    ) -> AsmResult<()> {
        let here = self.current_address();
        expr.visit_unbound_names(&mut |name: &mut Name| {
            let value = if name.ident == "." {
                Some(here)
            } else {
                self.equates.get(&name.ident).copied().or(fallback)
            };
            match value {
                Some(value) => bind(name, Expr::number(value)),
                None => Ok(()),
            }
        })
        .map_err(|kind| kind.at(location))
    }

    /// `.` as a literal at least two bytes wide.
    pub(crate) fn current_address(&self) -> Number {
        Number::hex(self.address, required_bytes(self.address).max(2))
    }

    /// Prepares an operand for sizing: macro arguments, equates and `.` get bound and
    /// every other name is recorded as a label reference at the current address.
    pub(crate) fn resolve_operand(&mut self, expr: &mut Expr, location: &Location) -> AsmResult<()> {
        self.bind_macro_arguments(expr, location)?;
        self.bind_equates(expr, None, location)?;
        self.reference_labels(expr, location)
    }

    fn reference_labels(&mut self, expr: &Expr, location: &Location) -> AsmResult<()> {
        let address = self.address;
        let segment = self.current_segment_mut(location)?;
        for (ident, names) in expr.find_referenced_names() {
            if is_reserved(&ident) || names.iter().all(|name| name.is_bound()) {
                continue;
            }
            segment.add_reference(&ident, address, location);
        }
        Ok(())
    }

    /// Fails when `name` is already a label of `segment` or a global label, is
    /// reserved, or is taken by an equate, a mnemonic or a macro.
    pub(crate) fn verify_label_available(
        &self,
        name: &str,
        segment: Option<&str>,
        location: &Location,
    ) -> AsmResult<()> {
        let fail = |kind: AsmErrorKind| Err(kind.at(location));
        let reserved = |reason| {
            fail(AsmErrorKind::ReservedName {
                name: name.to_string(),
                reason,
            })
        };
        let taken = |reason| {
            fail(AsmErrorKind::LabelRedefinition {
                name: name.to_string(),
                reason,
            })
        };

        if name.starts_with('.') {
            return reserved("cannot declare labels or equates using a starting period ('.')");
        }
        let in_segment = segment
            .and_then(|key| self.segments.get(key))
            .is_some_and(|segment| segment.label(name).is_some());
        if (in_segment && !name.starts_with('@')) || self.global_labels.contains_key(name) {
            return taken("label redefined");
        }
        if is_reserved(name) {
            return reserved("reserved name used as label");
        }
        if self.equates.contains_key(name) {
            return taken("label is already assigned to an equate");
        }
        if is_mnemonic(name) {
            return reserved("instruction name used as label");
        }
        if self.macros.contains_key(name) {
            return taken("label is already assigned to a macro");
        }
        Ok(())
    }

    /// Declares `name` at the cursor in the current segment. Temp labels may be
    /// declared again and collect every address.
    pub(crate) fn declare_label_here(&mut self, name: &str, location: &Location) -> AsmResult<()> {
        let address = self.address;
        let key = self.require_segment(location)?.name.to_uppercase();

        let name = if name.starts_with('@') {
            let stem = name.trim_end_matches(['+', '-']);
            if self.current_segment_mut(location)?.redeclare_temp_label(stem, address) {
                return Ok(());
            }
            stem
        } else {
            name
        };
        self.verify_label_available(name, Some(&key), location)?;

        let segment = self.current_segment_mut(location)?;
        segment.declare_label(name, address, location);
        if segment.global_all || self.global_requests.get(name) == Some(&key) {
            self.global_labels.insert(name.to_string(), key);
        }
        Ok(())
    }

    /// Marks `name` global for the current segment. A label already declared there
    /// becomes visible right away, a later one when it is declared.
    pub(crate) fn set_global(&mut self, name: &str, location: &Location) -> AsmResult<()> {
        let segment = self.require_segment(location)?;
        let key = segment.name.to_uppercase();
        let declared = segment.label(name).is_some();
        self.global_requests.insert(name.to_string(), key.clone());
        if declared {
            self.global_labels.insert(name.to_string(), key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(varargs: bool) -> MacroFrame {
        MacroFrame {
            name: "m".to_string(),
            params: vec!["dst".to_string()],
            varargs,
            args: vec![
                Expr::number(Number::decimal(1)),
                Expr::number(Number::decimal(2)),
                Expr::number(Number::decimal(3)),
            ],
            valoop: None,
        }
    }

    #[test]
    fn named_and_positional_arguments() {
        let frame = frame(true);
        assert_eq!(frame.argument("dst").ok().flatten(), Some(Expr::number(Number::decimal(1))));
        assert_eq!(frame.argument("\\1").ok().flatten(), Some(Expr::number(Number::decimal(3))));
        assert_eq!(frame.argument("\\L").ok().flatten(), Some(Expr::number(Number::decimal(2))));
        assert_eq!(frame.argument("\\5").ok().flatten(), None);
        assert_eq!(frame.argument("other").ok().flatten(), None);
    }

    #[test]
    fn vararg_names_need_varargs_and_valoop() {
        assert!(matches!(frame(false).argument("\\L"), Err(AsmErrorKind::InvalidName { .. })));

        let mut frame = frame(true);
        assert!(matches!(frame.argument("\\i"), Err(AsmErrorKind::InvalidName { .. })));
        frame.valoop = Some((1, Expr::name("ptr")));
        assert_eq!(frame.argument("\\i").ok().flatten(), Some(Expr::number(Number::decimal(1))));
        assert_eq!(frame.argument("\\v").ok().flatten(), Some(Expr::name("ptr")));
    }

    #[test]
    fn label_scope_masks_short_references() {
        let mut table = FxHashMap::default();
        table.insert(("main".to_string(), 0x02_0010), 0x02_8000);
        let scope = LabelScope {
            table: Some(&table),
            address: 0x02_0010,
        };
        assert_eq!(scope.resolve("main", false), Some(Number::hex(0x8000, 2)));
        assert_eq!(scope.resolve("main", true), Some(Number::hex(0x02_8000, 3)));
        assert_eq!(scope.resolve("other", false), None);
    }

    #[test]
    fn reserved_names_ignore_case() {
        assert!(is_reserved("endswitch"));
        assert!(is_reserved("x"));
        assert!(!is_reserved("z_set"));
        assert!(!is_reserved("main"));
    }
}
