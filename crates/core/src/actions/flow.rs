//! Structured flow control: `IF`/`ELSE`/`ENDIF`, `DO`/`UNTIL`/`FOREVER`,
//! `WHILE`/`ENDWHILE` and `SWITCH`/`CASE`/`ENDSWITCH`, lowered to branches.
//!
//! Openers push a [`FlowFrame`] during validation; closers pop it and fill in the
//! addresses the branches need at generate time.

use std::fmt;

use c816_eval::Expr;
use c816_isa65816::{AddressingMode, lookup};

use crate::ast::Location;
use crate::builder::Context;
use crate::error::{AsmErrorKind, AsmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Condition {
    ZSet,
    ZClear,
    CSet,
    CClear,
    NSet,
    NClear,
    VSet,
    VClear,
}

impl Condition {
    const ALL: [(&'static str, Self); 8] = [
        ("Z_SET", Self::ZSet),
        ("Z_CLEAR", Self::ZClear),
        ("C_SET", Self::CSet),
        ("C_CLEAR", Self::CClear),
        ("N_SET", Self::NSet),
        ("N_CLEAR", Self::NClear),
        ("V_SET", Self::VSet),
        ("V_CLEAR", Self::VClear),
    ];

    fn parse(expr: &Expr) -> Option<Self> {
        Self::ALL
            .iter()
            .find(|(name, _)| expr.is_name(name))
            .map(|(_, condition)| *condition)
    }

    /// The branch taken when the condition holds.
    fn branch(self) -> &'static str {
        match self {
            Self::ZSet => "BEQ",
            Self::ZClear => "BNE",
            Self::CSet => "BCS",
            Self::CClear => "BCC",
            Self::NSet => "BMI",
            Self::NClear => "BPL",
            Self::VSet => "BVS",
            Self::VClear => "BVC",
        }
    }

    /// The branch taken when the condition does not hold.
    fn inverse_branch(self) -> &'static str {
        match self {
            Self::ZSet => "BNE",
            Self::ZClear => "BEQ",
            Self::CSet => "BCC",
            Self::CClear => "BCS",
            Self::NSet => "BPL",
            Self::NClear => "BMI",
            Self::VSet => "BVC",
            Self::VClear => "BVS",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Self::ALL
            .iter()
            .find(|(_, condition)| condition == self)
            .map_or("", |(name, _)| name);
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Register {
    A,
    X,
    Y,
}

impl Register {
    fn compare(self) -> &'static str {
        match self {
            Self::A => "CMP",
            Self::X => "CPX",
            Self::Y => "CPY",
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::X => "X",
            Self::Y => "Y",
        })
    }
}

/// State of an open or closed structure, shared between its opener and closers.
#[derive(Debug, Clone)]
pub(crate) struct FlowFrame {
    pub kind: FrameKind,
    /// Address of the opening statement.
    pub at: i64,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub(crate) enum FrameKind {
    If {
        condition: Condition,
        else_at: Option<i64>,
        end_at: Option<i64>,
    },
    Else {
        condition: Condition,
        end_at: Option<i64>,
    },
    Do,
    While {
        condition: Condition,
        end_at: Option<i64>,
    },
    Switch {
        register: Register,
        end_at: Option<i64>,
    },
    Case {
        switch: usize,
        next_at: Option<i64>,
    },
}

impl FlowFrame {
    pub fn name(&self) -> &'static str {
        match self.kind {
            FrameKind::If { .. } => "IF",
            FrameKind::Else { .. } => "ELSE",
            FrameKind::Do => "DO",
            FrameKind::While { .. } => "WHILE",
            FrameKind::Switch { .. } => "SWITCH",
            FrameKind::Case { .. } => "CASE",
        }
    }
}

#[derive(Debug, Clone)]
enum FlowOp {
    If(Condition),
    Else(Condition),
    EndIf(Condition),
    Do,
    Until(Condition),
    Forever { long: bool },
    While(Condition),
    EndWhile(Condition),
    Switch(Register),
    Case { value: Expr, bra: bool, wide: bool },
    EndSwitch(Register),
}

const KEYWORDS: [&str; 11] = [
    "IF", "ELSE", "ENDIF", "DO", "UNTIL", "FOREVER", "WHILE", "ENDWHILE", "SWITCH", "CASE",
    "ENDSWITCH",
];

pub(crate) fn is_flow_keyword(name: &str) -> bool {
    KEYWORDS.iter().any(|keyword| keyword.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone)]
pub(crate) struct Flow {
    op: FlowOp,
    pub location: Location,
    /// The frame this statement opened or closed.
    frame: Option<usize>,
}

fn count_error(message: impl Into<String>) -> AsmErrorKind {
    AsmErrorKind::IncorrectParameterCount {
        message: message.into(),
    }
}

fn unexpected(keyword: &str) -> AsmErrorKind {
    AsmErrorKind::UnexpectedFlowControl {
        message: format!("unexpected {keyword}"),
    }
}

fn unmatched(message: &str) -> AsmErrorKind {
    AsmErrorKind::UnmatchedFlowControl {
        message: message.to_string(),
    }
}

fn too_far(what: &str) -> AsmErrorKind {
    AsmErrorKind::RelativeBranchOutOfRange {
        message: format!("{what} section too large"),
    }
}

fn opcode(mnemonic: &str, mode: AddressingMode, location: &Location) -> AsmResult<u8> {
    lookup(mnemonic, mode)
        .map(|descriptor| descriptor.opcode)
        .map_err(|_| {
            AsmErrorKind::UnknownOpcode {
                mnemonic: mnemonic.to_string(),
            }
            .at(location)
        })
}

/// Encodes a two-byte short branch at `address` to `target`.
fn short_branch(
    mnemonic: &str,
    address: i64,
    target: i64,
    what: &str,
    location: &Location,
) -> AsmResult<Vec<u8>> {
    let distance = target - (address + 2);
    if !(-128..=127).contains(&distance) {
        return Err(too_far(what).at(location));
    }
    Ok(vec![
        opcode(mnemonic, AddressingMode::Relative, location)?,
        (distance & 0xFF) as u8,
    ])
}

fn unterminated(frame: &FlowFrame) -> AsmErrorKind {
    AsmErrorKind::UnexpectedFlowControl {
        message: format!("flow control {} not terminated", frame.name()),
    }
}

impl Flow {
    /// Checks the operands of a flow keyword.
    pub fn build(keyword: &str, operands: Vec<Expr>, location: Location) -> AsmResult<Self> {
        let keyword = keyword.to_ascii_uppercase();
        let condition = |operands: &[Expr]| -> AsmResult<Condition> {
            let [operand] = operands else {
                return Err(count_error(format!("incorrect number of arguments for {keyword}"))
                    .at(&location));
            };
            Condition::parse(operand).ok_or_else(|| {
                AsmErrorKind::InvalidParameter {
                    message: "parameter 1 must be one of Z_SET, Z_CLEAR, C_SET, C_CLEAR, N_SET, N_CLEAR, V_SET or V_CLEAR".to_string(),
                }
                .at(&location)
            })
        };
        let bare = |operands: &[Expr]| -> AsmResult<()> {
            if operands.is_empty() {
                Ok(())
            } else {
                Err(count_error(format!("extra parameters to {keyword}")).at(&location))
            }
        };

        let op = match keyword.as_str() {
            "IF" => FlowOp::If(condition(&operands)?),
            "UNTIL" => FlowOp::Until(condition(&operands)?),
            "WHILE" => FlowOp::While(condition(&operands)?),
            "SWITCH" => {
                let [operand] = operands.as_slice() else {
                    return Err(count_error("incorrect number of arguments for SWITCH").at(&location));
                };
                let register = [("A", Register::A), ("X", Register::X), ("Y", Register::Y)]
                    .into_iter()
                    .find(|(name, _)| operand.is_name(name))
                    .map(|(_, register)| register)
                    .ok_or_else(|| {
                        AsmErrorKind::InvalidParameter {
                            message: "parameter 1 must be one of A, X, or Y".to_string(),
                        }
                        .at(&location)
                    })?;
                FlowOp::Switch(register)
            }
            "CASE" => {
                let value = match <[Expr; 1]>::try_from(operands) {
                    Ok([value]) if value.is_immediate() => value,
                    _ => {
                        return Err(count_error(
                            "currently only immediate values are supported for CASE",
                        )
                        .at(&location));
                    }
                };
                FlowOp::Case {
                    value,
                    bra: false,
                    wide: false,
                }
            }
            other => {
                bare(&operands)?;
                // Closers learn their condition or register from the opener during validate.
                match other {
                    "ELSE" => FlowOp::Else(Condition::ZSet),
                    "ENDIF" => FlowOp::EndIf(Condition::ZSet),
                    "DO" => FlowOp::Do,
                    "FOREVER" => FlowOp::Forever { long: false },
                    "ENDWHILE" => FlowOp::EndWhile(Condition::ZSet),
                    _ => FlowOp::EndSwitch(Register::A),
                }
            }
        };

        Ok(Self {
            op,
            location,
            frame: None,
        })
    }

    fn open(&self, ctx: &mut Context<'_>, kind: FrameKind) -> usize {
        let frame = FlowFrame {
            kind,
            at: ctx.address,
            location: self.location.clone(),
        };
        ctx.push_flow(frame)
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.require_segment(&self.location)?;
        let address = ctx.address;
        let location = self.location.clone();
        let location = &location;

        let (frame, size) = match &self.op {
            FlowOp::If(condition) => {
                let kind = FrameKind::If {
                    condition: *condition,
                    else_at: None,
                    end_at: None,
                };
                (self.open(ctx, kind), 2)
            }
            FlowOp::Else(_) => {
                let id = ctx.pop_flow().ok_or_else(|| unexpected("ELSE").at(location))?;
                let FrameKind::If {
                    condition, else_at, ..
                } = &mut ctx.flow[id].kind
                else {
                    return Err(unmatched("ELSE with no matching IF statement").at(location));
                };
                *else_at = Some(address);
                let condition = *condition;
                self.op = FlowOp::Else(condition);
                let kind = FrameKind::Else {
                    condition,
                    end_at: None,
                };
                (self.open(ctx, kind), 2)
            }
            FlowOp::EndIf(_) => {
                let id = ctx.pop_flow().ok_or_else(|| unexpected("ENDIF").at(location))?;
                match &mut ctx.flow[id].kind {
                    FrameKind::If {
                        condition, end_at, ..
                    }
                    | FrameKind::Else { condition, end_at } => {
                        *end_at = Some(address);
                        self.op = FlowOp::EndIf(*condition);
                    }
                    _ => return Err(unmatched("ENDIF with no matching IF statement").at(location)),
                }
                (id, 0)
            }
            FlowOp::Do => (self.open(ctx, FrameKind::Do), 0),
            FlowOp::Until(_) => {
                let id = ctx.pop_flow().ok_or_else(|| unexpected("UNTIL").at(location))?;
                if !matches!(ctx.flow[id].kind, FrameKind::Do) {
                    return Err(unmatched("UNTIL with no matching DO statement").at(location));
                }
                (id, 2)
            }
            FlowOp::Forever { .. } => {
                let id = ctx.pop_flow().ok_or_else(|| unexpected("FOREVER").at(location))?;
                if !matches!(ctx.flow[id].kind, FrameKind::Do) {
                    return Err(unmatched("FOREVER with no matching DO statement").at(location));
                }
                let at = ctx.flow[id].at;
                let long = !(-128..=127).contains(&(at - (address + 2)));
                if long && i16::try_from(at - (address + 3)).is_err() {
                    return Err(too_far("DO/FOREVER").at(location));
                }
                self.op = FlowOp::Forever { long };
                (id, if long { 3 } else { 2 })
            }
            FlowOp::While(condition) => {
                let kind = FrameKind::While {
                    condition: *condition,
                    end_at: None,
                };
                (self.open(ctx, kind), 2)
            }
            FlowOp::EndWhile(_) => {
                let id = ctx.pop_flow().ok_or_else(|| unexpected("ENDWHILE").at(location))?;
                let FrameKind::While { condition, end_at } = &mut ctx.flow[id].kind else {
                    return Err(unmatched("ENDWHILE with no matching WHILE statement").at(location));
                };
                *end_at = Some(address);
                self.op = FlowOp::EndWhile(*condition);
                (id, 2)
            }
            FlowOp::Switch(register) => {
                let kind = FrameKind::Switch {
                    register: *register,
                    end_at: None,
                };
                (self.open(ctx, kind), 0)
            }
            FlowOp::Case { value, .. } => {
                let mut value = value.clone();
                let id = ctx.pop_flow().ok_or_else(|| unexpected("CASE").at(location))?;
                let mut bra = false;
                let switch = match &mut ctx.flow[id].kind {
                    FrameKind::Case { switch, next_at } => {
                        bra = true;
                        *next_at = Some(address + 2);
                        *switch
                    }
                    _ => id,
                };
                let FrameKind::Switch { register, .. } = ctx.flow[switch].kind else {
                    return Err(unexpected("CASE").at(location));
                };

                let invalid = |kind: AsmErrorKind| {
                    AsmErrorKind::InvalidParameter {
                        message: format!("invalid argument to CASE: {kind}"),
                    }
                    .at(location)
                };
                ctx.bind_macro_arguments(&mut value, location)
                    .map_err(|error| invalid(error.kind))?;
                ctx.bind_equates(&mut value, None, location)
                    .map_err(|error| invalid(error.kind))?;
                let number = value
                    .collapse()
                    .map_err(|source| invalid(AsmErrorKind::Eval { source }))?;

                let wide = match register {
                    Register::A => ctx.acc16,
                    Register::X | Register::Y => ctx.idx16,
                };
                let compare = if wide && number.width <= 2 {
                    5
                } else if number.width <= 1 {
                    4
                } else {
                    return Err(AsmErrorKind::ParameterTooLarge {
                        message: "argument to CASE is too large".to_string(),
                    }
                    .at(location));
                };
                self.op = FlowOp::Case { value, bra, wide };
                let kind = FrameKind::Case {
                    switch,
                    next_at: None,
                };
                (self.open(ctx, kind), compare + if bra { 2 } else { 0 })
            }
            FlowOp::EndSwitch(_) => {
                let id = ctx.pop_flow().ok_or_else(|| unexpected("ENDSWITCH").at(location))?;
                let switch = match &mut ctx.flow[id].kind {
                    FrameKind::Case { switch, next_at } => {
                        *next_at = Some(address);
                        *switch
                    }
                    _ => id,
                };
                let FrameKind::Switch { register, end_at } = &mut ctx.flow[switch].kind else {
                    return Err(unexpected("ENDSWITCH").at(location));
                };
                *end_at = Some(address);
                self.op = FlowOp::EndSwitch(*register);
                (switch, 0)
            }
        };

        self.frame = Some(frame);
        Ok(size)
    }

    fn frame<'c>(&self, ctx: &'c Context<'_>) -> AsmResult<&'c FlowFrame> {
        self.frame
            .and_then(|id| ctx.flow.get(id))
            .ok_or_else(|| unexpected("flow control").at(&self.location))
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        let address = ctx.address;
        let location = &self.location;
        let frame = self.frame(ctx)?.clone();
        let target = |at: Option<i64>| at.ok_or_else(|| unterminated(&frame).at(location));

        match &self.op {
            FlowOp::If(condition) => {
                let FrameKind::If {
                    else_at, end_at, ..
                } = frame.kind else {
                    return Err(unexpected("IF").at(location));
                };
                let (to, what) = match else_at {
                    Some(else_at) => (else_at + 2, "IF/ELSE"),
                    None => (target(end_at)?, "IF/ENDIF"),
                };
                let mnemonic = condition.inverse_branch();
                let bytes = short_branch(mnemonic, address, to, what, location)?;
                ctx.list_row(
                    address,
                    &bytes,
                    &format!("{mnemonic} 0x{:04X}", to & 0xFFFF),
                    Some(&format!(";; IF {condition}")),
                );
                Ok(bytes)
            }
            FlowOp::Else(condition) => {
                let FrameKind::Else { end_at, .. } = frame.kind else {
                    return Err(unexpected("ELSE").at(location));
                };
                let to = target(end_at)?;
                let bytes = short_branch("BRA", address, to, "ELSE-ENDIF", location)?;
                ctx.list_row(
                    address,
                    &bytes,
                    &format!("BRA 0x{:04X}", to & 0xFFFF),
                    Some(&format!(";; ELSE !{condition}")),
                );
                Ok(bytes)
            }
            FlowOp::EndIf(condition) => {
                ctx.list_right(&format!(";; ENDIF {condition}"));
                Ok(Vec::new())
            }
            FlowOp::Do => {
                ctx.list_right(";; DO");
                Ok(Vec::new())
            }
            FlowOp::Until(condition) => {
                let mnemonic = condition.inverse_branch();
                let bytes = short_branch(mnemonic, address, frame.at, "DO/UNTIL", location)?;
                ctx.list_row(
                    address,
                    &bytes,
                    &format!("{mnemonic} 0x{:04X}", frame.at & 0xFFFF),
                    Some(&format!(";; UNTIL {condition}")),
                );
                Ok(bytes)
            }
            FlowOp::Forever { long } => {
                let bytes = if *long {
                    let distance = i16::try_from(frame.at - (address + 3))
                        .map_err(|_| too_far("DO/FOREVER").at(location))?;
                    let mut bytes = vec![opcode("BRL", AddressingMode::RelativeLong, location)?];
                    bytes.extend_from_slice(&distance.to_le_bytes());
                    bytes
                } else {
                    short_branch("BRA", address, frame.at, "DO/FOREVER", location)?
                };
                let mnemonic = if *long { "BRL" } else { "BRA" };
                ctx.list_row(
                    address,
                    &bytes,
                    &format!("{mnemonic} 0x{:04X}", frame.at & 0xFFFF),
                    Some(";; FOREVER"),
                );
                Ok(bytes)
            }
            FlowOp::While(condition) => {
                let FrameKind::While { end_at, .. } = frame.kind else {
                    return Err(unexpected("WHILE").at(location));
                };
                let to = target(end_at)? + 2;
                let mnemonic = condition.inverse_branch();
                let bytes = short_branch(mnemonic, address, to, "WHILE/ENDWHILE", location)?;
                ctx.list_row(
                    address,
                    &bytes,
                    &format!("{mnemonic} 0x{:04X}", to & 0xFFFF),
                    Some(&format!(";; WHILE {condition}")),
                );
                Ok(bytes)
            }
            FlowOp::EndWhile(condition) => {
                let to = frame.at + 2;
                let mnemonic = condition.branch();
                let bytes = short_branch(mnemonic, address, to, "WHILE/ENDWHILE", location)?;
                ctx.list_row(
                    address,
                    &bytes,
                    &format!("{mnemonic} 0x{:04X}", to & 0xFFFF),
                    Some(&format!(";; ENDWHILE {condition}")),
                );
                Ok(bytes)
            }
            FlowOp::Switch(register) => {
                ctx.list_right(&format!(";; SWITCH {register}"));
                Ok(Vec::new())
            }
            FlowOp::Case { value, bra, wide } => {
                let FrameKind::Case { switch, next_at } = frame.kind else {
                    return Err(unexpected("CASE").at(location));
                };
                let (register, end_at) = match ctx.flow.get(switch).map(|frame| &frame.kind) {
                    Some(FrameKind::Switch { register, end_at }) => (*register, *end_at),
                    _ => return Err(unexpected("CASE").at(location)),
                };
                let value = value.collapse().map_err(|source| AsmErrorKind::Eval { source }.at(location))?;

                let mut bytes = Vec::new();
                let mut at = address;
                if *bra {
                    let to = target(end_at)?;
                    let branch = short_branch("BRA", at, to, "CASE/ENDSWITCH", location)?;
                    ctx.list_row(at, &branch, &format!("BRA 0x{:04X}", to & 0xFFFF), Some(";; ENDCASE"));
                    bytes.extend(branch);
                    at += 2;
                }

                let compare = register.compare();
                let mut encoded = vec![opcode(compare, AddressingMode::Immediate, location)?];
                let operand = if *wide {
                    encoded.extend_from_slice(&(value.value as u16).to_le_bytes());
                    format!("#0x{:04X}", value.value & 0xFFFF)
                } else {
                    encoded.push((value.value & 0xFF) as u8);
                    format!("#0x{:02X}", value.value & 0xFF)
                };
                ctx.list_row(
                    at,
                    &encoded,
                    &format!("{compare} {operand}"),
                    Some(&format!(";; CASE {operand}")),
                );
                at += encoded.len() as i64;
                bytes.extend(encoded);

                let to = target(next_at)?;
                let distance = to - (at + 2);
                if !(-128..=127).contains(&distance) {
                    return Err(AsmErrorKind::RelativeBranchOutOfRange {
                        message: "CASE/ENDSWITCH distance too large".to_string(),
                    }
                    .at(location));
                }
                let branch = vec![
                    opcode("BNE", AddressingMode::Relative, location)?,
                    (distance & 0xFF) as u8,
                ];
                ctx.list_row(at, &branch, &format!("BNE 0x{:04X}", to & 0xFFFF), None);
                bytes.extend(branch);
                Ok(bytes)
            }
            FlowOp::EndSwitch(register) => {
                ctx.list_right(&format!(";; ENDSWITCH {register}"));
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::{SourceId, Span};

    fn location() -> Location {
        Location {
            file: "test.s".to_string(),
            line: 1,
            span: Span::new(SourceId(0), 0, 1),
            included_from: Vec::new(),
        }
    }

    #[test]
    fn keywords_ignore_case() {
        assert!(is_flow_keyword("endwhile"));
        assert!(is_flow_keyword("Switch"));
        assert!(!is_flow_keyword("ENDMACRO"));
    }

    #[test]
    fn branches_invert_conditions() {
        for (_, condition) in Condition::ALL {
            assert_ne!(condition.branch(), condition.inverse_branch());
        }
        assert_eq!(Condition::CClear.inverse_branch(), "BCS");
        assert_eq!(Condition::ZSet.branch(), "BEQ");
        assert_eq!(Condition::VClear.to_string(), "V_CLEAR");
    }

    #[test]
    fn conditions_must_be_known_names() {
        let error = Flow::build("if", vec![Expr::name("Q_SET")], location()).unwrap_err();
        assert!(matches!(error.kind, AsmErrorKind::InvalidParameter { .. }));

        let error = Flow::build("WHILE", Vec::new(), location()).unwrap_err();
        assert_eq!(error.kind.to_string(), "incorrect number of arguments for WHILE");

        assert!(Flow::build("until", vec![Expr::name("c_clear")], location()).is_ok());
    }

    #[test]
    fn closers_take_no_operands() {
        let error = Flow::build("ENDIF", vec![Expr::name("Z_SET")], location()).unwrap_err();
        assert_eq!(error.kind.to_string(), "extra parameters to ENDIF");
    }

    #[test]
    fn switch_and_case_operands() {
        let error = Flow::build("SWITCH", vec![Expr::name("S")], location()).unwrap_err();
        assert_eq!(error.kind.to_string(), "parameter 1 must be one of A, X, or Y");

        let error = Flow::build(
            "CASE",
            vec![Expr::number(c816_eval::Number::decimal(1))],
            location(),
        )
        .unwrap_err();
        assert!(matches!(error.kind, AsmErrorKind::IncorrectParameterCount { .. }));
    }
}
