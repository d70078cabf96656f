use c816_eval::{Expr, Number};
use c816_isa65816::{AddressingMode, OpcodeDescriptor, OpcodeFlags, addressing_modes, lookup};

use crate::ast::Location;
use crate::builder::Context;
use crate::error::{AsmErrorKind, AsmResult};

/// A processor instruction. Its addressing mode is picked at validate time from the
/// operand shapes and the register widths in effect.
#[derive(Debug, Clone)]
pub(crate) struct Instruction {
    mnemonic: String,
    operands: Vec<Expr>,
    pub location: Location,
    encoding: Option<Encoding>,
}

#[derive(Debug, Clone, Copy)]
struct Encoding {
    descriptor: OpcodeDescriptor,
    /// 16-bit immediate under `.A16`/`.I16`.
    wide: bool,
    address: i64,
}

fn fits(expr: &Expr, max: u8) -> bool {
    expr.guess_size().is_some_and(|size| size <= max)
}

/// Items of a `( ... )` or `[ ... ]` operand.
fn group(expr: &Expr) -> Option<(&[Expr], bool)> {
    match expr.shape() {
        Expr::Group { items, long } => Some((items, *long)),
        _ => None,
    }
}

fn immediate(expr: &Expr) -> Option<&Expr> {
    match expr.shape() {
        Expr::Immediate(inner) => Some(inner),
        _ => None,
    }
}

fn plain(expr: &Expr) -> bool {
    !expr.is_group() && !expr.is_immediate()
}

fn wide_immediate(flags: OpcodeFlags, acc16: bool, idx16: bool) -> bool {
    (flags.contains(OpcodeFlags::ACC_IMM) && acc16) || (flags.contains(OpcodeFlags::IDX_IMM) && idx16)
}

/// Whether `operands` can be encoded in `mode`.
fn accepts(mode: AddressingMode, flags: OpcodeFlags, operands: &[Expr], acc16: bool, idx16: bool) -> bool {
    use AddressingMode::*;

    match (mode, operands) {
        (Implied | BrkCop | Stack, []) => true,
        (Implied | BrkCop | Stack, _) => false,
        (Accumulator, []) => true,
        (Accumulator, [operand]) => operand.is_name("A"),
        (Immediate, [operand]) => immediate(operand).is_some_and(|inner| {
            let wide = wide_immediate(flags, acc16, idx16);
            (wide && fits(inner, 2)) || inner.guess_size() == Some(1)
        }),
        (BlockMove, [source, destination]) => [source, destination]
            .iter()
            .all(|operand| immediate(operand).is_some_and(|inner| fits(inner, 1))),
        (Relative, [operand]) => match immediate(operand) {
            Some(inner) => fits(inner, 1),
            None => fits(operand, 2),
        },
        (RelativeLong, [operand]) => fits(immediate(operand).unwrap_or(operand), 2),
        (StackRelative, [offset, index]) => {
            !offset.is_group() && index.is_name("S") && fits(offset, 1)
        }
        (StackRelativeIndirectIndexedY, [operand, index]) => match group(operand) {
            Some(([offset, stack], false)) => {
                stack.is_name("S") && index.is_name("Y") && fits(offset, 1)
            }
            _ => false,
        },
        (DirectPage, [operand]) => plain(operand) && fits(operand, 1),
        (Absolute, [operand]) => plain(operand) && fits(operand, 2),
        (AbsoluteLong, [operand]) => plain(operand) && fits(operand, 3),
        (DirectPageIndirect | AbsoluteIndirect, [operand])
        | (DirectPageIndirectLong | AbsoluteIndirectLong, [operand]) => {
            let long = matches!(mode, DirectPageIndirectLong | AbsoluteIndirectLong);
            let max = if matches!(mode, DirectPageIndirect | DirectPageIndirectLong) { 1 } else { 2 };
            match group(operand) {
                Some(([inner], is_long)) => is_long == long && fits(inner, max),
                _ => false,
            }
        }
        (DirectPageX | DirectPageY | AbsoluteX | AbsoluteY | AbsoluteLongX, [base, index]) => {
            let (register, max) = match mode {
                DirectPageX => ("X", 1),
                DirectPageY => ("Y", 1),
                AbsoluteX => ("X", 2),
                AbsoluteY => ("Y", 2),
                _ => ("X", 3),
            };
            !base.is_group() && index.is_name(register) && fits(base, max)
        }
        (DirectPageIndexedIndirectX | AbsoluteIndexedIndirectX, [operand]) => {
            let max = if mode == DirectPageIndexedIndirectX { 1 } else { 2 };
            match group(operand) {
                Some(([base, index], false)) => index.is_name("X") && fits(base, max),
                _ => false,
            }
        }
        (DirectPageIndirectIndexedY | DirectPageIndirectLongIndexedY, [operand, index]) => {
            let long = mode == DirectPageIndirectLongIndexedY;
            match group(operand) {
                Some(([base], is_long)) => is_long == long && index.is_name("Y") && fits(base, 1),
                _ => false,
            }
        }
        _ => false,
    }
}

/// The expression carrying the value of an operand: inside `#`, or the first item
/// of a group.
fn value_of(expr: &Expr) -> &Expr {
    match expr.shape() {
        Expr::Immediate(inner) => value_of(inner),
        Expr::Group { items, .. } => items.first().unwrap_or(expr),
        _ => expr,
    }
}

fn too_large(what: impl std::fmt::Display) -> AsmErrorKind {
    AsmErrorKind::ParameterTooLarge {
        message: format!("argument too large for {what} mode"),
    }
}

fn push_le(bytes: &mut Vec<u8>, value: i64, count: usize) {
    for index in 0..count {
        bytes.push(((value >> (8 * index)) & 0xFF) as u8);
    }
}

fn operand_text(mode: AddressingMode, operand: &[u8], address: i64) -> String {
    use AddressingMode::*;

    let byte = |index: usize| operand.get(index).copied().unwrap_or_default();
    let word = || format!("0x{:02X}{:02X}", byte(1), byte(0));
    match mode {
        Implied | Stack => String::new(),
        Accumulator => "A".to_string(),
        BrkCop | DirectPage => format!("0x{:02X}", byte(0)),
        StackRelative => format!("0x{:02X}, S", byte(0)),
        StackRelativeIndirectIndexedY => format!("(0x{:02X}, S), Y", byte(0)),
        Relative => format!("0x{:04X}", i64::from(byte(0) as i8) + (address & 0xFFFF) + 2),
        RelativeLong => {
            let distance = i64::from(i16::from_le_bytes([byte(0), byte(1)]));
            format!("0x{:04X}", (distance + (address & 0xFFFF) + 3) & 0xFFFF)
        }
        Immediate if operand.len() == 1 => format!("#0x{:02X}", byte(0)),
        Immediate => format!("#{}", word()),
        BlockMove => format!("0x{:02X}, 0x{:02X}", byte(1), byte(0)),
        DirectPageX => format!("0x{:02X}, X", byte(0)),
        DirectPageY => format!("0x{:02X}, Y", byte(0)),
        DirectPageIndexedIndirectX => format!("(0x{:02X}, X)", byte(0)),
        DirectPageIndirectIndexedY => format!("(0x{:02X}), Y", byte(0)),
        DirectPageIndirect => format!("(0x{:02X})", byte(0)),
        DirectPageIndirectLong => format!("[0x{:02X}]", byte(0)),
        DirectPageIndirectLongIndexedY => format!("[0x{:02X}], Y", byte(0)),
        Absolute => word(),
        AbsoluteX => format!("{}, X", word()),
        AbsoluteY => format!("{}, Y", word()),
        AbsoluteIndexedIndirectX => format!("({}, X)", word()),
        AbsoluteIndirect => format!("({})", word()),
        AbsoluteIndirectLong => format!("[{}]", word()),
        AbsoluteLong => format!("0x{:02X}:{:02X}{:02X}", byte(2), byte(1), byte(0)),
        AbsoluteLongX => format!("0x{:02X}:{:02X}{:02X}, X", byte(2), byte(1), byte(0)),
    }
}

impl Instruction {
    pub fn new(mnemonic: String, operands: Vec<Expr>, location: Location) -> Self {
        Self {
            mnemonic,
            operands,
            location,
            encoding: None,
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        let modes = addressing_modes(&self.mnemonic).map_err(|_| {
            AsmErrorKind::UnknownOpcode {
                mnemonic: self.mnemonic.clone(),
            }
            .at(&self.location)
        })?;

        for operand in &mut self.operands {
            ctx.resolve_operand(operand, &self.location)?;
        }

        let (acc16, idx16) = (ctx.acc16, ctx.idx16);
        let descriptor = modes
            .into_iter()
            .filter_map(|mode| lookup(&self.mnemonic, mode).ok())
            .find(|descriptor| {
                accepts(descriptor.mode, descriptor.flags, &self.operands, acc16, idx16)
            })
            .ok_or_else(|| {
                AsmErrorKind::UnknownAddressingMode {
                    mnemonic: self.mnemonic.clone(),
                }
                .at(&self.location)
            })?;

        let wide = descriptor.mode == AddressingMode::Immediate
            && wide_immediate(descriptor.flags, acc16, idx16);
        self.encoding = Some(Encoding {
            descriptor,
            wide,
            address: ctx.address,
        });
        Ok(descriptor.mode.size() as i64 + i64::from(wide))
    }

    fn value(&self, ctx: &Context<'_>, index: usize) -> AsmResult<Number> {
        match self.operands.get(index) {
            Some(operand) => ctx.collapse(value_of(operand), &self.location),
            None => Ok(Number::decimal(0)),
        }
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        use AddressingMode::*;

        let Some(Encoding {
            descriptor,
            wide,
            address,
        }) = self.encoding
        else {
            return Err(AsmErrorKind::UnknownAddressingMode {
                mnemonic: self.mnemonic.clone(),
            }
            .at(&self.location));
        };
        let mode = descriptor.mode;
        let fail = |kind: AsmErrorKind| Err(kind.at(&self.location));

        let mut bytes = vec![descriptor.opcode];
        match mode {
            Implied | Accumulator | Stack => {}
            BrkCop => bytes.push(0),
            Immediate => {
                let value = self.value(ctx, 0)?;
                if wide {
                    if value.width > 2 {
                        let what = if descriptor.flags.contains(OpcodeFlags::ACC_IMM) && ctx.acc16 {
                            "immediate-long-accumulator"
                        } else {
                            "immediate-long-index"
                        };
                        return fail(too_large(what));
                    }
                    push_le(&mut bytes, value.value, 2);
                } else {
                    if value.width != 1 {
                        return fail(too_large(mode));
                    }
                    push_le(&mut bytes, value.value, 1);
                }
            }
            BlockMove => {
                let source = self.value(ctx, 0)?;
                let destination = self.value(ctx, 1)?;
                if source.width != 1 || destination.width != 1 {
                    return fail(too_large(mode));
                }
                push_le(&mut bytes, destination.value, 1);
                push_le(&mut bytes, source.value, 1);
            }
            Relative => {
                let target = self.value(ctx, 0)?.value;
                let distance = target - ((address & 0xFFFF) + 2);
                if !(-128..=127).contains(&distance) {
                    return fail(AsmErrorKind::RelativeBranchOutOfRange {
                        message: format!("relative branch out of range ({distance})"),
                    });
                }
                push_le(&mut bytes, distance, 1);
            }
            RelativeLong => {
                let target = self.value(ctx, 0)?.value;
                let distance = target - ((address & 0xFFFF) + 3);
                if !(-32768..=32767).contains(&distance) {
                    return fail(AsmErrorKind::RelativeBranchOutOfRange {
                        message: format!("relative long branch out of range ({distance})"),
                    });
                }
                push_le(&mut bytes, distance, 2);
            }
            _ => {
                let count = mode.size() - 1;
                let value = self.value(ctx, 0)?;
                let too_wide = if count == 1 {
                    value.width != 1
                } else {
                    usize::from(value.width) > count
                };
                if too_wide {
                    return fail(too_large(mode));
                }
                push_le(&mut bytes, value.value, count);
            }
        }

        if ctx.listing_enabled() {
            let operand = operand_text(mode, &bytes[1..], address);
            let mnemonic = self.mnemonic.to_uppercase();
            let text = if operand.is_empty() {
                mnemonic
            } else {
                format!("{mnemonic} {operand}")
            };
            ctx.list_row(address, &bytes, &text, None);
        }
        Ok(bytes)
    }
}
