use c816_assets::petscii;
use c816_eval::Expr;

use crate::ast::Location;
use crate::builder::Context;
use crate::error::{AsmErrorKind, AsmResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DataWidth {
    Byte,
    Word,
    Long,
}

impl DataWidth {
    fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Long => 3,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Byte => "DB",
            Self::Word => "DW",
            Self::Long => "DL",
        }
    }
}

/// `.DB`, `.DW` and `.DL`. Strings are only accepted by `.DB`.
#[derive(Debug, Clone)]
pub(crate) struct Data {
    width: DataWidth,
    operands: Vec<Expr>,
    pub location: Location,
}

fn string_bytes(text: &str, is_petscii: bool) -> Vec<u8> {
    if is_petscii {
        petscii(text)
    } else {
        text.bytes().collect()
    }
}

impl Data {
    pub fn new(width: DataWidth, operands: Vec<Expr>, location: Location) -> Self {
        Self {
            width,
            operands,
            location,
        }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        let mut size = 0;
        for operand in &mut self.operands {
            if let Expr::Str { text, .. } = &*operand {
                if self.width != DataWidth::Byte {
                    return Err(AsmErrorKind::InvalidParameter {
                        message: format!("strings are not allowed in {}", self.width.directive()),
                    }
                    .at(&self.location));
                }
                size += text.len() as i64;
            } else {
                ctx.resolve_operand(operand, &self.location)?;
                size += self.width.bytes() as i64;
            }
        }
        Ok(size)
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        let directive = self.width.directive();
        let count = self.width.bytes();
        let mut bytes = Vec::new();

        for operand in &self.operands {
            let address = ctx.address + bytes.len() as i64;
            if let Expr::Str { text, petscii } = operand {
                let encoded = string_bytes(text, *petscii);
                ctx.list_rows(address, &encoded, &format!(".{directive} \"{text}\""));
                bytes.extend(encoded);
                continue;
            }

            let value = ctx.collapse(operand, &self.location)?;
            if usize::from(value.width) > count {
                return Err(AsmErrorKind::ParameterTooLarge {
                    message: format!("argument to {directive} is too large"),
                }
                .at(&self.location));
            }
            let start = bytes.len();
            for index in 0..count {
                bytes.push(((value.value >> (8 * index)) & 0xFF) as u8);
            }
            let text = format!(".{directive} 0x{:0width$X}", value.value & mask(count), width = count * 2);
            ctx.list_row(address, &bytes[start..], &text, None);
        }
        Ok(bytes)
    }
}

fn mask(count: usize) -> i64 {
    (1_i64 << (8 * count)) - 1
}

/// `.FILL count, byte` and `.FILLW count, word`.
#[derive(Debug, Clone)]
pub(crate) struct Fill {
    word: bool,
    count: Expr,
    value: Expr,
    pub location: Location,
    repeat: i64,
}

impl Fill {
    pub fn new(word: bool, count: Expr, value: Expr, location: Location) -> Self {
        Self {
            word,
            count,
            value,
            location,
            repeat: 0,
        }
    }

    fn directive(&self) -> &'static str {
        if self.word { "FILLW" } else { "FILL" }
    }

    pub fn validate(&mut self, ctx: &mut Context<'_>) -> AsmResult<i64> {
        ctx.resolve_operand(&mut self.count, &self.location)?;
        ctx.resolve_operand(&mut self.value, &self.location)?;

        let directive = self.directive();
        let invalid = || {
            AsmErrorKind::InvalidParameter {
                message: format!("error parsing {} arguments", directive),
            }
            .at(&self.location)
        };
        let repeat = self.count.collapse().map_err(|_| invalid())?.value;
        if repeat < 0 {
            return Err(invalid());
        }
        self.repeat = repeat;
        if self.word {
            repeat.checked_mul(2).ok_or_else(invalid)
        } else {
            Ok(repeat)
        }
    }

    pub fn generate(&mut self, ctx: &mut Context<'_>) -> AsmResult<Vec<u8>> {
        let value = ctx.collapse(&self.value, &self.location)?;
        let (unit, fits) = if self.word {
            (2, value.width <= 2)
        } else {
            (1, value.width == 1)
        };
        if !fits {
            let message = if self.word {
                "fill word size exceeds 2 bytes"
            } else {
                "fill byte size exceeds 1 byte"
            };
            return Err(AsmErrorKind::ParameterTooLarge {
                message: message.to_string(),
            }
            .at(&self.location));
        }

        let element: Vec<u8> = (0..unit)
            .map(|index| ((value.value >> (8 * index)) & 0xFF) as u8)
            .collect();
        let bytes = element.repeat(self.repeat as usize);

        if ctx.listing_enabled() {
            let text = if self.word {
                format!(".FILLW 0x{:04X}, 0x{:04X}", self.repeat, value.value & 0xFFFF)
            } else {
                format!(".FILL 0x{:04X}, 0x{:02X}", self.repeat, value.value & 0xFF)
            };
            ctx.list_rows(ctx.address, &bytes, &text);
        }
        Ok(bytes)
    }
}
