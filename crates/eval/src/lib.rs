mod expr;

use std::fmt;

use thiserror::Error;

pub use expr::{BinaryOp, EmptyScope, Expr, Name, NameScope, UnaryOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    Bin,
    Oct,
    Dec,
    Hex,
}

/// An integer literal together with the number of bytes its source text implies.
///
/// `0x0001` states two bytes even though the value fits in one; addressing mode
/// selection relies on that distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Number {
    pub value: i64,
    pub radix: Radix,
    pub width: u8,
}

impl Number {
    pub const fn new(value: i64, radix: Radix, width: u8) -> Self {
        Self {
            value,
            radix,
            width,
        }
    }

    pub fn decimal(value: i64) -> Self {
        Self::new(value, Radix::Dec, required_bytes(value))
    }

    pub const fn hex(value: i64, width: u8) -> Self {
        Self::new(value, Radix::Hex, width)
    }

    pub fn is_truthy(self) -> bool {
        self.value != 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<i64, EvalError> {
        self.value.checked_add(rhs.value).ok_or(EvalError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<i64, EvalError> {
        self.value.checked_sub(rhs.value).ok_or(EvalError::Overflow)
    }

    pub fn checked_mul(self, rhs: Self) -> Result<i64, EvalError> {
        self.value.checked_mul(rhs.value).ok_or(EvalError::Overflow)
    }

    /// Floor division, rounding toward negative infinity.
    pub fn checked_div(self, rhs: Self) -> Result<i64, EvalError> {
        if rhs.value == 0 {
            return Err(EvalError::DivisionByZero);
        }
        let quotient = self
            .value
            .checked_div(rhs.value)
            .ok_or(EvalError::Overflow)?;
        if self.value % rhs.value != 0 && ((self.value < 0) != (rhs.value < 0)) {
            Ok(quotient - 1)
        } else {
            Ok(quotient)
        }
    }

    /// Remainder carrying the sign of the divisor.
    pub fn checked_rem(self, rhs: Self) -> Result<i64, EvalError> {
        if rhs.value == 0 {
            return Err(EvalError::DivisionByZero);
        }
        let remainder = self
            .value
            .checked_rem(rhs.value)
            .ok_or(EvalError::Overflow)?;
        if remainder != 0 && ((remainder < 0) != (rhs.value < 0)) {
            Ok(remainder + rhs.value)
        } else {
            Ok(remainder)
        }
    }

    pub fn checked_pow(self, rhs: Self) -> Result<i64, EvalError> {
        let exponent = u32::try_from(rhs.value).map_err(|_| EvalError::NegativeExponent)?;
        self.value.checked_pow(exponent).ok_or(EvalError::Overflow)
    }

    pub fn checked_shl(self, rhs: Self) -> Result<i64, EvalError> {
        let amount = u32::try_from(rhs.value).map_err(|_| EvalError::Overflow)?;
        if amount >= 63 {
            return if self.value == 0 {
                Ok(0)
            } else {
                Err(EvalError::Overflow)
            };
        }
        self.value
            .checked_mul(1_i64 << amount)
            .ok_or(EvalError::Overflow)
    }

    pub fn checked_shr(self, rhs: Self) -> Result<i64, EvalError> {
        let amount = u32::try_from(rhs.value).map_err(|_| EvalError::Overflow)?;
        if amount >= 64 {
            return Ok(if self.value < 0 { -1 } else { 0 });
        }
        Ok(self.value >> amount)
    }

    /// Bitwise complement within the stated width.
    pub fn complement(self) -> i64 {
        if self.width >= 8 {
            return !self.value;
        }
        let mask = (1_i64 << (u32::from(self.width) * 8)) - 1;
        mask - self.value
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value < 0 {
            return write!(f, "{}", self.value);
        }
        let digits = usize::from(self.width);
        match self.radix {
            Radix::Dec => write!(f, "{}", self.value),
            Radix::Hex => write!(f, "0x{:0width$X}", self.value, width = digits * 2),
            Radix::Bin => write!(f, "0b{:0width$b}", self.value, width = digits * 8),
            Radix::Oct => write!(f, "0o{:o}", self.value),
        }
    }
}

/// Smallest byte count able to hold `value`.
///
/// Zero and one take a single byte; negative values take the narrowest two's
/// complement width that round-trips.
pub fn required_bytes(value: i64) -> u8 {
    if value >= 0 {
        let bits = 64 - value.leading_zeros();
        return bits.div_ceil(8).max(1) as u8;
    }

    for bytes in 1..8_u32 {
        let min = -(1_i64 << (bytes * 8 - 1));
        if value >= min {
            return bytes as u8;
        }
    }
    8
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("'{name}' has no value yet")]
    UnresolvedName { name: String },
    #[error("a group of {count} expressions has no single value")]
    GroupValue { count: usize },
    #[error("a quoted string has no numeric value")]
    StringValue,
    #[error("'{name}' is already bound to {existing}; cannot rebind it to {value}")]
    BindConflict {
        name: String,
        existing: i64,
        value: i64,
    },
    #[error("negative exponent")]
    NegativeExponent,
    #[error("division by zero")]
    DivisionByZero,
    #[error("arithmetic overflow")]
    Overflow,
}
