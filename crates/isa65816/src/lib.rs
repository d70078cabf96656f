use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    BrkCop,
    Stack,
    Immediate,
    BlockMove,
    Relative,
    RelativeLong,
    StackRelative,
    StackRelativeIndirectIndexedY,
    DirectPage,
    DirectPageIndirect,
    DirectPageIndirectLong,
    DirectPageX,
    DirectPageY,
    DirectPageIndexedIndirectX,
    DirectPageIndirectIndexedY,
    DirectPageIndirectLongIndexedY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    AbsoluteIndexedIndirectX,
    AbsoluteLong,
    AbsoluteLongX,
    AbsoluteIndirect,
    AbsoluteIndirectLong,
}

impl AddressingMode {
    /// Order in which operand shapes are tried. Several modes can accept the same
    /// operand, so narrower encodings come first: direct before absolute, absolute
    /// before long, short relative before long relative.
    pub const PRIORITY: [Self; 26] = [
        Self::Implied,
        Self::Accumulator,
        Self::BrkCop,
        Self::Stack,
        Self::Immediate,
        Self::BlockMove,
        Self::Relative,
        Self::RelativeLong,
        Self::StackRelative,
        Self::StackRelativeIndirectIndexedY,
        Self::DirectPage,
        Self::DirectPageIndirect,
        Self::DirectPageIndirectLong,
        Self::DirectPageX,
        Self::DirectPageY,
        Self::DirectPageIndexedIndirectX,
        Self::DirectPageIndirectIndexedY,
        Self::DirectPageIndirectLongIndexedY,
        Self::Absolute,
        Self::AbsoluteX,
        Self::AbsoluteY,
        Self::AbsoluteIndexedIndirectX,
        Self::AbsoluteLong,
        Self::AbsoluteLongX,
        Self::AbsoluteIndirect,
        Self::AbsoluteIndirectLong,
    ];

    /// Encoded length in bytes, opcode included, before any 16-bit immediate extension.
    pub const fn size(self) -> usize {
        match self {
            Self::Implied | Self::Accumulator | Self::Stack => 1,
            Self::BrkCop
            | Self::Immediate
            | Self::Relative
            | Self::StackRelative
            | Self::StackRelativeIndirectIndexedY
            | Self::DirectPage
            | Self::DirectPageIndirect
            | Self::DirectPageIndirectLong
            | Self::DirectPageX
            | Self::DirectPageY
            | Self::DirectPageIndexedIndirectX
            | Self::DirectPageIndirectIndexedY
            | Self::DirectPageIndirectLongIndexedY => 2,
            Self::BlockMove
            | Self::RelativeLong
            | Self::Absolute
            | Self::AbsoluteX
            | Self::AbsoluteY
            | Self::AbsoluteIndexedIndirectX
            | Self::AbsoluteIndirect
            | Self::AbsoluteIndirectLong => 3,
            Self::AbsoluteLong | Self::AbsoluteLongX => 4,
        }
    }
}

impl fmt::Display for AddressingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Implied => "implied",
            Self::Accumulator => "accumulator",
            Self::BrkCop => "interrupt signature",
            Self::Stack => "stack",
            Self::Immediate => "immediate",
            Self::BlockMove => "block move",
            Self::Relative => "relative",
            Self::RelativeLong => "relative long",
            Self::StackRelative => "stack relative",
            Self::StackRelativeIndirectIndexedY => "stack relative indirect indexed Y",
            Self::DirectPage => "direct page",
            Self::DirectPageIndirect => "direct page indirect",
            Self::DirectPageIndirectLong => "direct page indirect long",
            Self::DirectPageX => "direct page indexed X",
            Self::DirectPageY => "direct page indexed Y",
            Self::DirectPageIndexedIndirectX => "direct page indexed indirect X",
            Self::DirectPageIndirectIndexedY => "direct page indirect indexed Y",
            Self::DirectPageIndirectLongIndexedY => "direct page indirect long indexed Y",
            Self::Absolute => "absolute",
            Self::AbsoluteX => "absolute indexed X",
            Self::AbsoluteY => "absolute indexed Y",
            Self::AbsoluteIndexedIndirectX => "absolute indexed indirect X",
            Self::AbsoluteLong => "absolute long",
            Self::AbsoluteLongX => "absolute long indexed X",
            Self::AbsoluteIndirect => "absolute indirect",
            Self::AbsoluteIndirectLong => "absolute indirect long",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OpcodeFlags(u8);

impl OpcodeFlags {
    pub const NONE: Self = Self(0);
    /// The immediate operand may grow to two bytes in native mode.
    pub const EXTRA_BYTE16: Self = Self(1);
    /// Immediate width follows the accumulator width (`.A8`/`.A16`).
    pub const ACC_IMM: Self = Self(2);
    /// Immediate width follows the index register width (`.I8`/`.I16`).
    pub const IDX_IMM: Self = Self(4);

    const ACC: Self = Self(Self::EXTRA_BYTE16.0 | Self::ACC_IMM.0);
    const IDX: Self = Self(Self::EXTRA_BYTE16.0 | Self::IDX_IMM.0);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeDescriptor {
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub opcode: u8,
    pub flags: OpcodeFlags,
}

impl OpcodeDescriptor {
    pub const fn size(&self) -> usize {
        self.mode.size()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IsaError {
    #[error("unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { mnemonic: String },
    #[error("mnemonic '{mnemonic}' has no {mode} addressing mode")]
    UnsupportedMode {
        mnemonic: String,
        mode: AddressingMode,
    },
}

macro_rules! op {
    ($mnemonic:literal, $mode:ident, $opcode:literal) => {
        op!($mnemonic, $mode, $opcode, NONE)
    };
    ($mnemonic:literal, $mode:ident, $opcode:literal, $flags:ident) => {
        OpcodeDescriptor {
            mnemonic: $mnemonic,
            mode: AddressingMode::$mode,
            opcode: $opcode,
            flags: OpcodeFlags::$flags,
        }
    };
}

const OPCODE_TABLE: &[OpcodeDescriptor] = &[
    // accumulator arithmetic and logic
    op!("adc", Immediate, 0x69, ACC),
    op!("adc", DirectPage, 0x65),
    op!("adc", DirectPageX, 0x75),
    op!("adc", DirectPageIndexedIndirectX, 0x61),
    op!("adc", DirectPageIndirectIndexedY, 0x71),
    op!("adc", DirectPageIndirect, 0x72),
    op!("adc", DirectPageIndirectLong, 0x67),
    op!("adc", DirectPageIndirectLongIndexedY, 0x77),
    op!("adc", Absolute, 0x6D),
    op!("adc", AbsoluteX, 0x7D),
    op!("adc", AbsoluteY, 0x79),
    op!("adc", AbsoluteLong, 0x6F),
    op!("adc", AbsoluteLongX, 0x7F),
    op!("adc", StackRelative, 0x63),
    op!("adc", StackRelativeIndirectIndexedY, 0x73),
    op!("and", Immediate, 0x29, ACC),
    op!("and", DirectPage, 0x25),
    op!("and", DirectPageX, 0x35),
    op!("and", DirectPageIndexedIndirectX, 0x21),
    op!("and", DirectPageIndirectIndexedY, 0x31),
    op!("and", DirectPageIndirect, 0x32),
    op!("and", DirectPageIndirectLong, 0x27),
    op!("and", DirectPageIndirectLongIndexedY, 0x37),
    op!("and", Absolute, 0x2D),
    op!("and", AbsoluteX, 0x3D),
    op!("and", AbsoluteY, 0x39),
    op!("and", AbsoluteLong, 0x2F),
    op!("and", AbsoluteLongX, 0x3F),
    op!("and", StackRelative, 0x23),
    op!("and", StackRelativeIndirectIndexedY, 0x33),
    op!("cmp", Immediate, 0xC9, ACC),
    op!("cmp", DirectPage, 0xC5),
    op!("cmp", DirectPageX, 0xD5),
    op!("cmp", DirectPageIndexedIndirectX, 0xC1),
    op!("cmp", DirectPageIndirectIndexedY, 0xD1),
    op!("cmp", DirectPageIndirect, 0xD2),
    op!("cmp", DirectPageIndirectLong, 0xC7),
    op!("cmp", DirectPageIndirectLongIndexedY, 0xD7),
    op!("cmp", Absolute, 0xCD),
    op!("cmp", AbsoluteX, 0xDD),
    op!("cmp", AbsoluteY, 0xD9),
    op!("cmp", AbsoluteLong, 0xCF),
    op!("cmp", AbsoluteLongX, 0xDF),
    op!("cmp", StackRelative, 0xC3),
    op!("cmp", StackRelativeIndirectIndexedY, 0xD3),
    op!("eor", Immediate, 0x49, ACC),
    op!("eor", DirectPage, 0x45),
    op!("eor", DirectPageX, 0x55),
    op!("eor", DirectPageIndexedIndirectX, 0x41),
    op!("eor", DirectPageIndirectIndexedY, 0x51),
    op!("eor", DirectPageIndirect, 0x52),
    op!("eor", DirectPageIndirectLong, 0x47),
    op!("eor", DirectPageIndirectLongIndexedY, 0x57),
    op!("eor", Absolute, 0x4D),
    op!("eor", AbsoluteX, 0x5D),
    op!("eor", AbsoluteY, 0x59),
    op!("eor", AbsoluteLong, 0x4F),
    op!("eor", AbsoluteLongX, 0x5F),
    op!("eor", StackRelative, 0x43),
    op!("eor", StackRelativeIndirectIndexedY, 0x53),
    op!("lda", Immediate, 0xA9, ACC),
    op!("lda", DirectPage, 0xA5),
    op!("lda", DirectPageX, 0xB5),
    op!("lda", DirectPageIndexedIndirectX, 0xA1),
    op!("lda", DirectPageIndirectIndexedY, 0xB1),
    op!("lda", DirectPageIndirect, 0xB2),
    op!("lda", DirectPageIndirectLong, 0xA7),
    op!("lda", DirectPageIndirectLongIndexedY, 0xB7),
    op!("lda", Absolute, 0xAD),
    op!("lda", AbsoluteX, 0xBD),
    op!("lda", AbsoluteY, 0xB9),
    op!("lda", AbsoluteLong, 0xAF),
    op!("lda", AbsoluteLongX, 0xBF),
    op!("lda", StackRelative, 0xA3),
    op!("lda", StackRelativeIndirectIndexedY, 0xB3),
    op!("ora", Immediate, 0x09, ACC),
    op!("ora", DirectPage, 0x05),
    op!("ora", DirectPageX, 0x15),
    op!("ora", DirectPageIndexedIndirectX, 0x01),
    op!("ora", DirectPageIndirectIndexedY, 0x11),
    op!("ora", DirectPageIndirect, 0x12),
    op!("ora", DirectPageIndirectLong, 0x07),
    op!("ora", DirectPageIndirectLongIndexedY, 0x17),
    op!("ora", Absolute, 0x0D),
    op!("ora", AbsoluteX, 0x1D),
    op!("ora", AbsoluteY, 0x19),
    op!("ora", AbsoluteLong, 0x0F),
    op!("ora", AbsoluteLongX, 0x1F),
    op!("ora", StackRelative, 0x03),
    op!("ora", StackRelativeIndirectIndexedY, 0x13),
    op!("sbc", Immediate, 0xE9, ACC),
    op!("sbc", DirectPage, 0xE5),
    op!("sbc", DirectPageX, 0xF5),
    op!("sbc", DirectPageIndexedIndirectX, 0xE1),
    op!("sbc", DirectPageIndirectIndexedY, 0xF1),
    op!("sbc", DirectPageIndirect, 0xF2),
    op!("sbc", DirectPageIndirectLong, 0xE7),
    op!("sbc", DirectPageIndirectLongIndexedY, 0xF7),
    op!("sbc", Absolute, 0xED),
    op!("sbc", AbsoluteX, 0xFD),
    op!("sbc", AbsoluteY, 0xF9),
    op!("sbc", AbsoluteLong, 0xEF),
    op!("sbc", AbsoluteLongX, 0xFF),
    op!("sbc", StackRelative, 0xE3),
    op!("sbc", StackRelativeIndirectIndexedY, 0xF3),
    op!("sta", DirectPage, 0x85),
    op!("sta", DirectPageX, 0x95),
    op!("sta", DirectPageIndexedIndirectX, 0x81),
    op!("sta", DirectPageIndirectIndexedY, 0x91),
    op!("sta", DirectPageIndirect, 0x92),
    op!("sta", DirectPageIndirectLong, 0x87),
    op!("sta", DirectPageIndirectLongIndexedY, 0x97),
    op!("sta", Absolute, 0x8D),
    op!("sta", AbsoluteX, 0x9D),
    op!("sta", AbsoluteY, 0x99),
    op!("sta", AbsoluteLong, 0x8F),
    op!("sta", AbsoluteLongX, 0x9F),
    op!("sta", StackRelative, 0x83),
    op!("sta", StackRelativeIndirectIndexedY, 0x93),
    // read-modify-write
    op!("asl", Accumulator, 0x0A),
    op!("asl", DirectPage, 0x06),
    op!("asl", DirectPageX, 0x16),
    op!("asl", Absolute, 0x0E),
    op!("asl", AbsoluteX, 0x1E),
    op!("lsr", Accumulator, 0x4A),
    op!("lsr", DirectPage, 0x46),
    op!("lsr", DirectPageX, 0x56),
    op!("lsr", Absolute, 0x4E),
    op!("lsr", AbsoluteX, 0x5E),
    op!("rol", Accumulator, 0x2A),
    op!("rol", DirectPage, 0x26),
    op!("rol", DirectPageX, 0x36),
    op!("rol", Absolute, 0x2E),
    op!("rol", AbsoluteX, 0x3E),
    op!("ror", Accumulator, 0x6A),
    op!("ror", DirectPage, 0x66),
    op!("ror", DirectPageX, 0x76),
    op!("ror", Absolute, 0x6E),
    op!("ror", AbsoluteX, 0x7E),
    op!("inc", Accumulator, 0x1A),
    op!("inc", DirectPage, 0xE6),
    op!("inc", DirectPageX, 0xF6),
    op!("inc", Absolute, 0xEE),
    op!("inc", AbsoluteX, 0xFE),
    op!("dec", Accumulator, 0x3A),
    op!("dec", DirectPage, 0xC6),
    op!("dec", DirectPageX, 0xD6),
    op!("dec", Absolute, 0xCE),
    op!("dec", AbsoluteX, 0xDE),
    op!("bit", Immediate, 0x89, ACC),
    op!("bit", DirectPage, 0x24),
    op!("bit", DirectPageX, 0x34),
    op!("bit", Absolute, 0x2C),
    op!("bit", AbsoluteX, 0x3C),
    op!("trb", DirectPage, 0x14),
    op!("trb", Absolute, 0x1C),
    op!("tsb", DirectPage, 0x04),
    op!("tsb", Absolute, 0x0C),
    // index registers
    op!("cpx", Immediate, 0xE0, IDX),
    op!("cpx", DirectPage, 0xE4),
    op!("cpx", Absolute, 0xEC),
    op!("cpy", Immediate, 0xC0, IDX),
    op!("cpy", DirectPage, 0xC4),
    op!("cpy", Absolute, 0xCC),
    op!("ldx", Immediate, 0xA2, IDX),
    op!("ldx", DirectPage, 0xA6),
    op!("ldx", DirectPageY, 0xB6),
    op!("ldx", Absolute, 0xAE),
    op!("ldx", AbsoluteY, 0xBE),
    op!("ldy", Immediate, 0xA0, IDX),
    op!("ldy", DirectPage, 0xA4),
    op!("ldy", DirectPageX, 0xB4),
    op!("ldy", Absolute, 0xAC),
    op!("ldy", AbsoluteX, 0xBC),
    op!("stx", DirectPage, 0x86),
    op!("stx", DirectPageY, 0x96),
    op!("stx", Absolute, 0x8E),
    op!("sty", DirectPage, 0x84),
    op!("sty", DirectPageX, 0x94),
    op!("sty", Absolute, 0x8C),
    op!("stz", DirectPage, 0x64),
    op!("stz", DirectPageX, 0x74),
    op!("stz", Absolute, 0x9C),
    op!("stz", AbsoluteX, 0x9E),
    // branches
    op!("bcc", Relative, 0x90),
    op!("bcs", Relative, 0xB0),
    op!("beq", Relative, 0xF0),
    op!("bmi", Relative, 0x30),
    op!("bne", Relative, 0xD0),
    op!("bpl", Relative, 0x10),
    op!("bra", Relative, 0x80),
    op!("bvc", Relative, 0x50),
    op!("bvs", Relative, 0x70),
    op!("brl", RelativeLong, 0x82),
    // interrupts and processor status
    op!("brk", BrkCop, 0x00),
    op!("brk", Immediate, 0x00, EXTRA_BYTE16),
    op!("cop", BrkCop, 0x02),
    op!("cop", Immediate, 0x02, EXTRA_BYTE16),
    op!("rep", Immediate, 0xC2),
    op!("sep", Immediate, 0xE2),
    // jumps and calls
    op!("jml", AbsoluteIndirectLong, 0xDC),
    op!("jml", AbsoluteLong, 0x5C),
    op!("jmp", Absolute, 0x4C),
    op!("jmp", AbsoluteIndirect, 0x6C),
    op!("jmp", AbsoluteIndirectLong, 0xDC),
    op!("jmp", AbsoluteIndexedIndirectX, 0x7C),
    op!("jmp", AbsoluteLong, 0x5C),
    op!("jsl", AbsoluteLong, 0x22),
    op!("jsr", Absolute, 0x20),
    op!("jsr", AbsoluteIndexedIndirectX, 0xFC),
    op!("pea", Absolute, 0xF4),
    op!("pei", DirectPageIndirect, 0xD4),
    op!("per", RelativeLong, 0x62),
    op!("mvn", BlockMove, 0x54),
    op!("mvp", BlockMove, 0x44),
    // stack
    op!("pha", Stack, 0x48),
    op!("phb", Stack, 0x8B),
    op!("phd", Stack, 0x0B),
    op!("phk", Stack, 0x4B),
    op!("php", Stack, 0x08),
    op!("phx", Stack, 0xDA),
    op!("phy", Stack, 0x5A),
    op!("pla", Stack, 0x68),
    op!("plb", Stack, 0xAB),
    op!("pld", Stack, 0x2B),
    op!("plp", Stack, 0x28),
    op!("plx", Stack, 0xFA),
    op!("ply", Stack, 0x7A),
    op!("rti", Stack, 0x40),
    op!("rtl", Stack, 0x6B),
    op!("rts", Stack, 0x60),
    // implied
    op!("clc", Implied, 0x18),
    op!("cld", Implied, 0xD8),
    op!("cli", Implied, 0x58),
    op!("clv", Implied, 0xB8),
    op!("dex", Implied, 0xCA),
    op!("dey", Implied, 0x88),
    op!("inx", Implied, 0xE8),
    op!("iny", Implied, 0xC8),
    op!("nop", Implied, 0xEA),
    op!("sec", Implied, 0x38),
    op!("sed", Implied, 0xF8),
    op!("sei", Implied, 0x78),
    op!("stp", Implied, 0xDB),
    op!("tax", Implied, 0xAA),
    op!("tay", Implied, 0xA8),
    op!("tcd", Implied, 0x5B),
    op!("tcs", Implied, 0x1B),
    op!("tdc", Implied, 0x7B),
    op!("tsc", Implied, 0x3B),
    op!("tsx", Implied, 0xBA),
    op!("txa", Implied, 0x8A),
    op!("txs", Implied, 0x9A),
    op!("txy", Implied, 0x9B),
    op!("tya", Implied, 0x98),
    op!("tyx", Implied, 0xBB),
    op!("wai", Implied, 0xCB),
    op!("wdm", Implied, 0x42),
    op!("xba", Implied, 0xEB),
    op!("xce", Implied, 0xFB),
];

pub fn is_mnemonic(name: &str) -> bool {
    OPCODE_TABLE
        .iter()
        .any(|entry| entry.mnemonic.eq_ignore_ascii_case(name))
}

/// Addressing modes supported by `mnemonic`, in [`AddressingMode::PRIORITY`] order.
pub fn addressing_modes(mnemonic: &str) -> Result<Vec<AddressingMode>, IsaError> {
    let supported: Vec<AddressingMode> = OPCODE_TABLE
        .iter()
        .filter(|entry| entry.mnemonic.eq_ignore_ascii_case(mnemonic))
        .map(|entry| entry.mode)
        .collect();
    if supported.is_empty() {
        return Err(IsaError::UnknownMnemonic {
            mnemonic: mnemonic.to_string(),
        });
    }

    Ok(AddressingMode::PRIORITY
        .iter()
        .copied()
        .filter(|mode| supported.contains(mode))
        .collect())
}

pub fn lookup(mnemonic: &str, mode: AddressingMode) -> Result<OpcodeDescriptor, IsaError> {
    if let Some(entry) = OPCODE_TABLE
        .iter()
        .find(|entry| entry.mode == mode && entry.mnemonic.eq_ignore_ascii_case(mnemonic))
    {
        return Ok(*entry);
    }

    if is_mnemonic(mnemonic) {
        Err(IsaError::UnsupportedMode {
            mnemonic: mnemonic.to_string(),
            mode,
        })
    } else {
        Err(IsaError::UnknownMnemonic {
            mnemonic: mnemonic.to_string(),
        })
    }
}

pub fn mnemonics() -> impl Iterator<Item = &'static str> {
    let mut seen: Vec<&'static str> = Vec::new();
    OPCODE_TABLE.iter().filter_map(move |entry| {
        if seen.contains(&entry.mnemonic) {
            None
        } else {
            seen.push(entry.mnemonic);
            Some(entry.mnemonic)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_byte_is_encodable() {
        let mut seen = [false; 256];
        for entry in OPCODE_TABLE {
            seen[usize::from(entry.opcode)] = true;
        }
        let missing: Vec<usize> = (0..256).filter(|index| !seen[*index]).collect();
        assert!(missing.is_empty(), "missing opcodes: {missing:02X?}");
    }

    #[test]
    fn mnemonic_and_mode_pairs_are_unique() {
        for (index, entry) in OPCODE_TABLE.iter().enumerate() {
            let duplicate = OPCODE_TABLE[index + 1..]
                .iter()
                .any(|other| other.mnemonic == entry.mnemonic && other.mode == entry.mode);
            assert!(!duplicate, "duplicate {} {:?}", entry.mnemonic, entry.mode);
        }
        assert_eq!(mnemonics().count(), 92);
    }

    #[test]
    fn looks_up_case_insensitively() {
        let entry = lookup("LDA", AddressingMode::Immediate).expect("lda immediate");
        assert_eq!(entry.opcode, 0xA9);
        assert_eq!(entry.size(), 2);
        assert!(entry.flags.contains(OpcodeFlags::ACC_IMM));
        assert!(!entry.flags.contains(OpcodeFlags::IDX_IMM));

        let entry = lookup("ldx", AddressingMode::Immediate).expect("ldx immediate");
        assert!(entry.flags.contains(OpcodeFlags::IDX_IMM));
    }

    #[test]
    fn direct_page_x_load_uses_b5() {
        let entry = lookup("lda", AddressingMode::DirectPageX).expect("lda dp,x");
        assert_eq!(entry.opcode, 0xB5);
    }

    #[test]
    fn modes_come_back_in_priority_order() {
        let modes = addressing_modes("jmp").expect("jmp");
        assert_eq!(
            modes,
            vec![
                AddressingMode::Absolute,
                AddressingMode::AbsoluteIndexedIndirectX,
                AddressingMode::AbsoluteLong,
                AddressingMode::AbsoluteIndirect,
                AddressingMode::AbsoluteIndirectLong,
            ]
        );
    }

    #[test]
    fn reports_unknown_mnemonic_and_mode() {
        assert_eq!(
            addressing_modes("foo"),
            Err(IsaError::UnknownMnemonic {
                mnemonic: "foo".to_string()
            })
        );
        assert!(matches!(
            lookup("nop", AddressingMode::Absolute),
            Err(IsaError::UnsupportedMode { .. })
        ));
    }

    #[test]
    fn long_forms_are_four_bytes() {
        assert_eq!(
            lookup("jsl", AddressingMode::AbsoluteLong)
                .expect("jsl")
                .size(),
            4
        );
        assert_eq!(lookup("brl", AddressingMode::RelativeLong).expect("brl").size(), 3);
        assert_eq!(lookup("brk", AddressingMode::BrkCop).expect("brk").size(), 2);
    }
}
