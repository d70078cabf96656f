use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum OutputFormat {
    #[default]
    Memory,
    IntelHex,
}

impl OutputFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Memory => "bin",
            Self::IntelHex => "hex",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Fills gaps in the image.
    pub unused_byte: u8,
    /// Leave out Intel HEX records holding nothing but `unused_byte`.
    pub ihex_strip: bool,
}
