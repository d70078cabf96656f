/// Maps one ASCII byte into the PETSCII shifted character set.
///
/// Lowercase letters land on 0x41..=0x5A and uppercase letters on 0xC1..=0xDA;
/// every other byte passes through.
pub fn petscii_byte(byte: u8) -> u8 {
    match byte {
        b'a'..=b'z' => byte - b'a' + 0x41,
        b'A'..=b'Z' => byte - b'A' + 0xC1,
        other => other,
    }
}

pub fn petscii(text: &str) -> Vec<u8> {
    text.bytes().map(petscii_byte).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swaps_letter_cases_into_petscii_ranges() {
        assert_eq!(petscii("Hello, 64!"), vec![0xC8, 0x45, 0x4C, 0x4C, 0x4F, b',', b' ', b'6', b'4', b'!']);
        assert_eq!(petscii_byte(b'z'), 0x5A);
        assert_eq!(petscii_byte(b'Z'), 0xDA);
    }
}
