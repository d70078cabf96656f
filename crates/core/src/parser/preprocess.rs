use crate::diag::Diagnostic;
use crate::span::{SourceId, Span};

/// Blanks out `/* ... */` comments, keeping newlines and byte offsets intact.
///
/// Quoted strings and `;`/`//` line comments are skipped over so a `/*` inside them
/// does not open a block. An unterminated block runs to the end of the file and is
/// reported as a warning.
pub(super) fn strip_block_comments(source_id: SourceId, source_text: &str) -> (String, Vec<Diagnostic>) {
    let bytes = source_text.as_bytes();
    let mut out = String::with_capacity(source_text.len());
    let mut warnings = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' && bytes.get(i + 1) == Some(&b'"') {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b';' => i = skip_to_newline(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_to_newline(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                let end = match source_text[i + 2..].find("*/") {
                    Some(found) => i + 2 + found + 2,
                    None => {
                        warnings.push(
                            Diagnostic::warning(
                                Span::new(source_id, start, start + 2),
                                "unterminated block comment",
                            )
                            .with_help("the rest of the file is ignored; close it with '*/'"),
                        );
                        bytes.len()
                    }
                };
                out.push_str(&source_text[copied..start]);
                out.extend(source_text[start..end].chars().map(blank));
                copied = end;
                i = end;
            }
            _ => i += 1,
        }
    }

    out.push_str(&source_text[copied.min(source_text.len())..]);
    (out, warnings)
}

fn skip_to_newline(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map(|offset| from + offset)
        .unwrap_or(bytes.len())
}

fn blank(ch: char) -> String {
    if ch == '\n' {
        "\n".to_string()
    } else {
        " ".repeat(ch.len_utf8())
    }
}
