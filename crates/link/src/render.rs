use indexmap::IndexMap;
use tracing::{debug, warn};

use c816_core::SegmentOutput;

use super::{OutputFormat, OutputOptions};

const RECORD_LEN: usize = 16;

pub fn render_output(segments: &IndexMap<String, SegmentOutput>, options: &OutputOptions) -> Vec<u8> {
    let image = memory_image(segments, options.unused_byte);
    match options.format {
        OutputFormat::Memory => image,
        OutputFormat::IntelHex => intel_hex(&image, options.ihex_strip, options.unused_byte).into_bytes(),
    }
}

/// Lays every segment with a file offset into one buffer. A chunk lands at
/// `file_offset + (chunk.start - start)`; the image ends after the last byte
/// written or the last segment's file offset, whichever is further.
pub fn memory_image(segments: &IndexMap<String, SegmentOutput>, unused_byte: u8) -> Vec<u8> {
    let mut present: Vec<_> = segments
        .iter()
        .filter(|(_, segment)| segment.file_offset >= 0)
        .collect();
    present.sort_by_key(|(_, segment)| segment.file_offset);

    let mut image = Vec::new();
    for (name, segment) in present {
        let Ok(file_offset) = usize::try_from(segment.file_offset) else {
            continue;
        };
        if image.len() < file_offset {
            image.resize(file_offset, unused_byte);
        }

        for chunk in &segment.code {
            let Ok(at) = usize::try_from(segment.file_offset + chunk.start - segment.start) else {
                warn!(
                    segment = %name,
                    start = chunk.start,
                    "code below the segment start is left out of the image"
                );
                continue;
            };
            let end = at + chunk.bytes.len();
            if image.len() < end {
                image.resize(end, unused_byte);
            }
            image[at..end].copy_from_slice(&chunk.bytes);
        }
    }

    debug!(len = image.len(), "built memory image");
    image
}

/// Intel HEX text for `image`, addressed from zero.
pub fn intel_hex(image: &[u8], strip_unused: bool, unused_byte: u8) -> String {
    let mut out = String::new();
    let mut upper = 0usize;

    for (index, data) in image.chunks(RECORD_LEN).enumerate() {
        if strip_unused && data.iter().all(|byte| *byte == unused_byte) {
            continue;
        }
        let offset = index * RECORD_LEN;
        if offset >> 16 != upper {
            upper = offset >> 16;
            let [high, low] = ((upper & 0xFFFF) as u16).to_be_bytes();
            push_record(&mut out, 0, 0x04, &[high, low]);
        }
        push_record(&mut out, (offset & 0xFFFF) as u16, 0x00, data);
    }

    push_record(&mut out, 0, 0x01, &[]);
    out
}

fn push_record(out: &mut String, address: u16, kind: u8, data: &[u8]) {
    let [high, low] = address.to_be_bytes();
    let mut bytes = vec![data.len() as u8, high, low, kind];
    bytes.extend_from_slice(data);
    let sum = bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    bytes.push(0u8.wrapping_sub(sum));

    out.push(':');
    for byte in bytes {
        out.push_str(&format!("{byte:02X}"));
    }
    out.push('\n');
}
