use super::*;

#[test]
fn chunks_land_relative_to_segment_start() {
    let map = segments(vec![(
        "code",
        segment(0xC000, 0x3FE0, 0, &[(0xC000, &[0xEA, 0xEA]), (0xC004, &[0x60])]),
    )]);
    assert_eq!(memory_image(&map, 0xFF), vec![0xEA, 0xEA, 0xFF, 0xFF, 0x60]);
}

#[test]
fn segments_are_laid_out_by_file_offset() {
    let map = segments(vec![
        ("vectors", segment(0xFFFA, 6, 4, &[(0xFFFC, &[0x00, 0xC0])])),
        ("code", segment(0xC000, 0x100, 0, &[(0xC000, &[0x4C, 0x00, 0xC0])])),
    ]);
    assert_eq!(
        memory_image(&map, 0x00),
        vec![0x4C, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0xC0]
    );
}

#[test]
fn segments_without_file_offset_are_skipped() {
    let map = segments(vec![
        ("zp", segment(0x0000, 0x100, -1, &[(0x0000, &[0x01, 0x02])])),
        ("code", segment(0x8000, 0x100, 0, &[(0x8000, &[0xEA])])),
    ]);
    assert_eq!(memory_image(&map, 0x00), vec![0xEA]);
}

#[test]
fn empty_segment_still_pads_to_its_offset() {
    let map = segments(vec![
        ("code", segment(0x8000, 0x10, 0, &[(0x8000, &[0xEA])])),
        ("data", segment(0x9000, 0x10, 3, &[])),
    ]);
    assert_eq!(memory_image(&map, 0xAA), vec![0xEA, 0xAA, 0xAA]);
}

#[test]
fn intel_hex_records_carry_checksums() {
    let hex = intel_hex(&[0xE6, 0x01, 0xEA], false, 0x00);
    assert_eq!(hex, ":03000000E601EA2C\n:00000001FF\n");
}

#[test]
fn intel_hex_splits_sixteen_byte_records() {
    let image: Vec<u8> = (0..20).collect();
    let hex = intel_hex(&image, false, 0x00);
    let lines: Vec<_> = hex.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(":10000000000102030405060708090A0B0C0D0E0F"));
    assert!(lines[1].starts_with(":0400100010111213"));
    assert_eq!(lines[2], ":00000001FF");
}

#[test]
fn intel_hex_strip_drops_unused_records_and_extends_addresses() {
    let mut image = vec![0xFF; 0x10010];
    image[0] = 0x01;
    image[0x10000] = 0xAA;

    let hex = intel_hex(&image, true, 0xFF);
    let lines: Vec<_> = hex.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with(":1000000001FF"));
    assert_eq!(lines[1], ":020000040001F9");
    assert_eq!(
        lines[2],
        format!(":10000000AA{}55", "FF".repeat(15))
    );
    assert_eq!(lines[3], ":00000001FF");

    let full = intel_hex(&image, false, 0xFF);
    assert_eq!(full.lines().count(), 0x1001 + 2);
}

#[test]
fn render_output_follows_format() {
    let map = segments(vec![("code", segment(0, 0x10, 0, &[(0, &[0xEA])]))]);
    let memory = render_output(&map, &OutputOptions::default());
    assert_eq!(memory, vec![0xEA]);

    let options = OutputOptions {
        format: OutputFormat::IntelHex,
        ..OutputOptions::default()
    };
    let hex = String::from_utf8(render_output(&map, &options)).expect("ascii");
    assert_eq!(hex, ":01000000EA15\n:00000001FF\n");
}
