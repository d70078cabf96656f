use super::*;

fn listing(body: &str) -> String {
    let options = AssembleOptions {
        listing: true,
        ..AssembleOptions::default()
    };
    let output = assemble_with(&format!("{CODE_AT_C000}{body}"), &MemoryAssetFS::new(), &options);
    output.listing.expect("listing requested")
}

#[test]
fn listing_is_only_built_on_request() {
    assert!(assemble(&format!("{CODE_AT_C000}    nop\n")).listing.is_none());
}

#[test]
fn listing_shows_segments_and_instructions() {
    let text = listing("main:   lda #0x01\n        sta $1234\n        bra main\n");
    assert!(text.contains(";; segment \"code\" size = 0x3FE0 start = 0xC000 file_offset = 0x0000"));
    assert!(text.contains(";; segment \"code\", org = 0xC000"));
    assert!(text.contains("Accumulator/Memory = 8-bit, Index registers = 8-bit"));
    assert!(text.contains(";; set org = 0xC000"));
    assert!(text.contains(";; main:"));

    let rows: Vec<_> = text.lines().filter(|line| line.starts_with("00:C0")).collect();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].starts_with("00:C000 A9 01"));
    assert!(rows[0].ends_with("LDA #0x01"));
    assert!(rows[1].ends_with("STA 0x1234"));
    assert!(rows[2].ends_with("BRA 0xC000"));
}

#[test]
fn listing_annotates_structured_flow() {
    let text = listing("    if z_set\n    nop\n    endif\n");
    let branch = text
        .lines()
        .find(|line| line.starts_with("00:C000"))
        .expect("branch row");
    assert!(branch.contains("BNE 0xC003"));
    assert!(branch.ends_with(";; IF Z_SET"));
    assert!(text.contains(";; ENDIF Z_SET"));
}

#[test]
fn listing_splits_data_rows() {
    let text = listing("    .db \"hello\"\n    .fill 2, 0xEA\n");
    assert!(text.contains("00:C000 68 65 6C 6C"));
    assert!(text.contains(".DB \"hello\""));
    assert!(text.contains(".FILL 0x0002, 0xEA"));
}

#[test]
fn comment_warnings_are_collected() {
    let output = assemble(&format!("{CODE_AT_C000}    nop /* open\n"));
    assert_eq!(code(&output, "code"), vec![0xEA]);
    assert_eq!(output.warnings.len(), 1);
    assert!(!output.rendered_warnings.is_empty());
}

#[test]
fn parse_errors_are_rendered() {
    let error = assemble_source_with_fs(
        "broken.s",
        "    lda #(1\n",
        &AssembleOptions::default(),
        &MemoryAssetFS::new(),
    )
    .expect_err("syntax error");
    assert!(!error.diagnostics.is_empty());
    assert!(error.rendered.contains("broken.s"));
}
