use super::*;

#[test]
fn equates_pick_direct_page_or_absolute() {
    let source = format!(
        "COUNTER  = 0x00\nCOUNTER2 = (COUNTER + 1)\nCOUNTER3 = 0x1001\n{CODE_AT_ZERO}_init:\n    inc COUNTER2  /* direct page */\n    inc COUNTER3  /* absolute */\n    jmp _init\n"
    );
    assert_eq!(
        code(&assemble(&source), "code"),
        vec![0xE6, 0x01, 0xEE, 0x01, 0x10, 0x4C, 0x00, 0x00]
    );
}

#[test]
fn nop_and_data_bytes() {
    let bytes = code_at_zero("_init:\n    nop\n    .db 0x4C, 0x00, 0x00 ; JMP 0x0000\n");
    assert_eq!(bytes, vec![0xEA, 0x4C, 0x00, 0x00]);
}

#[test]
fn backward_branch_to_label() {
    let bytes = code_at_zero("loop:   clc\n        bcc loop ; loop forever\n");
    assert_eq!(bytes, vec![0x18, 0x90, 0xFD]);
}

#[test]
fn forward_reference_sized_as_absolute() {
    let bytes = code_at_zero("loop:   lda const\n        bcc loop\nconst:  .dw $BEEF\n");
    assert_eq!(bytes, vec![0xAD, 0x05, 0x00, 0x90, 0xFB, 0xEF, 0xBE]);
}

#[test]
fn low_and_high_bytes_of_labels() {
    let tail = "        .segment \"vectors8\", $FFF0, $10, $3FF0\n        .vectors8\n        .org $FFFC\nreset:\n        .dw loop\n";
    let expected = vec![0xA9, 0x00, 0x85, 0x04, 0xA9, 0xC0, 0x85, 0x05, 0x6C, 0x04, 0x00];

    let masked = format!(
        "LO_ADDR = $04\nHI_ADDR = $05\nINDIR   = $0004\n{CODE_AT_C000}        .global loop\nloop:   lda #(loop & 0xFF)\n        sta LO_ADDR\n        lda #((loop & 0xFF00) >> 8)\n        sta HI_ADDR\n        jmp (INDIR)  // Loop forever\n{tail}"
    );
    let output = assemble(&masked);
    assert_eq!(code(&output, "code"), expected);
    assert_eq!(output.segments["vectors8"].code[0].start, 0xFFFC);
    assert_eq!(code(&output, "vectors8"), vec![0x00, 0xC0]);

    let operators = format!(
        "LO_ADDR = $04\nHI_ADDR = $05\nINDIR   = $0004\n{CODE_AT_C000}        .global loop\nloop:   lda #<loop\n        sta LO_ADDR\n        lda #>loop\n        sta HI_ADDR\n        jmp (INDIR)\n{tail}"
    );
    assert_eq!(code(&assemble(&operators), "code"), expected);
}

#[test]
fn fill_bytes_and_words() {
    let bytes = code_at_c000(
        "data:   .fill 0x100, 0x55 : .fill 0x100, %10101010\n        .fillw 0x100, 0xAA55\n",
    );
    let mut expected = vec![0x55; 0x100];
    expected.extend(vec![0b1010_1010; 0x100]);
    expected.extend([0x55, 0xAA].repeat(0x100));
    assert_eq!(bytes, expected);
}

#[test]
fn fill_counts_too_large_to_size_fail() {
    let kind = failure_kind(&format!("{CODE_AT_ZERO}    .fillw 0x4000000000000000, 0\n"));
    assert!(matches!(kind, AsmErrorKind::InvalidParameter { .. }), "{kind:?}");
    assert_eq!(kind.to_string(), "error parsing FILLW arguments");

    let kind = failure_kind(&format!("{CODE_AT_C000}    .fill 0x7FFFFFFFFFFFFFFF, 0\n"));
    assert!(matches!(kind, AsmErrorKind::SegmentOverflow { .. }), "{kind:?}");
}

#[test]
fn block_comment_hides_the_rest_of_the_line_group() {
    let bytes = code_at_c000(
        "data:   .fill 0x100, 0x55 /* : .fill 0x100, %10101010\n        .fillw 0x100, 0xAA55*/\n",
    );
    assert_eq!(bytes, vec![0x55; 0x100]);
}

#[test]
fn register_widths_follow_segment_switches() {
    let source = "        .segment \"code\", 0x4000, 0x4000, 0\n        .segment \"other\", 0xC000, 0x4000, 0\n        .a16\n        .code\n        .org start\nmain:\n        lda #$1234\n        .i16\n        .other\nfoo:    ldx #$55aa\n        .a8\n        .code\nl2:     lda #$66\n        .i8\n        .other\n        ldy #$12\n        lda #0x04\n";
    let output = assemble(source);
    assert_eq!(code(&output, "code"), vec![0xA9, 0x34, 0x12, 0xA9, 0x66]);
    assert_eq!(
        code(&output, "other"),
        vec![0xA2, 0xAA, 0x55, 0xA0, 0x12, 0xA9, 0x04]
    );
}

#[test]
fn strings_and_words_in_data() {
    let bytes = code_at_c000("        .dw 0x1234, $5678\n        .db \"Hi\", 0\n        .db p\"ab\"\n");
    assert_eq!(
        bytes,
        vec![0x34, 0x12, 0x78, 0x56, b'H', b'i', 0x00, 0x41, 0x42]
    );
}

#[test]
fn long_data_and_long_labels() {
    let source = "        .segment \"code\", 0x02:0000, 0x10000, 0\n        .code\n        .org start\nmain:   lda data\n        lda &data\n        lda &data & 0xFFFF\n        lda &data, x\ndata:   .dw 0xDEAD, 0xBEEF\n        .dl 0x123456\n";
    assert_eq!(
        code(&assemble(source), "code"),
        vec![
            0xAD, 0x0E, 0x00, 0xAF, 0x0E, 0x00, 0x02, 0xAD, 0x0E, 0x00, 0xBF, 0x0E, 0x00, 0x02,
            0xAD, 0xDE, 0xEF, 0xBE, 0x56, 0x34, 0x12,
        ]
    );
}

#[test]
fn include_binary_from_search_path() {
    let fs = MemoryAssetFS::new().with_file("assets/blob.bin", vec![1, 2, 3, 0xFF]);
    let options = AssembleOptions {
        include_dirs: vec!["assets".into()],
        ..AssembleOptions::default()
    };
    let output = assemble_with(
        &format!("{CODE_AT_C000}main:   .incbin \"blob.bin\"\n"),
        &fs,
        &options,
    );
    assert_eq!(code(&output, "code"), vec![1, 2, 3, 0xFF]);
}

#[test]
fn included_source_sees_outer_labels() {
    let fs = MemoryAssetFS::new().with_file("inc/body.s", "        inc a\n        dey\n        jmp main\n");
    let options = AssembleOptions {
        include_dirs: vec!["inc".into()],
        ..AssembleOptions::default()
    };
    let output = assemble_with(
        &format!("{CODE_AT_C000}main:   .include \"body.s\"\n"),
        &fs,
        &options,
    );
    assert_eq!(code(&output, "code"), vec![0x1A, 0x88, 0x4C, 0x00, 0xC0]);
}

#[test]
fn special_encodings() {
    let bytes = code_at_zero("    brl .\n    brk\n    mvp #$0e, #$09\n    rep #$30\n");
    assert_eq!(
        bytes,
        vec![0x82, 0xFD, 0xFF, 0x00, 0x00, 0x44, 0x09, 0x0E, 0xC2, 0x30]
    );
}

#[test]
fn origin_gaps_split_chunks() {
    let output = assemble(&format!("{CODE_AT_C000}        nop\n        .org $C080\n_d:     clc\n        bcc _d\n"));
    let chunks = &output.segments["code"].code;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].start, 0xC000);
    assert_eq!(chunks[1].start, 0xC080);
    assert_eq!(chunks[1].bytes, vec![0x18, 0x90, 0xFD]);
}

#[test]
fn segments_are_ordered_by_start() {
    let output = assemble(
        "    .segment \"high\", 0xF000, 0x100, 0x100\n    .segment \"low\", 0x1000, 0x100, 0\n    .high\n    .org start\n    nop\n    .low\n    .org start\n    rts\n",
    );
    let names: Vec<_> = output.segments.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["low", "high"]);
    assert_eq!(output.segments["high"].file_offset, 0x100);
    assert_eq!(output.segments["low"].size, 0x100);
}

#[test]
fn errors_carry_included_file_and_line() {
    let fs = MemoryAssetFS::new().with_file("bad.s", "        nop\n        foo\n");
    let error = assemble_source_with_fs(
        "main.s",
        &format!("{CODE_AT_C000}        .include \"bad.s\"\n"),
        &AssembleOptions::default(),
        &fs,
    )
    .expect_err("unknown opcode");
    assert_eq!(error.diagnostics.len(), 1);
    assert!(error.diagnostics[0].message.contains("unknown opcode 'foo'"));
    assert!(error.rendered.contains("included from main.s:4"));
}
