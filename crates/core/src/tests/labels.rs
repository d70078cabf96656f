use super::*;

#[test]
fn current_address_branch() {
    assert_eq!(code_at_c000("main:   bra .\n"), vec![0x80, 0xFE]);
}

#[test]
fn temp_labels_without_direction() {
    let bytes = code_at_c000("main:   bra @1\n        jmp main\n@1:     bra .\n@1:     bra @1\n");
    assert_eq!(
        bytes,
        vec![0x80, 0x03, 0x4C, 0x00, 0xC0, 0x80, 0xFE, 0x80, 0xFE]
    );
}

#[test]
fn temp_labels_with_direction() {
    let bytes = code_at_c000(
        "main:   bra @1\n        jmp main\n@1:     bra @2+\n@2:     bra @1-\n@1:     nop\n",
    );
    assert_eq!(
        bytes,
        vec![0x80, 0x03, 0x4C, 0x00, 0xC0, 0x80, 0x00, 0x80, 0xFC, 0xEA]
    );

    let bytes = code_at_c000(
        "main:   bra @1\n        jmp main\n@1:     bra @1+\n@1:     bra @1-\n@1:     nop\n",
    );
    assert_eq!(
        bytes,
        vec![0x80, 0x03, 0x4C, 0x00, 0xC0, 0x80, 0x00, 0x80, 0xFE, 0xEA]
    );
}

#[test]
fn ambiguous_temp_label() {
    let kind = failure_kind(&format!(
        "{CODE_AT_C000}@1:     nop\n        bra @1\n@1:     nop\n"
    ));
    assert!(matches!(kind, AsmErrorKind::AmbiguousReference { .. }), "{kind:?}");
}

#[test]
fn branch_reach_is_one_signed_byte() {
    let bytes = code_at_zero("    bra target\n    .fill 127, 0xEA\ntarget: nop\n");
    assert_eq!(&bytes[..2], &[0x80, 0x7F]);

    let kind = failure_kind(&format!(
        "{CODE_AT_ZERO}    bra target\n    .fill 128, 0xEA\ntarget: nop\n"
    ));
    assert!(matches!(kind, AsmErrorKind::RelativeBranchOutOfRange { .. }));
}

#[test]
fn globals_cross_segments() {
    let source = "    .segment \"code\", 0x8000, 0x100, 0\n    .segment \"data\", 0x0200, 0x100, -1\n    .code\n    .org start\n    .global entry\nentry:  nop\n    .data\n    .org start\n    .dw entry\n";
    let output = assemble(source);
    assert_eq!(code(&output, "data"), vec![0x00, 0x80]);
    assert_eq!(output.segments["data"].file_offset, -1);

    let kind = failure_kind(
        "    .segment \"code\", 0x8000, 0x100, 0\n    .segment \"data\", 0x0200, 0x100, -1\n    .code\n    .org start\nlocal:  nop\n    .data\n    .org start\n    .dw local\n",
    );
    assert!(matches!(kind, AsmErrorKind::UndefinedLabel { .. }));
}

#[test]
fn globalall_exports_later_labels() {
    let source = "    .segment \"code\", 0x8000, 0x100, 0\n    .segment \"data\", 0x0200, 0x100, -1\n    .code\n    .org start\n    .globalall\none:    nop\ntwo:    nop\n    .data\n    .org start\n    .dw one, two\n";
    assert_eq!(code(&assemble(source), "data"), vec![0x00, 0x80, 0x01, 0x80]);
}

#[test]
fn label_declarations_are_checked() {
    let cases = [
        ("main:   nop\nmain:   nop\n", "label redefined: main"),
        ("x:      nop\n", "reserved name used as label: x"),
        ("lda:    nop\n", "instruction name used as label: lda"),
    ];
    for (body, message) in cases {
        let kind = failure_kind(&format!("{CODE_AT_C000}{body}"));
        assert_eq!(kind.to_string(), message);
    }

    let kind = failure_kind(&format!("VALUE = 1\n{CODE_AT_C000}VALUE:  nop\n"));
    assert!(matches!(kind, AsmErrorKind::LabelRedefinition { .. }));

    let kind = failure_kind(&format!("{CODE_AT_C000}main:   nop\nmain = 1\n"));
    assert_eq!(kind.to_string(), "equate redefines label");
}

#[test]
fn undefined_label() {
    let kind = failure_kind(&format!("{CODE_AT_C000}        jmp nowhere\n"));
    assert_eq!(kind.to_string(), "name \"nowhere\" used but not defined");
}

#[test]
fn structural_errors() {
    let kind = failure_kind("    nop\n");
    assert!(matches!(kind, AsmErrorKind::MissingSegment));

    let kind = failure_kind(
        "    .segment \"code\", 0, 0x100, 0\n    .segment \"CODE\", 0x100, 0x100, 0\n",
    );
    assert!(matches!(kind, AsmErrorKind::SegmentRedefinition { .. }));

    let kind = failure_kind("    .nosuch\n");
    assert!(matches!(kind, AsmErrorKind::UnknownCompilerDirective { .. }));

    let kind = failure_kind(
        "    .segment \"tiny\", 0, 2, 0\n    .tiny\n    .org start\n    lda $1234\n",
    );
    assert!(matches!(kind, AsmErrorKind::SegmentOverflow { .. }));

    let kind = failure_kind(&format!("{CODE_AT_C000}    frob\n"));
    assert!(matches!(kind, AsmErrorKind::UnknownOpcode { .. }));

    let kind = failure_kind(&format!("{CODE_AT_C000}    lda #0x1234\n"));
    assert!(matches!(kind, AsmErrorKind::UnknownAddressingMode { .. }));

    let kind = failure_kind(&format!("{CODE_AT_C000}    .incbin \"missing.bin\"\n"));
    assert!(matches!(kind, AsmErrorKind::FileNotFound { .. }));

    let kind = failure_kind(&format!("{CODE_AT_C000}    .dw \"text\"\n"));
    assert_eq!(kind.to_string(), "strings are not allowed in DW");
}
