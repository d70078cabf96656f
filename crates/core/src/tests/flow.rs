use super::*;

#[test]
fn nested_if_branches_over_blocks() {
    let bytes = code_at_zero(
        "_init:\n    lda #0x01\n    if z_set\n        ldy #0x00\n        if z_clear\n            ldx #0xff\n        endif\n    endif\n",
    );
    assert_eq!(
        bytes,
        vec![0xA9, 0x01, 0xD0, 0x06, 0xA0, 0x00, 0xF0, 0x02, 0xA2, 0xFF]
    );
}

#[test]
fn each_condition_uses_its_inverse_branch() {
    for (set, clear, set_skip, clear_skip) in [
        ("c_set", "c_clear", 0x90, 0xB0),
        ("v_set", "v_clear", 0x50, 0x70),
        ("n_set", "n_clear", 0x10, 0x30),
    ] {
        let bytes = code_at_zero(&format!(
            "    lda #0x01\n    if {set}\n        ldy #0x00\n        if {clear}\n            ldx #0xff\n        endif\n    endif\n"
        ));
        assert_eq!(
            bytes,
            vec![0xA9, 0x01, set_skip, 0x06, 0xA0, 0x00, clear_skip, 0x02, 0xA2, 0xFF],
            "{set}/{clear}"
        );
    }
}

#[test]
fn if_else_jumps_past_the_else_branch() {
    let bytes = code_at_zero(
        "    lda #0x01\n    if z_set\n        ldy #0x00\n        if z_clear\n            ldx #0xff\n        else\n            ldx #0x01\n        endif\n    else\n        ldy #0x01\n    endif\n",
    );
    assert_eq!(
        bytes,
        vec![
            0xA9, 0x01, 0xD0, 0x0C, 0xA0, 0x00, 0xF0, 0x04, 0xA2, 0xFF, 0x80, 0x02, 0xA2, 0x01,
            0x80, 0x02, 0xA0, 0x01,
        ]
    );
}

#[test]
fn nested_do_until() {
    let bytes = code_at_zero(
        "    lda #0x01\n    do\n        do\n            inc a\n        until z_clear\n    until z_set\n",
    );
    assert_eq!(bytes, vec![0xA9, 0x01, 0x1A, 0xF0, 0xFD, 0xD0, 0xFB]);
}

#[test]
fn do_forever_picks_short_or_long_branch() {
    let bytes = code_at_zero("    lda #0x01\n    do\n        inc a\n    forever\n");
    assert_eq!(bytes, vec![0xA9, 0x01, 0x1A, 0x80, 0xFD]);

    let bytes = code_at_zero("    do\n        .fill 200, 0xEA\n    forever\n");
    assert_eq!(bytes.len(), 203);
    // BRL back to 0 from 200: -(200 + 3)
    assert_eq!(&bytes[200..], &[0x82, 0x35, 0xFF]);
}

#[test]
fn while_loop_tests_at_both_ends() {
    let bytes = code_at_zero(
        "    sec\n    lda #0\n    while c_set\n        inc a\n        cmp #0x20\n        if z_set\n            sec\n        endif\n    endwhile\n",
    );
    assert_eq!(
        bytes,
        vec![0x38, 0xA9, 0x00, 0x90, 0x08, 0x1A, 0xC9, 0x20, 0xD0, 0x01, 0x38, 0xB0, 0xF8]
    );
}

#[test]
fn switch_compares_each_case() {
    let bytes = code_at_zero(
        "    lda #0x01\n    switch a\n        case #0x01\n            nop\n        case #0x02\n            inx\n        case #0x03\n            iny\n    endswitch\n",
    );
    assert_eq!(
        bytes,
        vec![
            0xA9, 0x01, 0xC9, 0x01, 0xD0, 0x03, 0xEA, 0x80, 0x0C, 0xC9, 0x02, 0xD0, 0x03, 0xE8,
            0x80, 0x05, 0xC9, 0x03, 0xD0, 0x01, 0xC8,
        ]
    );
}

#[test]
fn switch_on_index_uses_index_width() {
    let bytes = code_at_zero(
        "    .i16\n    switch y\n        case #0x4401\n            nop\n        case #0x02\n            inx\n    endswitch\n",
    );
    assert_eq!(
        bytes,
        vec![
            0xC0, 0x01, 0x44, 0xD0, 0x03, 0xEA, 0x80, 0x06, 0xC0, 0x02, 0x00, 0xD0, 0x01, 0xE8,
        ]
    );
}

#[test]
fn case_value_wider_than_register_fails() {
    let kind = failure_kind(&format!(
        "{CODE_AT_ZERO}    switch x\n        case #0x1234\n    endswitch\n"
    ));
    assert!(matches!(kind, AsmErrorKind::ParameterTooLarge { .. }), "{kind:?}");
}

#[test]
fn flow_without_opener_fails() {
    for (body, message) in [
        ("    else\n", "unexpected ELSE"),
        ("    endif\n", "unexpected ENDIF"),
        ("    until z_set\n", "unexpected UNTIL"),
        ("    forever\n", "unexpected FOREVER"),
        ("    endwhile\n", "unexpected ENDWHILE"),
        ("    endswitch\n", "unexpected ENDSWITCH"),
    ] {
        let kind = failure_kind(&format!("{CODE_AT_ZERO}{body}"));
        assert!(matches!(kind, AsmErrorKind::UnexpectedFlowControl { .. }));
        assert_eq!(kind.to_string(), message);
    }
}

#[test]
fn mismatched_closer_fails() {
    let kind = failure_kind(&format!("{CODE_AT_ZERO}    do\n    endif\n"));
    assert!(matches!(kind, AsmErrorKind::UnmatchedFlowControl { .. }));
    assert_eq!(kind.to_string(), "ENDIF with no matching IF statement");

    let kind = failure_kind(&format!("{CODE_AT_ZERO}    if z_set\n    until c_set\n"));
    assert_eq!(kind.to_string(), "UNTIL with no matching DO statement");

    let kind = failure_kind(&format!("{CODE_AT_ZERO}    do\n    endwhile\n"));
    assert!(matches!(kind, AsmErrorKind::UnmatchedFlowControl { .. }));
    assert_eq!(kind.to_string(), "ENDWHILE with no matching WHILE statement");
}

#[test]
fn unterminated_flow_is_reported_at_the_opener() {
    let error = failure(&format!("{CODE_AT_ZERO}    nop\n    while z_clear\n    nop\n"));
    assert_eq!(error.kind.to_string(), "flow control WHILE not terminated");
    assert_eq!(error.location.line, 5);
}

#[test]
fn if_body_too_large_for_a_short_branch() {
    let error = failure(&format!(
        "{CODE_AT_ZERO}    if z_set\n    .fill 128, 0xEA\n    endif\n"
    ));
    assert!(matches!(error.kind, AsmErrorKind::RelativeBranchOutOfRange { .. }));
    assert_eq!(error.kind.to_string(), "IF/ENDIF section too large");

    let bytes = code_at_zero("    if z_set\n    .fill 127, 0xEA\n    endif\n");
    assert_eq!(&bytes[..2], &[0xD0, 0x7F]);
}

#[test]
fn flow_control_needs_a_segment() {
    let kind = failure_kind("    do\n    forever\n");
    assert!(matches!(kind, AsmErrorKind::MissingSegment));
}

#[test]
fn do_forever_long_branch_limit() {
    let bytes = code_at_zero("    do\n        .fill 32765, 0xEA\n    forever\n");
    assert_eq!(&bytes[32765..], &[0x82, 0x00, 0x80]);

    let error = failure(&format!(
        "{CODE_AT_ZERO}    do\n        .fill 32766, 0xEA\n    forever\n"
    ));
    assert!(matches!(error.kind, AsmErrorKind::RelativeBranchOutOfRange { .. }));
    assert_eq!(error.kind.to_string(), "DO/FOREVER section too large");
}
