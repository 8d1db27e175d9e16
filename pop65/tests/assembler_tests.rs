//! End-to-end tests through the public API.

use std::fs;

use pop65::{assemble_str, AsmConfig, Assembler, ErrorKind, MemResolver};

fn bytes(src: &str) -> Vec<u8> {
    assemble_str(src).expect("source should assemble").bytes
}

#[test]
fn test_if_zero_assembles_else_branch() {
    let src = "
        .org $1000
        .if 0
        lda #1
        .else
        lda #2
        .endif
    ";
    assert_eq!(bytes(src), vec![0xA9, 0x02]);
}

#[test]
fn test_if_one_assembles_then_branch() {
    let src = "
        .org $1000
        .if 1
        lda #1
        .else
        lda #2
        .endif
    ";
    assert_eq!(bytes(src), vec![0xA9, 0x01]);
}

#[test]
fn test_reserve_fill() {
    assert_eq!(bytes(".org 0\n.ds 3, 4"), vec![4, 4, 4]);
    assert_eq!(bytes(".org 0\n.ds 2"), vec![0, 0]);
}

#[test]
fn test_character_literals() {
    assert_eq!(bytes(".org 0\n.byte '3'"), vec![0x33]);
    assert_eq!(bytes(".org 0\n.byte \"9\""), vec![0x39]);
    assert_eq!(bytes(".org 0\nlda #'A'"), vec![0xA9, 0x41]);
}

#[test]
fn test_output_off_advances_pc() {
    let src = "
        .org $2000
        .off
        .ds 5
        .on
        after .byte 1
    ";
    let out = assemble_str(src).unwrap();
    assert_eq!(out.bytes, vec![1]);
    assert_eq!(out.lookup("after"), Some(0x2005));
}

#[test]
fn test_debug_template_with_comments() {
    let src = "
        .org $8000
        .dbg \"P:{V-8000}:{L}:{C}\"
foo:    nop                     ; description of foo
        nop
        ; description of...
        ; bar!
bar     nop
    ";
    let out = assemble_str(src).unwrap();
    assert_eq!(
        out.debug,
        vec!["P:0:foo:description of foo", "P:2:bar:description of... bar!"]
    );
    assert_eq!(
        out.debug_file(),
        "P:0:foo:description of foo\nP:2:bar:description of... bar!\n"
    );
}

#[test]
fn test_duplicate_label() {
    let src = "
        .org 0
        here nop
        here nop
    ";
    let err = assemble_str(src).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateSymbol);
    assert_eq!(err.location.map(|l| l.line), Some(4));
}

#[test]
fn test_labels_agree_between_passes() {
    let src = "
        .org $0600
        jmp over
        table .word entry, over
        entry lda table,x
        over rts
    ";
    let out = assemble_str(src).unwrap();
    assert_eq!(out.lookup("table"), Some(0x0603));
    assert_eq!(out.lookup("entry"), Some(0x0607));
    assert_eq!(out.lookup("over"), Some(0x060A));
    assert_eq!(
        out.bytes,
        vec![0x4C, 0x0A, 0x06, 0x07, 0x06, 0x0A, 0x06, 0xBD, 0x03, 0x06, 0x60]
    );
}

#[test]
fn test_hi_lo_bytes() {
    let src = "
        .org $c000
        vector = $1234
        lda #<vector
        ldx #>vector
        .byte <vector, >vector
    ";
    assert_eq!(bytes(src), vec![0xA9, 0x34, 0xA2, 0x12, 0x34, 0x12]);
}

#[test]
fn test_failed_assertion_reports_but_completes() {
    let out = assemble_str(".org 0\n.assert 0, \"boom\"\nnop").unwrap();
    assert!(!out.is_success());
    assert_eq!(out.bytes, vec![0xEA]);
    assert_eq!(
        out.diagnostics[0].to_string(),
        "<input>:2: assertion failed: boom"
    );
}

#[test]
fn test_symbol_file_format() {
    let out = assemble_str("a = 1\nb .equ $BEEF\n").unwrap();
    assert_eq!(out.symbol_file(), "a = $0001\nb = $BEEF\n");
}

#[test]
fn test_mem_resolver_include() {
    let resolver = MemResolver::new()
        .with("zp.inc", "ptr = $fb\n")
        .with("font.bin", vec![0xAAu8, 0x55]);
    let mut asm = Assembler::with_resolver(AsmConfig::default(), resolver);
    let src = "
        .inc \"zp.inc\"
        .org $0801
        lda (ptr),y
        .incbin \"font.bin\"
    ";
    let out = asm.assemble_str("main.s", src).unwrap();
    assert_eq!(out.bytes, vec![0xB1, 0xFB, 0xAA, 0x55]);
}

#[test]
fn test_assemble_file_with_includes_on_disk() {
    let dir = std::env::temp_dir().join(format!("pop65-it-{}", std::process::id()));
    let lib = dir.join("lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(dir.join("main.s"), ".org $1000\n.inc \"lib/sub.s\"\n").unwrap();
    fs::write(lib.join("sub.s"), ".inc \"leaf.s\"\n").unwrap();
    fs::write(lib.join("leaf.s"), "rts\n").unwrap();

    let out = Assembler::default()
        .assemble_file(dir.join("main.s"))
        .unwrap();
    assert_eq!(out.bytes, vec![0x60]);

    fs::remove_dir_all(&dir).unwrap();
}

#[cfg(feature = "listing")]
#[test]
fn test_listing_collects_assembled_lines() {
    let out = assemble_str(".org $0800\nlda #$42\n").unwrap();
    let lines = out.listing.lines();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1].address, Some(0x0800));
    assert_eq!(lines[1].bytes, vec![0xA9, 0x42]);
}

#[test]
fn test_parenthesized_modulo_in_condition() {
    let src = "
        .org $0800
        .if (4 % 2) = 0
        nop
        .endif
        .if (3 % 2) = 0
        rts
        .endif
    ";
    assert_eq!(bytes(src), vec![0xEA]);
}
