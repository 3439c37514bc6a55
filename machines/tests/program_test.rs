/// Tests for the PROG container reader/writer and the BASIC text loader.
use jr100_core::core::Bus;

use jr100_machines::jr100::Jr100Hardware;
use jr100_machines::program::{
    load_basic_text, load_prog, save_basic_text, write_prog_v2, ProgBinary, ProgramLoadError,
    BASIC_START_ADDRESS,
};

fn make_hardware() -> Jr100Hardware {
    Jr100Hardware::new(true, 894_000.0)
}

fn push_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Hand-build a PROG v1 container.
fn build_v1(name: &str, start: u32, flag: u32, payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"PROG");
    push_u32(&mut data, 1);
    push_u32(&mut data, name.len() as u32);
    data.extend_from_slice(name.as_bytes());
    push_u32(&mut data, start);
    push_u32(&mut data, payload.len() as u32);
    push_u32(&mut data, flag);
    data.extend_from_slice(payload);
    data
}

// =============================================================================
// PROG v1
// =============================================================================

#[test]
fn test_v1_basic_load_finalizes_area() {
    let mut hw = make_hardware();
    let payload = [0x00, 0x0A, 0x41, 0x42, 0x43, 0x44, 0x45, 0x00];
    let data = build_v1("HELLO", BASIC_START_ADDRESS as u32, 0, &payload);

    let info = load_prog(&mut hw, &data).unwrap();

    assert_eq!(info.name, "HELLO");
    assert!(info.basic_area);
    for (offset, &byte) in payload.iter().enumerate() {
        assert_eq!(hw.load8(BASIC_START_ADDRESS + offset as u16), byte);
    }

    // Three terminators after the last data byte.
    let last = BASIC_START_ADDRESS + payload.len() as u16 - 1;
    for offset in 1..=3 {
        assert_eq!(hw.load8(last + offset), 0xDF);
    }

    // Four sequential pointers starting at the last data address.
    for index in 0..4u16 {
        assert_eq!(hw.load16(0x0006 + index * 2), last + index);
    }
}

#[test]
fn test_v1_binary_load_skips_finalization() {
    let mut hw = make_hardware();
    let payload = [0xDE, 0xAD];
    let data = build_v1("BIN", 0x3000, 1, &payload);

    let info = load_prog(&mut hw, &data).unwrap();

    assert!(!info.basic_area);
    assert_eq!(hw.load8(0x3000), 0xDE);
    assert_eq!(hw.load8(0x3001), 0xAD);
    assert_eq!(info.regions.len(), 1);
    assert_eq!(info.regions[0].start, 0x3000);
    assert_eq!(info.regions[0].end, 0x3001);
    // Pointer table untouched.
    assert_eq!(hw.load16(0x0006), 0x0000);
}

#[test]
fn test_v1_oversized_payload_is_rejected() {
    let mut hw = make_hardware();
    let data = build_v1("BIG", 0xFF00, 1, &[0u8; 0x200]);
    assert!(matches!(
        load_prog(&mut hw, &data),
        Err(ProgramLoadError::ProgramTooLarge)
    ));
}

// =============================================================================
// PROG v2
// =============================================================================

#[test]
fn test_v2_writer_reader_round_trip() {
    let mut hw = make_hardware();
    let basic = [0x00, 0x0A, 0x50, 0x52, 0x00];
    let binary = [0x12, 0x34, 0x56];
    let data = write_prog_v2(
        "DEMO",
        Some(&basic),
        &[ProgBinary {
            start: 0x3000,
            data: &binary,
            comment: "loader",
        }],
        "a test program",
    )
    .unwrap();

    let info = load_prog(&mut hw, &data).unwrap();

    assert_eq!(info.name, "DEMO");
    assert_eq!(info.comment, "a test program");
    assert!(info.basic_area);
    for (offset, &byte) in basic.iter().enumerate() {
        assert_eq!(hw.load8(BASIC_START_ADDRESS + offset as u16), byte);
    }
    for (offset, &byte) in binary.iter().enumerate() {
        assert_eq!(hw.load8(0x3000 + offset as u16), byte);
    }
    let binary_region = info
        .regions
        .iter()
        .find(|region| region.start == 0x3000)
        .unwrap();
    assert_eq!(binary_region.end, 0x3002);
    assert_eq!(binary_region.comment, "loader");
}

#[test]
fn test_v2_unknown_sections_are_skipped() {
    let mut hw = make_hardware();
    let mut data = Vec::new();
    data.extend_from_slice(b"PROG");
    push_u32(&mut data, 2);
    // Unknown section id.
    push_u32(&mut data, 0x58585858);
    push_u32(&mut data, 4);
    data.extend_from_slice(&[1, 2, 3, 4]);
    // PNAM after it still parses.
    push_u32(&mut data, 0x4D414E50);
    push_u32(&mut data, 8);
    push_u32(&mut data, 4);
    data.extend_from_slice(b"ABCD");

    let info = load_prog(&mut hw, &data).unwrap();
    assert_eq!(info.name, "ABCD");
}

#[test]
fn test_v2_duplicate_pnam_keeps_first() {
    let mut hw = make_hardware();
    let mut data = Vec::new();
    data.extend_from_slice(b"PROG");
    push_u32(&mut data, 2);
    for name in [b"ONE!", b"TWO!"] {
        push_u32(&mut data, 0x4D414E50);
        push_u32(&mut data, 8);
        push_u32(&mut data, 4);
        data.extend_from_slice(name);
    }

    let info = load_prog(&mut hw, &data).unwrap();
    assert_eq!(info.name, "ONE!");
}

#[test]
fn test_v2_truncated_section_fails() {
    let mut hw = make_hardware();
    let mut data = Vec::new();
    data.extend_from_slice(b"PROG");
    push_u32(&mut data, 2);
    push_u32(&mut data, 0x4E494250); // PBIN
    push_u32(&mut data, 100); // length past EOF

    assert!(matches!(
        load_prog(&mut hw, &data),
        Err(ProgramLoadError::UnexpectedEof)
    ));
}

#[test]
fn test_bad_magic_and_version() {
    let mut hw = make_hardware();
    assert!(matches!(
        load_prog(&mut hw, b"GORP\x01\x00\x00\x00"),
        Err(ProgramLoadError::InvalidMagic)
    ));
    assert!(matches!(
        load_prog(&mut hw, b"PROG\x03\x00\x00\x00"),
        Err(ProgramLoadError::UnsupportedVersion(3))
    ));
}

#[test]
fn test_writer_rejects_oversized_fields() {
    let name = "N".repeat(300);
    assert!(matches!(
        write_prog_v2(&name, None, &[], ""),
        Err(ProgramLoadError::FieldTooLarge("program name"))
    ));

    let comment = "C".repeat(2000);
    assert!(matches!(
        write_prog_v2("OK", None, &[], &comment),
        Err(ProgramLoadError::FieldTooLarge("comment"))
    ));
}

// =============================================================================
// BASIC text
// =============================================================================

#[test]
fn test_basic_text_load_uppercases_and_escapes() {
    let mut hw = make_hardware();
    let source = "10 print a\n20 data \\1B\\7F\n";

    let info = load_basic_text(&mut hw, source).unwrap();
    assert!(info.basic_area);

    // Line 10: number word, "PRINT A", terminator.
    assert_eq!(hw.load16(BASIC_START_ADDRESS), 10);
    let mut addr = BASIC_START_ADDRESS + 2;
    for &expected in b"PRINT A" {
        assert_eq!(hw.load8(addr), expected);
        addr += 1;
    }
    assert_eq!(hw.load8(addr), 0x00);
    addr += 1;

    // Line 20: number word, "DATA ", raw bytes 1B 7F, terminator.
    assert_eq!(hw.load16(addr), 20);
    addr += 2;
    for &expected in b"DATA " {
        assert_eq!(hw.load8(addr), expected);
        addr += 1;
    }
    assert_eq!(hw.load8(addr), 0x1B);
    assert_eq!(hw.load8(addr + 1), 0x7F);
    assert_eq!(hw.load8(addr + 2), 0x00);

    // Terminators follow the last line.
    assert_eq!(hw.load8(addr + 3), 0xDF);
    assert_eq!(hw.load8(addr + 4), 0xDF);
    assert_eq!(hw.load8(addr + 5), 0xDF);
}

#[test]
fn test_basic_text_rejects_missing_line_number() {
    let mut hw = make_hardware();
    assert!(matches!(
        load_basic_text(&mut hw, "print a\n"),
        Err(ProgramLoadError::MissingLineNumber(_))
    ));
}

#[test]
fn test_basic_text_rejects_out_of_range_line_number() {
    let mut hw = make_hardware();
    assert!(matches!(
        load_basic_text(&mut hw, "40000 print\n"),
        Err(ProgramLoadError::InvalidLineNumber { number: 40000, .. })
    ));
}

#[test]
fn test_basic_text_rejects_truncated_escape() {
    let mut hw = make_hardware();
    assert!(matches!(
        load_basic_text(&mut hw, "10 data \\1\n"),
        Err(ProgramLoadError::InvalidEscape(_))
    ));
}

#[test]
fn test_basic_text_rejects_long_line() {
    let mut hw = make_hardware();
    let source = format!("10 {}\n", "A".repeat(80));
    assert!(matches!(
        load_basic_text(&mut hw, &source),
        Err(ProgramLoadError::LineTooLong(_))
    ));
}

#[test]
fn test_basic_text_save_round_trip() {
    let mut hw = make_hardware();
    let source = "10 PRINT A\n20 DATA \\1B\\7F\n";
    load_basic_text(&mut hw, source).unwrap();

    let dumped = save_basic_text(&mut hw);
    assert_eq!(dumped, source);
}
