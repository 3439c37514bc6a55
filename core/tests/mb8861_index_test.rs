/// Tests for MB8861 index register and stack pointer instructions,
/// including the JR-100 specific ADX extension.
use jr100_core::cpu::Mb8861;

mod common;
use common::TestBus;

fn make_cpu() -> Mb8861 {
    let mut cpu = Mb8861::new();
    cpu.registers.sp = 0x01FF;
    cpu
}

// =============================================================================
// LDX / STX / LDS / STS
// =============================================================================

#[test]
fn test_ldx_immediate_sets_sign_flag() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    bus.load(0x0000, &[0xCE, 0x80, 0x00]);

    cpu.execute(&mut bus, 3).unwrap();

    assert_eq!(cpu.registers.x, 0x8000);
    assert!(cpu.flags.n);
    assert!(!cpu.flags.z);
}

#[test]
fn test_stx_ext_writes_big_endian_word() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x7FFF;
    bus.load(0x0000, &[0xFF, 0x20, 0x00]);

    cpu.execute(&mut bus, 6).unwrap();

    assert_eq!(bus.memory[0x2000], 0x7F);
    assert_eq!(bus.memory[0x2001], 0xFF);
    assert!(!cpu.flags.n);
    assert!(!cpu.flags.z);
}

#[test]
fn test_lds_immediate() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    bus.load(0x0000, &[0x8E, 0x01, 0xFF]);

    cpu.execute(&mut bus, 3).unwrap();

    assert_eq!(cpu.registers.sp, 0x01FF);
    assert!(!cpu.flags.n);
}

#[test]
fn test_sts_ext_derives_flags_from_index_register() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0xFFFF;
    cpu.registers.sp = 0x2000;
    bus.load(0x0000, &[0xBF, 0x20, 0x10]);

    cpu.execute(&mut bus, 6).unwrap();

    let stored = u16::from_be_bytes([bus.memory[0x2010], bus.memory[0x2011]]);
    assert_eq!(stored, 0x2000);
    // N/Z come from X, not SP.
    assert!(cpu.flags.n);
    assert!(!cpu.flags.z);
}

// =============================================================================
// CPX: no carry update
// =============================================================================

#[test]
fn test_cpx_direct_sets_negative_flag() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x1200;
    bus.load(0x0010, &[0x12, 0x10]);
    bus.load(0x0000, &[0x9C, 0x10]);

    cpu.execute(&mut bus, 4).unwrap();

    assert!(cpu.flags.n);
    assert!(!cpu.flags.z);
}

#[test]
fn test_cpx_equal_sets_zero_and_keeps_carry() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x1234;
    cpu.flags.c = true;
    bus.load(0x0000, &[0x8C, 0x12, 0x34]);

    cpu.execute(&mut bus, 3).unwrap();

    assert!(cpu.flags.z);
    assert!(cpu.flags.c);
}

// =============================================================================
// INX / DEX / INS / DES / TSX / TXS
// =============================================================================

#[test]
fn test_inx_dex_touch_zero_only() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0xFFFF;
    cpu.flags.n = true;
    bus.load(0x0000, &[0x08]); // INX

    cpu.execute(&mut bus, 4).unwrap();

    assert_eq!(cpu.registers.x, 0x0000);
    assert!(cpu.flags.z);
    assert!(cpu.flags.n); // untouched

    bus.load(0x0001, &[0x09]); // DEX
    cpu.execute(&mut bus, 4).unwrap();

    assert_eq!(cpu.registers.x, 0xFFFF);
    assert!(!cpu.flags.z);
}

#[test]
fn test_txs_tsx_round_trip() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x1234;
    bus.load(0x0000, &[0x35, 0x30]); // TXS, TSX

    cpu.execute(&mut bus, 8).unwrap();

    assert_eq!(cpu.registers.sp, 0x1233);
    assert_eq!(cpu.registers.x, 0x1234);
}

// =============================================================================
// ADX (0xEC imm / 0xFC ext): MB8861 extension
// =============================================================================

#[test]
fn test_adx_immediate_updates_ix_and_flags() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x7FFF;
    bus.load(0x0000, &[0xEC, 0x01]);

    cpu.execute(&mut bus, 3).unwrap();

    assert_eq!(cpu.registers.x, 0x8000);
    assert!(cpu.flags.n);
    assert!(!cpu.flags.z);
    assert!(cpu.flags.v);
    assert!(!cpu.flags.c);
}

#[test]
fn test_adx_immediate_sets_carry_and_zero() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0xFFFF;
    bus.load(0x0000, &[0xEC, 0x01]);

    cpu.execute(&mut bus, 3).unwrap();

    assert_eq!(cpu.registers.x, 0x0000);
    assert!(cpu.flags.c);
    assert!(cpu.flags.z);
    assert!(!cpu.flags.n);
}

#[test]
fn test_adx_ext_adds_16bit_value() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x1000;
    bus.load(0x0000, &[0xFC, 0x20, 0x00]);
    bus.load(0x2000, &[0x10, 0x10]);

    cpu.execute(&mut bus, 7).unwrap();

    assert_eq!(cpu.registers.x, 0x2010);
    assert!(!cpu.flags.n);
    assert!(!cpu.flags.z);
}
