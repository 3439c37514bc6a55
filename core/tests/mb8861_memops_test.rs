/// Tests for the MB8861 bit-manipulation extensions: NIM (0x71),
/// OIM (0x72), XIM (0x75), TMM (0x7B). All take an immediate pattern
/// followed by an indexed offset.
use jr100_core::cpu::Mb8861;

mod common;
use common::TestBus;

fn make_cpu() -> Mb8861 {
    let mut cpu = Mb8861::new();
    cpu.registers.sp = 0x01FF;
    cpu
}

#[test]
fn test_nim_clears_bits() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0300;
    bus.load(0x0305, &[0xF0]);
    bus.load(0x0000, &[0x71, 0x0F, 0x05]);

    cpu.execute(&mut bus, 8).unwrap();

    assert_eq!(bus.memory[0x0305], 0x00);
    assert!(cpu.flags.z);
    assert!(!cpu.flags.n);
    assert!(!cpu.flags.v);
}

#[test]
fn test_nim_nonzero_result_sets_n() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0300;
    bus.load(0x0305, &[0x0F]);
    bus.load(0x0000, &[0x71, 0x03, 0x05]);

    cpu.execute(&mut bus, 8).unwrap();

    assert_eq!(bus.memory[0x0305], 0x03);
    // N mirrors !Z for these ops, regardless of bit 7.
    assert!(cpu.flags.n);
    assert!(!cpu.flags.z);
}

#[test]
fn test_oim_sets_bits() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0400;
    bus.load(0x0403, &[0x0F]);
    bus.load(0x0000, &[0x72, 0xF0, 0x03]);

    cpu.execute(&mut bus, 8).unwrap();

    assert_eq!(bus.memory[0x0403], 0xFF);
    assert!(!cpu.flags.z);
    assert!(cpu.flags.n);
    assert!(!cpu.flags.v);
}

#[test]
fn test_xim_toggles_bits_and_keeps_overflow() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0500;
    cpu.flags.v = true;
    bus.load(0x0501, &[0xAA]);
    bus.load(0x0000, &[0x75, 0xFF, 0x01]);

    cpu.execute(&mut bus, 8).unwrap();

    assert_eq!(bus.memory[0x0501], 0x55);
    assert!(!cpu.flags.z);
    assert!(cpu.flags.n);
    assert!(cpu.flags.v); // XIM leaves V alone
}

#[test]
fn test_tmm_zero_operand() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0600;
    bus.load(0x0602, &[0x55]);
    bus.load(0x0000, &[0x7B, 0x00, 0x02]);

    cpu.execute(&mut bus, 7).unwrap();

    assert!(cpu.flags.z);
    assert!(!cpu.flags.n);
    assert!(!cpu.flags.v);
    // TMM never writes back.
    assert_eq!(bus.memory[0x0602], 0x55);
}

#[test]
fn test_tmm_memory_all_ones() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0600;
    bus.load(0x0603, &[0xFF]);
    bus.load(0x0000, &[0x7B, 0x01, 0x03]);

    cpu.execute(&mut bus, 7).unwrap();

    assert!(!cpu.flags.z);
    assert!(!cpu.flags.n);
    assert!(cpu.flags.v);
}

#[test]
fn test_tmm_default_case() {
    let mut cpu = make_cpu();
    let mut bus = TestBus::new();
    cpu.registers.x = 0x0600;
    bus.load(0x0604, &[0x01]);
    bus.load(0x0000, &[0x7B, 0x01, 0x04]);

    cpu.execute(&mut bus, 7).unwrap();

    assert!(cpu.flags.n);
    assert!(!cpu.flags.z);
    assert!(!cpu.flags.v);
}
