/// Tests for the system scheduler: lifecycle, periodic events, CPU/VIA
/// integration, and snapshot round trips.
use jr100_core::core::Bus;

use jr100_machines::{Jr100Computer, RunningStatus};

const VIA_IORB: u16 = 0xC800;
const VIA_IORA: u16 = 0xC801;
const VIA_DDRB: u16 = 0xC802;
const VIA_T1CL: u16 = 0xC804;
const VIA_T1CH: u16 = 0xC805;
const VIA_ACR: u16 = 0xC80B;
const VIA_IER: u16 = 0xC80E;

/// A machine with a looping NOP sled in RAM so the CPU has something to
/// chew on for any cycle budget.
fn make_computer() -> Jr100Computer {
    let mut computer = Jr100Computer::new(false);
    for addr in 0x0000..0x3FFDu16 {
        computer.hardware.store8(addr, 0x01);
    }
    // JMP 0x0000 at the end of RAM keeps the PC inside the sled.
    computer.hardware.store8(0x3FFD, 0x7E);
    computer.hardware.store8(0x3FFE, 0x00);
    computer.hardware.store8(0x3FFF, 0x00);
    computer.cpu.registers.pc = 0x0000;
    computer
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_power_on_and_tick_advances_clock() {
    let mut computer = make_computer();
    computer.power_on();

    assert_eq!(computer.running_status(), RunningStatus::Running);
    assert_eq!(computer.clock_count(), 0);

    computer.tick(32).unwrap();
    assert_eq!(computer.clock_count(), 32);
}

#[test]
fn test_tick_does_nothing_while_stopped() {
    let mut computer = make_computer();
    computer.tick(32).unwrap();
    assert_eq!(computer.clock_count(), 0);
}

#[test]
fn test_pause_and_resume_control_execution() {
    let mut computer = make_computer();
    computer.power_on();
    computer.tick(8).unwrap();

    computer.pause();
    computer.tick(16).unwrap();
    assert_eq!(computer.running_status(), RunningStatus::Paused);
    assert_eq!(computer.clock_count(), 8);

    computer.resume();
    computer.tick(4).unwrap();
    assert_eq!(computer.running_status(), RunningStatus::Running);
    assert_eq!(computer.clock_count(), 12);
}

#[test]
fn test_power_off_stops_execution() {
    let mut computer = make_computer();
    computer.power_on();
    computer.power_off();
    computer.tick(10).unwrap();

    assert_eq!(computer.running_status(), RunningStatus::Stopped);
    assert_eq!(computer.clock_count(), 0);
}

#[test]
fn test_reset_clears_clock() {
    let mut computer = make_computer();
    computer.power_on();
    computer.tick(40).unwrap();
    assert_eq!(computer.clock_count(), 40);

    computer.request_reset();
    computer.tick(2).unwrap();

    assert_eq!(computer.clock_count(), 0);
    // No ROM loaded: the reset vector reads zero.
    assert_eq!(computer.cpu.registers.pc, 0x0000);
}

// =============================================================================
// Periodic tasks
// =============================================================================

#[test]
fn test_periodic_tasks_follow_running_status() {
    let mut computer = make_computer();
    computer.power_on();

    let interval = (computer.cpu_clock_frequency() / 60.0) as u64;
    computer.tick(interval + 10).unwrap();
    let running_frames = computer.hardware.display.frame_count();
    assert!(running_frames > 0);

    computer.pause();
    computer.tick(interval + 10).unwrap();
    assert_eq!(computer.hardware.display.frame_count(), running_frames);

    computer.resume();
    computer.tick(2 * interval).unwrap();
    assert!(computer.hardware.display.frame_count() > running_frames);
}

// =============================================================================
// CPU / VIA integration
// =============================================================================

#[test]
fn test_timer1_irq_asserts_cpu_line() {
    let mut computer = make_computer();
    let hw = &mut computer.hardware;

    hw.store8(VIA_IER, 0x80 | 0x40);
    hw.store8(VIA_ACR, 0xC0);
    hw.store8(VIA_T1CL, 0x02);
    hw.store8(VIA_T1CH, 0x00);

    hw.add_clock(10);
    hw.execute_devices();

    assert!(hw.irq_line());
    computer.cpu.set_irq_line(computer.hardware.irq_line());
    assert!(computer.cpu.status.irq_requested);
}

#[test]
fn test_irq_vectors_after_device_catch_up() {
    let mut computer = make_computer();
    computer.power_on();

    let hw = &mut computer.hardware;
    hw.store8(VIA_IER, 0x80 | 0x40);
    hw.store8(VIA_ACR, 0xC0);
    hw.store8(VIA_T1CL, 0x10);
    hw.store8(VIA_T1CH, 0x00);

    // The timer fires during device catch-up at the end of this tick...
    computer.tick(40).unwrap();
    assert!(computer.cpu.status.irq_requested);

    // ...and the CPU services it at the next fetch boundary. The empty ROM
    // yields vector 0x0000, back into the sled.
    computer.tick(12).unwrap();
    assert!(computer.cpu.flags.i);
    assert_eq!(computer.cpu.registers.sp, 0x0000u16.wrapping_sub(7));
}

#[test]
fn test_keyboard_reaches_via_through_memory() {
    let mut computer = make_computer();
    let hw = &mut computer.hardware;

    hw.store8(VIA_DDRB, 0x00);
    computer.hardware.keyboard.press(1, 0);
    computer.hardware.store8(VIA_IORA, 0x01);
    let value = computer.hardware.load8(VIA_IORB);
    assert_eq!(value & 0x01, 0x01);

    computer.hardware.keyboard.release(1, 0);
    computer.hardware.store8(VIA_IORA, 0x01);
    let value = computer.hardware.load8(VIA_IORB);
    assert_eq!(value & 0x01, 0x00);
}

// =============================================================================
// Execution equivalence
// =============================================================================

#[test]
fn test_split_ticks_are_equivalent() {
    let mut computer_a = make_computer();
    computer_a.power_on();
    computer_a.tick(100).unwrap();

    let mut computer_b = make_computer();
    computer_b.power_on();
    computer_b.tick(60).unwrap();
    computer_b.tick(40).unwrap();

    assert_eq!(computer_a.clock_count(), computer_b.clock_count());
    assert_eq!(computer_a.cpu.registers, computer_b.cpu.registers);
    assert_eq!(
        computer_a.hardware.via.snapshot(),
        computer_b.hardware.via.snapshot()
    );
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn test_snapshot_restore_round_trip() {
    let mut computer = make_computer();
    computer.power_on();
    computer.hardware.store8(0x2000, 0x99);
    computer.hardware.store8(VIA_ACR, 0xC0);
    computer.hardware.store8(VIA_T1CL, 0x34);
    computer.hardware.store8(VIA_T1CH, 0x12);
    computer.tick(50).unwrap();
    computer.cpu.flags.c = true;

    let snapshot = computer.snapshot();

    // Trash the machine, then restore.
    computer.hardware.store8(0x2000, 0x00);
    computer.cpu.registers.pc = 0x1234;
    computer.cpu.flags.c = false;
    computer.tick(500).unwrap();

    computer.restore(&snapshot).unwrap();

    assert_eq!(computer.hardware.load8(0x2000), 0x99);
    assert_eq!(computer.clock_count(), 50);
    assert!(computer.cpu.flags.c);
    assert_eq!(computer.hardware.via.snapshot().latch1, 0x1234);
    assert_eq!(computer.snapshot(), snapshot);
}

#[test]
fn test_snapshot_json_round_trip() {
    let mut computer = make_computer();
    computer.power_on();
    computer.tick(25).unwrap();

    let snapshot = computer.snapshot();
    let json = snapshot.to_json().unwrap();
    let parsed = jr100_machines::Snapshot::from_json(&json).unwrap();

    assert_eq!(parsed, snapshot);
}

#[test]
fn test_restore_rejects_bad_memory_size() {
    let mut computer = make_computer();
    let mut snapshot = computer.snapshot();
    snapshot.memory.truncate(100);

    assert!(computer.restore(&snapshot).is_err());
}
