//! JR-100 system scheduler.
//!
//! Owns the CPU and board, routes cycle budgets, and dispatches scheduled
//! events from a min-heap keyed by clock count. Lifecycle control events
//! (pause/resume/reset/power-off) are posted to the same queue and take
//! effect at the next tick; in-flight instructions are never interrupted.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use jr100_core::core::machine::{InputButton, Machine};
use jr100_core::core::Bus;
use jr100_core::cpu::{CpuError, Mb8861};
use jr100_core::device::keyboard::ROW_BITS;

use crate::jr100::Jr100Hardware;
use crate::program::{self, ProgramInfo, ProgramLoadError};

pub const DEFAULT_CPU_CLOCK_HZ: f64 = 894_000.0;
/// Display refresh rate driven by the event queue.
pub const REFRESH_RATE_HZ: f64 = 60.0;
/// Gamepad poll rate driven by the event queue.
pub const GAMEPAD_POLL_RATE_HZ: f64 = 120.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunningStatus {
    Stopped,
    Running,
    Paused,
}

/// Momentary gamepad line state, latched into the extended I/O port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GamepadState {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub switch: bool,
}

/// Host-side joystick backend. Polled at 120 Hz of emulated time; `None`
/// means "no change since last poll".
pub trait GamepadSource {
    fn poll(&mut self) -> Option<GamepadState>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EventKind {
    DisplayRefresh,
    GamepadPoll,
    Pause,
    Resume,
    Reset,
    PowerOff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ScheduledEvent {
    clock: u64,
    /// Tie-breaker preserving post order for same-clock events.
    seq: u64,
    kind: EventKind,
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.clock, self.seq).cmp(&(other.clock, other.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct Jr100Computer {
    pub cpu: Mb8861,
    pub hardware: Jr100Hardware,
    status: RunningStatus,
    events: BinaryHeap<Reverse<ScheduledEvent>>,
    next_seq: u64,
    cpu_clock_frequency: f64,
    refresh_interval: u64,
    gamepad_poll_interval: u64,
    gamepad: Option<Box<dyn GamepadSource>>,
    program_info: Option<ProgramInfo>,
    last_error: Option<CpuError>,
}

impl Jr100Computer {
    pub fn new(extended_ram: bool) -> Self {
        let frequency = DEFAULT_CPU_CLOCK_HZ;
        let mut computer = Self {
            cpu: Mb8861::new(),
            hardware: Jr100Hardware::new(extended_ram, frequency),
            status: RunningStatus::Stopped,
            events: BinaryHeap::new(),
            next_seq: 0,
            cpu_clock_frequency: frequency,
            refresh_interval: (frequency / REFRESH_RATE_HZ) as u64,
            gamepad_poll_interval: (frequency / GAMEPAD_POLL_RATE_HZ) as u64,
            gamepad: None,
            program_info: None,
            last_error: None,
        };
        // Latch the reset vector so the PC is valid before the first tick.
        computer.cpu.reset();
        let _ = computer.cpu.execute(&mut computer.hardware, 1);
        computer
    }

    /// Build a machine with a BASIC ROM image already loaded.
    pub fn with_rom(rom: &[u8], extended_ram: bool) -> Result<Self, ProgramLoadError> {
        let mut computer = Self::new(extended_ram);
        computer.hardware.load_rom(rom)?;
        // The ROM carries the reset vector; fetch it again.
        computer.cpu.reset();
        let _ = computer.cpu.execute(&mut computer.hardware, 1);
        Ok(computer)
    }

    pub fn clock_count(&self) -> u64 {
        self.hardware.clock()
    }

    pub fn cpu_clock_frequency(&self) -> f64 {
        self.cpu_clock_frequency
    }

    pub fn running_status(&self) -> RunningStatus {
        self.status
    }

    pub fn program_info(&self) -> Option<&ProgramInfo> {
        self.program_info.as_ref()
    }

    pub fn last_error(&self) -> Option<CpuError> {
        self.last_error
    }

    pub fn set_gamepad_source(&mut self, source: Option<Box<dyn GamepadSource>>) {
        self.gamepad = source;
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Power up from STOPPED: start the clock epoch and the periodic tasks.
    pub fn power_on(&mut self) {
        if self.status != RunningStatus::Stopped {
            return;
        }
        self.status = RunningStatus::Running;
        self.hardware.set_base_time(now_ns());
        let clock = self.clock_count();
        self.post(clock + self.refresh_interval, EventKind::DisplayRefresh);
        self.post(clock + self.gamepad_poll_interval, EventKind::GamepadPoll);
    }

    pub fn pause(&mut self) {
        self.post(self.clock_count(), EventKind::Pause);
    }

    pub fn resume(&mut self) {
        self.post(self.clock_count(), EventKind::Resume);
    }

    pub fn request_reset(&mut self) {
        self.post(self.clock_count(), EventKind::Reset);
    }

    pub fn power_off(&mut self) {
        self.post(self.clock_count(), EventKind::PowerOff);
    }

    fn post(&mut self, clock: u64, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Reverse(ScheduledEvent { clock, seq, kind }));
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// Advance the machine by `cycles` CPU cycles.
    ///
    /// Ready events run before the CPU, devices catch up after it, and
    /// events that became ready during execution run last.
    pub fn tick(&mut self, cycles: u64) -> Result<(), CpuError> {
        self.dispatch_ready_events();
        if self.status == RunningStatus::Running {
            let result = self.cpu.execute(&mut self.hardware, cycles);
            self.hardware.execute_devices();
            self.cpu.set_irq_line(self.hardware.irq_line());
            result?;
        }
        self.dispatch_ready_events();
        Ok(())
    }

    fn dispatch_ready_events(&mut self) {
        while let Some(Reverse(event)) = self.events.peek().copied() {
            if event.clock > self.clock_count() {
                break;
            }
            self.events.pop();
            self.handle_event(event.kind);
        }
    }

    fn handle_event(&mut self, kind: EventKind) {
        match kind {
            EventKind::DisplayRefresh => {
                if self.status == RunningStatus::Running {
                    self.hardware.display.refresh();
                }
                if self.status != RunningStatus::Stopped {
                    self.post(
                        self.clock_count() + self.refresh_interval,
                        EventKind::DisplayRefresh,
                    );
                }
            }
            EventKind::GamepadPoll => {
                if self.status == RunningStatus::Running {
                    if let Some(source) = self.gamepad.as_mut() {
                        if let Some(state) = source.poll() {
                            self.hardware.set_gamepad_state(
                                state.left,
                                state.right,
                                state.up,
                                state.down,
                                state.switch,
                            );
                        }
                    }
                }
                if self.status != RunningStatus::Stopped {
                    self.post(
                        self.clock_count() + self.gamepad_poll_interval,
                        EventKind::GamepadPoll,
                    );
                }
            }
            EventKind::Pause => {
                if self.status == RunningStatus::Running {
                    self.status = RunningStatus::Paused;
                }
            }
            EventKind::Resume => {
                if self.status == RunningStatus::Paused {
                    self.status = RunningStatus::Running;
                    self.hardware.set_base_time(now_ns());
                }
            }
            EventKind::Reset => {
                self.hardware.reset_devices();
                self.cpu.set_irq_line(false);
                self.cpu.reset();
            }
            EventKind::PowerOff => {
                self.status = RunningStatus::Stopped;
            }
        }
    }

    // -----------------------------------------------------------------
    // Program loading
    // -----------------------------------------------------------------

    /// Load a user program by extension: PROG containers (`.prg`/`.prog`)
    /// or BASIC text (`.bas`/`.txt`).
    pub fn load_user_program(&mut self, path: &Path) -> Result<ProgramInfo, ProgramLoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let mut info = match extension.as_str() {
            "prg" | "prog" => {
                let data = std::fs::read(path)?;
                program::load_prog(&mut self.hardware, &data)?
            }
            "bas" | "txt" => {
                let source = std::fs::read_to_string(path)?;
                program::load_basic_text(&mut self.hardware, &source)?
            }
            other => return Err(ProgramLoadError::UnsupportedFormat(other.to_string())),
        };
        if info.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                info.name = stem.to_uppercase();
            }
        }
        self.cpu.reset();
        let _ = self.cpu.execute(&mut self.hardware, 1);
        self.program_info = Some(info.clone());
        Ok(info)
    }

    /// Load a PROG container from memory (used by front-ends with their
    /// own file handling).
    pub fn load_prog_bytes(&mut self, data: &[u8]) -> Result<ProgramInfo, ProgramLoadError> {
        let info = program::load_prog(&mut self.hardware, data)?;
        self.cpu.reset();
        let _ = self.cpu.execute(&mut self.hardware, 1);
        self.program_info = Some(info.clone());
        Ok(info)
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------
// Front-end interface
// ---------------------------------------------------------------------

/// Button IDs encode the matrix position: `row * 5 + bit`.
const JR100_INPUT_MAP: &[InputButton] = &[
    InputButton { id: 0, name: "CTRL" },
    InputButton { id: 1, name: "SHIFT" },
    InputButton { id: 2, name: "Z" },
    InputButton { id: 3, name: "X" },
    InputButton { id: 4, name: "C" },
    InputButton { id: 5, name: "A" },
    InputButton { id: 6, name: "S" },
    InputButton { id: 7, name: "D" },
    InputButton { id: 8, name: "F" },
    InputButton { id: 9, name: "G" },
    InputButton { id: 10, name: "Q" },
    InputButton { id: 11, name: "W" },
    InputButton { id: 12, name: "E" },
    InputButton { id: 13, name: "R" },
    InputButton { id: 14, name: "T" },
    InputButton { id: 15, name: "1" },
    InputButton { id: 16, name: "2" },
    InputButton { id: 17, name: "3" },
    InputButton { id: 18, name: "4" },
    InputButton { id: 19, name: "5" },
    InputButton { id: 20, name: "6" },
    InputButton { id: 21, name: "7" },
    InputButton { id: 22, name: "8" },
    InputButton { id: 23, name: "9" },
    InputButton { id: 24, name: "0" },
    InputButton { id: 25, name: "Y" },
    InputButton { id: 26, name: "U" },
    InputButton { id: 27, name: "I" },
    InputButton { id: 28, name: "O" },
    InputButton { id: 29, name: "P" },
    InputButton { id: 30, name: "H" },
    InputButton { id: 31, name: "J" },
    InputButton { id: 32, name: "K" },
    InputButton { id: 33, name: "L" },
    InputButton { id: 34, name: ";" },
    InputButton { id: 35, name: "V" },
    InputButton { id: 36, name: "B" },
    InputButton { id: 37, name: "N" },
    InputButton { id: 38, name: "M" },
    InputButton { id: 39, name: "," },
    InputButton { id: 40, name: "." },
    InputButton { id: 41, name: "SPACE" },
    InputButton { id: 42, name: ":" },
    InputButton { id: 43, name: "RETURN" },
    InputButton { id: 44, name: "-" },
];

impl Machine for Jr100Computer {
    fn display_size(&self) -> (u32, u32) {
        (
            self.hardware.display.width_pixels() as u32,
            self.hardware.display.height_pixels() as u32,
        )
    }

    fn run_frame(&mut self) {
        let cycles = (self.cpu_clock_frequency / REFRESH_RATE_HZ) as u64;
        if let Err(error) = self.tick(cycles) {
            // An unknown opcode is not recoverable without a state restore.
            self.last_error = Some(error);
            self.status = RunningStatus::Stopped;
        }
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        self.hardware.display.render_rgb(buffer);
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        let row = (button / ROW_BITS) as usize;
        let bit = button % ROW_BITS;
        if pressed {
            self.hardware.keyboard.press(row, bit);
        } else {
            self.hardware.keyboard.release(row, bit);
        }
    }

    fn input_map(&self) -> &[InputButton] {
        JR100_INPUT_MAP
    }

    fn reset(&mut self) {
        self.request_reset();
    }
}
