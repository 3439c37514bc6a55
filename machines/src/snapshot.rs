//! Whole-machine snapshots.
//!
//! Plain struct-of-values serialization with an embedded schema tag; the
//! memory image is a flat 64 KiB blob captured through side-effect-free
//! peeks. Capture and restore must happen between ticks.

use std::error::Error;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use jr100_core::core::Bus;
use jr100_core::device::via6522::ViaState;

use crate::computer::Jr100Computer;

pub const SNAPSHOT_SCHEMA: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuRegistersSnapshot {
    pub acc_a: u8,
    pub acc_b: u8,
    pub index: u16,
    pub stack_pointer: u16,
    pub program_counter: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuFlagsSnapshot {
    pub h: bool,
    pub i: bool,
    pub n: bool,
    pub z: bool,
    pub v: bool,
    pub c: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuStatusSnapshot {
    pub reset_requested: bool,
    pub nmi_requested: bool,
    pub irq_requested: bool,
    pub halt_requested: bool,
    pub halt_processed: bool,
    pub fetch_wai: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViaSnapshot {
    pub ifr: u8,
    pub ier: u8,
    pub pcr: u8,
    pub acr: u8,
    pub ira: u8,
    pub ora: u8,
    pub ddra: u8,
    pub irb: u8,
    pub orb: u8,
    pub ddrb: u8,
    pub sr: u8,
    pub port_a: u8,
    pub port_b: u8,
    pub ca1_in: u8,
    pub ca2_in: u8,
    pub ca2_out: u8,
    pub ca2_timer: i32,
    pub cb1_in: u8,
    pub cb1_out: u8,
    pub cb2_in: u8,
    pub cb2_out: u8,
    pub previous_pb6: u8,
    pub latch1: u16,
    pub latch2: u16,
    pub timer1: i32,
    pub timer2: i32,
    pub shift_tick: bool,
    pub shift_counter: u8,
    pub shift_started: bool,
    pub timer1_initialized: bool,
    pub timer1_enable: bool,
    pub timer2_initialized: bool,
    pub timer2_enable: bool,
    pub current_clock: u64,
}

impl From<ViaState> for ViaSnapshot {
    fn from(state: ViaState) -> Self {
        Self {
            ifr: state.ifr,
            ier: state.ier,
            pcr: state.pcr,
            acr: state.acr,
            ira: state.ira,
            ora: state.ora,
            ddra: state.ddra,
            irb: state.irb,
            orb: state.orb,
            ddrb: state.ddrb,
            sr: state.sr,
            port_a: state.port_a,
            port_b: state.port_b,
            ca1_in: state.ca1_in,
            ca2_in: state.ca2_in,
            ca2_out: state.ca2_out,
            ca2_timer: state.ca2_timer,
            cb1_in: state.cb1_in,
            cb1_out: state.cb1_out,
            cb2_in: state.cb2_in,
            cb2_out: state.cb2_out,
            previous_pb6: state.previous_pb6,
            latch1: state.latch1,
            latch2: state.latch2,
            timer1: state.timer1,
            timer2: state.timer2,
            shift_tick: state.shift_tick,
            shift_counter: state.shift_counter,
            shift_started: state.shift_started,
            timer1_initialized: state.timer1_initialized,
            timer1_enable: state.timer1_enable,
            timer2_initialized: state.timer2_initialized,
            timer2_enable: state.timer2_enable,
            current_clock: state.current_clock,
        }
    }
}

impl From<ViaSnapshot> for ViaState {
    fn from(snapshot: ViaSnapshot) -> Self {
        Self {
            ifr: snapshot.ifr,
            ier: snapshot.ier,
            pcr: snapshot.pcr,
            acr: snapshot.acr,
            ira: snapshot.ira,
            ora: snapshot.ora,
            ddra: snapshot.ddra,
            irb: snapshot.irb,
            orb: snapshot.orb,
            ddrb: snapshot.ddrb,
            sr: snapshot.sr,
            port_a: snapshot.port_a,
            port_b: snapshot.port_b,
            ca1_in: snapshot.ca1_in,
            ca2_in: snapshot.ca2_in,
            ca2_out: snapshot.ca2_out,
            ca2_timer: snapshot.ca2_timer,
            cb1_in: snapshot.cb1_in,
            cb1_out: snapshot.cb1_out,
            cb2_in: snapshot.cb2_in,
            cb2_out: snapshot.cb2_out,
            previous_pb6: snapshot.previous_pb6,
            latch1: snapshot.latch1,
            latch2: snapshot.latch2,
            timer1: snapshot.timer1,
            timer2: snapshot.timer2,
            shift_tick: snapshot.shift_tick,
            shift_counter: snapshot.shift_counter,
            shift_started: snapshot.shift_started,
            timer1_initialized: snapshot.timer1_initialized,
            timer1_enable: snapshot.timer1_enable,
            timer2_initialized: snapshot.timer2_initialized,
            timer2_enable: snapshot.timer2_enable,
            current_clock: snapshot.current_clock,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema: u32,
    pub memory: Vec<u8>,
    pub cpu_registers: CpuRegistersSnapshot,
    pub cpu_flags: CpuFlagsSnapshot,
    pub cpu_status: CpuStatusSnapshot,
    pub via_state: ViaSnapshot,
    pub clock_count: u64,
}

#[derive(Debug)]
pub enum SnapshotError {
    SchemaMismatch(u32),
    BadMemorySize(usize),
    Format(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaMismatch(schema) => write!(f, "unsupported snapshot schema {schema}"),
            Self::BadMemorySize(len) => {
                write!(f, "snapshot memory image is {len} bytes, expected 65536")
            }
            Self::Format(error) => write!(f, "snapshot format error: {error}"),
            Self::Io(error) => write!(f, "snapshot I/O error: {error}"),
        }
    }
}

impl Error for SnapshotError {}

impl From<serde_json::Error> for SnapshotError {
    fn from(error: serde_json::Error) -> Self {
        Self::Format(error)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

impl Snapshot {
    pub fn capture(computer: &Jr100Computer) -> Self {
        let mut memory = vec![0u8; 0x10000];
        for (addr, byte) in memory.iter_mut().enumerate() {
            *byte = computer.hardware.peek8(addr as u16);
        }
        let registers = computer.cpu.registers;
        let flags = computer.cpu.flags;
        let status = computer.cpu.status;
        Self {
            schema: SNAPSHOT_SCHEMA,
            memory,
            cpu_registers: CpuRegistersSnapshot {
                acc_a: registers.a,
                acc_b: registers.b,
                index: registers.x,
                stack_pointer: registers.sp,
                program_counter: registers.pc,
            },
            cpu_flags: CpuFlagsSnapshot {
                h: flags.h,
                i: flags.i,
                n: flags.n,
                z: flags.z,
                v: flags.v,
                c: flags.c,
            },
            cpu_status: CpuStatusSnapshot {
                reset_requested: status.reset_requested,
                nmi_requested: status.nmi_requested,
                irq_requested: status.irq_requested,
                halt_requested: status.halt_requested,
                halt_processed: status.halt_processed,
                fetch_wai: status.fetch_wai,
            },
            via_state: computer.hardware.via.snapshot().into(),
            clock_count: computer.clock_count(),
        }
    }

    /// Validate without touching any machine state.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if self.schema != SNAPSHOT_SCHEMA {
            return Err(SnapshotError::SchemaMismatch(self.schema));
        }
        if self.memory.len() != 0x10000 {
            return Err(SnapshotError::BadMemorySize(self.memory.len()));
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SnapshotError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl Jr100Computer {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Restore a previously captured snapshot. Validation happens before
    /// any state is touched, so a bad snapshot leaves the machine as-is.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        snapshot.validate()?;

        for (addr, &byte) in snapshot.memory.iter().enumerate() {
            self.hardware.poke8(addr as u16, byte);
        }

        let registers = &mut self.cpu.registers;
        registers.a = snapshot.cpu_registers.acc_a;
        registers.b = snapshot.cpu_registers.acc_b;
        registers.x = snapshot.cpu_registers.index;
        registers.sp = snapshot.cpu_registers.stack_pointer;
        registers.pc = snapshot.cpu_registers.program_counter;

        let flags = &mut self.cpu.flags;
        flags.h = snapshot.cpu_flags.h;
        flags.i = snapshot.cpu_flags.i;
        flags.n = snapshot.cpu_flags.n;
        flags.z = snapshot.cpu_flags.z;
        flags.v = snapshot.cpu_flags.v;
        flags.c = snapshot.cpu_flags.c;

        let status = &mut self.cpu.status;
        status.reset_requested = snapshot.cpu_status.reset_requested;
        status.nmi_requested = snapshot.cpu_status.nmi_requested;
        status.irq_requested = snapshot.cpu_status.irq_requested;
        status.halt_requested = snapshot.cpu_status.halt_requested;
        status.halt_processed = snapshot.cpu_status.halt_processed;
        status.fetch_wai = snapshot.cpu_status.fetch_wai;

        self.hardware.via.restore(&snapshot.via_state.into());
        self.hardware.sync_irq_line();
        self.hardware.set_clock(snapshot.clock_count);
        Ok(())
    }
}
