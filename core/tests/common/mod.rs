#![allow(dead_code)]

use jr100_core::core::{Bus, InterruptState};

/// Minimal bus for testing: flat 64KB read/write memory, no peripherals.
pub struct TestBus {
    pub memory: Box<[u8; 0x10000]>,
    pub clock: u64,
    pub irq: bool,
    pub nmi: bool,
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
            clock: 0,
            irq: false,
            nmi: false,
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    fn load8(&mut self, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn store8(&mut self, addr: u16, value: u8) {
        self.memory[addr as usize] = value;
    }

    fn clock(&self) -> u64 {
        self.clock
    }

    fn set_clock(&mut self, clock: u64) {
        self.clock = clock;
    }

    fn check_interrupts(&self) -> InterruptState {
        InterruptState {
            nmi: self.nmi,
            irq: self.irq,
        }
    }
}
