/// Interrupt lines sampled by the CPU at fetch boundaries.
///
/// `irq` is level-sensitive (the VIA holds it high while any enabled
/// interrupt flag is set); `nmi` is a pending-edge request.
#[derive(Default, Clone, Copy, Debug)]
pub struct InterruptState {
    pub nmi: bool,
    pub irq: bool,
}

/// System bus interface for an 8-bit machine with a 16-bit address space.
///
/// The bus owns the master cycle counter so that the CPU (which advances it
/// per instruction) and memory-mapped peripherals (which catch up to it on
/// every access) share a single clock without back-references.
pub trait Bus {
    fn load8(&mut self, addr: u16) -> u8;
    fn store8(&mut self, addr: u16, value: u8);

    /// 16-bit load, big-endian, as two independent 8-bit accesses.
    ///
    /// Word accesses may straddle device boundaries (e.g. the last VIA
    /// register and the hole behind it), so this must not be collapsed
    /// into a single wide read.
    fn load16(&mut self, addr: u16) -> u16 {
        let hi = self.load8(addr);
        let lo = self.load8(addr.wrapping_add(1));
        u16::from_be_bytes([hi, lo])
    }

    /// 16-bit store, big-endian, high byte first.
    fn store16(&mut self, addr: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.store8(addr, hi);
        self.store8(addr.wrapping_add(1), lo);
    }

    /// Current master clock in CPU cycles.
    fn clock(&self) -> u64;

    /// Set the master clock. Monotonically non-decreasing except on reset.
    fn set_clock(&mut self, clock: u64);

    fn add_clock(&mut self, cycles: u64) {
        self.set_clock(self.clock() + cycles);
    }

    /// Query interrupt lines. Called once per fetch boundary, never
    /// mid-instruction.
    fn check_interrupts(&self) -> InterruptState {
        InterruptState::default()
    }
}
