use super::{Mb8861, VECTOR_SWI};
use crate::core::Bus;

impl Mb8861 {
    /// Push one byte: store at SP, then post-decrement.
    pub(crate) fn push8<B: Bus + ?Sized>(&mut self, bus: &mut B, value: u8) {
        bus.store8(self.registers.sp, value);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
    }

    /// Pull one byte: pre-increment, then load from SP.
    pub(crate) fn pull8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        self.registers.sp = self.registers.sp.wrapping_add(1);
        bus.load8(self.registers.sp)
    }

    /// Push the full register context for an interrupt or SWI.
    ///
    /// Frame from the highest address downward: PCL, PCH, XL, XH, A, B,
    /// CCR. SP ends 7 below where it started.
    pub(crate) fn push_all_registers<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let sp = self.registers.sp;
        let ccr = self.flags.pack();
        bus.store16(sp.wrapping_sub(1), self.registers.pc);
        bus.store16(sp.wrapping_sub(3), self.registers.x);
        bus.store8(sp.wrapping_sub(4), self.registers.a);
        bus.store8(sp.wrapping_sub(5), self.registers.b);
        bus.store8(sp.wrapping_sub(6), ccr);
        self.registers.sp = sp.wrapping_sub(7);
    }

    /// Pop the full register context (RTI).
    pub(crate) fn pop_all_registers<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let sp = self.registers.sp.wrapping_add(7);
        let ccr = bus.load8(sp.wrapping_sub(6));
        self.flags.unpack(ccr);
        self.registers.b = bus.load8(sp.wrapping_sub(5));
        self.registers.a = bus.load8(sp.wrapping_sub(4));
        self.registers.x = bus.load16(sp.wrapping_sub(3));
        self.registers.pc = bus.load16(sp.wrapping_sub(1));
        self.registers.sp = sp;
    }

    pub(crate) fn op_rti<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.pop_all_registers(bus);
    }

    pub(crate) fn op_rts<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        let sp = self.registers.sp.wrapping_add(2);
        self.registers.pc = bus.load16(sp.wrapping_sub(1));
        self.registers.sp = sp;
    }

    /// SWI pushes PC+1 (one byte past the opcode), masks IRQ and vectors
    /// through 0xFFFA.
    pub(crate) fn op_swi<B: Bus + ?Sized>(&mut self, bus: &mut B) {
        self.registers.pc = self.registers.pc.wrapping_add(1);
        self.push_all_registers(bus);
        self.flags.i = true;
        self.registers.pc = bus.load16(VECTOR_SWI);
    }

    /// WAI parks the CPU until the next serviced interrupt. The register
    /// push happens at service time, not here.
    pub(crate) fn op_wai(&mut self) {
        self.status.fetch_wai = true;
    }
}
