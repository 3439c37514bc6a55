use super::Mb8861;
use crate::core::Bus;
use crate::cpu::mb8861::alu::to_signed16;

impl Mb8861 {
    /// Accumulator load: N/Z from the value, V cleared.
    pub(crate) fn lda8(&mut self, value: u8) -> u8 {
        self.set_flags_logical(value);
        value
    }

    /// Accumulator store: flags as for a load, then the write.
    pub(crate) fn sta8<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16, value: u8) {
        self.set_flags_logical(value);
        bus.store8(addr, value);
    }

    pub(crate) fn op_tab(&mut self) {
        self.registers.b = self.registers.a;
        self.set_flags_logical(self.registers.b);
    }

    pub(crate) fn op_tba(&mut self) {
        self.registers.a = self.registers.b;
        self.set_flags_logical(self.registers.a);
    }

    /// INX/DEX affect Z only.
    pub(crate) fn op_inx(&mut self) {
        self.registers.x = self.registers.x.wrapping_add(1);
        self.flags.z = self.registers.x == 0;
    }

    pub(crate) fn op_dex(&mut self) {
        self.registers.x = self.registers.x.wrapping_sub(1);
        self.flags.z = self.registers.x == 0;
    }

    pub(crate) fn op_ldx(&mut self, value: u16) {
        self.registers.x = value;
        self.set_flags_word(value);
    }

    pub(crate) fn op_lds(&mut self, value: u16) {
        self.registers.sp = value;
        self.set_flags_word(value);
    }

    pub(crate) fn op_stx<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) {
        bus.store16(addr, self.registers.x);
        self.set_flags_word(self.registers.x);
    }

    /// STS stores SP; N and Z track the index register, not the stored
    /// word.
    pub(crate) fn op_sts<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) {
        bus.store16(addr, self.registers.sp);
        self.flags.n = to_signed16(self.registers.x) < 0;
        self.flags.z = self.registers.x == 0;
        self.flags.v = false;
    }
}
