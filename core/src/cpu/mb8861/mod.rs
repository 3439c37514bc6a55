mod alu;
mod branch;
mod load_store;
mod stack;

use crate::core::Bus;
use crate::cpu::CpuError;

pub const VECTOR_IRQ: u16 = 0xFFF8;
pub const VECTOR_SWI: u16 = 0xFFFA;
pub const VECTOR_NMI: u16 = 0xFFFC;
pub const VECTOR_RESTART: u16 = 0xFFFE;

/// Cycles consumed by a hardware interrupt entry (stack push + vector fetch).
pub const INTERRUPT_CYCLES: u64 = 12;

/// MB8861 register file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub b: u8,
    pub x: u16,
    pub sp: u16,
    pub pc: u16,
}

/// Condition code register, kept as discrete bits. Bits 6-7 of the packed
/// CCR always read as 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub h: bool,
    pub i: bool,
    pub n: bool,
    pub z: bool,
    pub v: bool,
    pub c: bool,
}

impl Flags {
    pub fn pack(&self) -> u8 {
        let mut ccr = 0xC0;
        if self.h {
            ccr |= 0x20;
        }
        if self.i {
            ccr |= 0x10;
        }
        if self.n {
            ccr |= 0x08;
        }
        if self.z {
            ccr |= 0x04;
        }
        if self.v {
            ccr |= 0x02;
        }
        if self.c {
            ccr |= 0x01;
        }
        ccr
    }

    pub fn unpack(&mut self, ccr: u8) {
        self.h = ccr & 0x20 != 0;
        self.i = ccr & 0x10 != 0;
        self.n = ccr & 0x08 != 0;
        self.z = ccr & 0x04 != 0;
        self.v = ccr & 0x02 != 0;
        self.c = ccr & 0x01 != 0;
    }
}

/// Pending-event flags, observed at fetch boundaries only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub reset_requested: bool,
    pub nmi_requested: bool,
    /// Level-sensitive mirror of the VIA IRQ line. Also settable directly
    /// via [`Mb8861::irq`] by external collaborators.
    pub irq_requested: bool,
    pub halt_requested: bool,
    pub halt_processed: bool,
    /// Set by WAI, cleared by any serviced interrupt.
    pub fetch_wai: bool,
}

/// MB8861 CPU core (MC6800-compatible with the Fujitsu extensions).
///
/// Instruction-stepped: each instruction completes atomically and advances
/// the bus clock by its fixed cycle count from the dispatch table.
pub struct Mb8861 {
    pub registers: Registers,
    pub flags: Flags,
    pub status: Status,
}

impl Default for Mb8861 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mb8861 {
    pub fn new() -> Self {
        Self {
            registers: Registers::default(),
            flags: Flags::default(),
            status: Status::default(),
        }
    }

    /// Request a reset, observed at the next fetch boundary.
    pub fn reset(&mut self) {
        self.status.reset_requested = true;
    }

    /// Request an NMI, observed at the next fetch boundary.
    pub fn nmi(&mut self) {
        self.status.nmi_requested = true;
    }

    /// Assert the IRQ line, observed at the next fetch boundary when the
    /// I mask is clear.
    pub fn irq(&mut self) {
        self.status.irq_requested = true;
    }

    /// Mirror the level-sensitive IRQ line into the request flag.
    pub fn set_irq_line(&mut self, asserted: bool) {
        self.status.irq_requested = asserted;
    }

    pub fn halt(&mut self) {
        self.status.halt_requested = true;
    }

    pub fn release_halt(&mut self) {
        self.status.halt_requested = false;
    }

    /// Run whole instructions until `bus.clock() >= start + clocks`.
    /// Returns the cycle overshoot past the target.
    pub fn execute<B: Bus + ?Sized>(&mut self, bus: &mut B, clocks: u64) -> Result<u64, CpuError> {
        let target = bus.clock() + clocks;
        while bus.clock() < target {
            if self.status.reset_requested {
                self.status.reset_requested = false;
                self.status.fetch_wai = false;
                self.registers.pc = bus.load16(VECTOR_RESTART);
                bus.set_clock(0);
                return Ok(0);
            }

            if self.status.halt_requested {
                // Halted: burn the budget one tick at a time without fetching.
                self.status.halt_processed = true;
                bus.add_clock(1);
                continue;
            }
            if self.status.halt_processed {
                self.status.halt_processed = false;
            }

            if self.status.fetch_wai {
                if self.service_interrupts(bus, true) {
                    continue;
                }
                bus.add_clock(1);
                continue;
            }

            if self.service_interrupts(bus, false) {
                continue;
            }

            let opcode_pc = self.registers.pc;
            let opcode = self.fetch8(bus);
            match self.dispatch(opcode, bus) {
                Some(cycles) => bus.add_clock(cycles),
                None => {
                    return Err(CpuError::UnknownOpcode {
                        pc: opcode_pc,
                        opcode,
                    });
                }
            }
        }
        Ok(bus.clock() - target)
    }

    /// Service a pending NMI or IRQ. Priority: NMI, then IRQ when unmasked.
    /// Returns true if an interrupt was taken.
    fn service_interrupts<B: Bus + ?Sized>(&mut self, bus: &mut B, in_wai: bool) -> bool {
        if self.status.nmi_requested {
            self.status.nmi_requested = false;
            self.status.fetch_wai = false;
            self.push_all_registers(bus);
            self.flags.i = true;
            self.registers.pc = bus.load16(VECTOR_NMI);
            bus.add_clock(INTERRUPT_CYCLES);
            return true;
        }

        let irq_line = self.status.irq_requested || bus.check_interrupts().irq;
        if irq_line && !self.flags.i {
            self.status.irq_requested = false;
            if in_wai {
                self.status.fetch_wai = false;
            }
            self.push_all_registers(bus);
            // Mask further IRQs until RTI restores the old CCR; the line is
            // level-sensitive, so leaving I clear would re-enter immediately.
            self.flags.i = true;
            self.registers.pc = bus.load16(VECTOR_IRQ);
            bus.add_clock(INTERRUPT_CYCLES);
            return true;
        }

        false
    }

    // -----------------------------------------------------------------
    // Operand fetch and effective-address helpers
    // -----------------------------------------------------------------

    #[inline]
    pub(crate) fn fetch8<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let value = bus.load8(self.registers.pc);
        self.registers.pc = self.registers.pc.wrapping_add(1);
        value
    }

    #[inline]
    pub(crate) fn fetch16<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let hi = self.fetch8(bus);
        let lo = self.fetch8(bus);
        u16::from_be_bytes([hi, lo])
    }

    /// Direct mode: zero-page 8-bit address.
    #[inline]
    pub(crate) fn direct_addr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        self.fetch8(bus) as u16
    }

    /// Indexed mode: X plus unsigned 8-bit offset.
    #[inline]
    pub(crate) fn indexed_addr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        let offset = self.fetch8(bus) as u16;
        self.registers.x.wrapping_add(offset)
    }

    /// Extended mode: absolute 16-bit address.
    #[inline]
    pub(crate) fn extended_addr<B: Bus + ?Sized>(&mut self, bus: &mut B) -> u16 {
        self.fetch16(bus)
    }

    /// Execute one fetched opcode. Returns the cycle count, or None for an
    /// opcode with no table entry.
    fn dispatch<B: Bus + ?Sized>(&mut self, opcode: u8, bus: &mut B) -> Option<u64> {
        let cycles = match opcode {
            // --- Inherent ------------------------------------------------
            0x01 => 2, // NOP
            0x06 => {
                // TAP
                let a = self.registers.a;
                self.flags.unpack(a);
                2
            }
            0x07 => {
                // TPA
                self.registers.a = self.flags.pack();
                2
            }
            0x08 => {
                self.op_inx();
                4
            }
            0x09 => {
                self.op_dex();
                4
            }
            0x0A => {
                self.flags.v = false;
                2
            } // CLV
            0x0B => {
                self.flags.v = true;
                2
            } // SEV
            0x0C => {
                self.flags.c = false;
                2
            } // CLC
            0x0D => {
                self.flags.c = true;
                2
            } // SEC
            0x0E => {
                self.flags.i = false;
                2
            } // CLI
            0x0F => {
                self.flags.i = true;
                2
            } // SEI
            0x10 => {
                // SBA
                self.registers.a = self.sub8(self.registers.a, self.registers.b);
                2
            }
            0x11 => {
                // CBA
                self.cmp8(self.registers.a, self.registers.b);
                2
            }
            0x16 => {
                self.op_tab();
                2
            }
            0x17 => {
                self.op_tba();
                2
            }
            0x19 => {
                self.op_daa();
                2
            }
            0x1B => {
                // ABA
                self.registers.a = self.add8(self.registers.a, self.registers.b);
                2
            }

            // --- Relative branches --------------------------------------
            0x20 => {
                self.branch(bus, true);
                4
            } // BRA
            0x22 => {
                let cond = !(self.flags.c || self.flags.z);
                self.branch(bus, cond);
                4
            } // BHI
            0x23 => {
                let cond = self.flags.c || self.flags.z;
                self.branch(bus, cond);
                4
            } // BLS
            0x24 => {
                let cond = !self.flags.c;
                self.branch(bus, cond);
                4
            } // BCC
            0x25 => {
                let cond = self.flags.c;
                self.branch(bus, cond);
                4
            } // BCS
            0x26 => {
                let cond = !self.flags.z;
                self.branch(bus, cond);
                4
            } // BNE
            0x27 => {
                let cond = self.flags.z;
                self.branch(bus, cond);
                4
            } // BEQ
            0x28 => {
                let cond = !self.flags.v;
                self.branch(bus, cond);
                4
            } // BVC
            0x29 => {
                let cond = self.flags.v;
                self.branch(bus, cond);
                4
            } // BVS
            0x2A => {
                let cond = !self.flags.n;
                self.branch(bus, cond);
                4
            } // BPL
            0x2B => {
                let cond = self.flags.n;
                self.branch(bus, cond);
                4
            } // BMI
            0x2C => {
                let cond = self.flags.n == self.flags.v;
                self.branch(bus, cond);
                4
            } // BGE
            0x2D => {
                let cond = self.flags.n != self.flags.v;
                self.branch(bus, cond);
                4
            } // BLT
            0x2E => {
                let cond = !(self.flags.z || (self.flags.n != self.flags.v));
                self.branch(bus, cond);
                4
            } // BGT
            0x2F => {
                let cond = self.flags.z || (self.flags.n != self.flags.v);
                self.branch(bus, cond);
                4
            } // BLE

            // --- Index register / stack pointer -------------------------
            0x30 => {
                // TSX
                self.registers.x = self.registers.sp.wrapping_add(1);
                4
            }
            0x31 => {
                // INS
                self.registers.sp = self.registers.sp.wrapping_add(1);
                4
            }
            0x32 => {
                // PULA
                self.registers.a = self.pull8(bus);
                4
            }
            0x33 => {
                // PULB
                self.registers.b = self.pull8(bus);
                4
            }
            0x34 => {
                // DES
                self.registers.sp = self.registers.sp.wrapping_sub(1);
                4
            }
            0x35 => {
                // TXS
                self.registers.sp = self.registers.x.wrapping_sub(1);
                4
            }
            0x36 => {
                // PSHA
                self.push8(bus, self.registers.a);
                4
            }
            0x37 => {
                // PSHB
                self.push8(bus, self.registers.b);
                4
            }

            // --- Subroutine / interrupt returns -------------------------
            0x39 => {
                self.op_rts(bus);
                5
            }
            0x3B => {
                self.op_rti(bus);
                10
            }
            0x3E => {
                self.op_wai();
                9
            }
            0x3F => {
                self.op_swi(bus);
                12
            }

            // --- Unary on accumulator A ---------------------------------
            0x40 => {
                self.registers.a = self.neg8(self.registers.a);
                2
            }
            0x43 => {
                self.registers.a = self.com8(self.registers.a);
                2
            }
            0x44 => {
                self.registers.a = self.lsr8(self.registers.a);
                2
            }
            0x46 => {
                self.registers.a = self.ror8(self.registers.a);
                2
            }
            0x47 => {
                self.registers.a = self.asr8(self.registers.a);
                2
            }
            0x48 => {
                self.registers.a = self.asl8(self.registers.a);
                2
            }
            0x49 => {
                self.registers.a = self.rol8(self.registers.a);
                2
            }
            0x4A => {
                self.registers.a = self.dec8(self.registers.a);
                2
            }
            0x4C => {
                self.registers.a = self.inc8(self.registers.a);
                2
            }
            0x4D => {
                self.tst8(self.registers.a);
                2
            }
            0x4F => {
                self.registers.a = self.clr8();
                2
            }

            // --- Unary on accumulator B ---------------------------------
            0x50 => {
                self.registers.b = self.neg8(self.registers.b);
                2
            }
            0x53 => {
                self.registers.b = self.com8(self.registers.b);
                2
            }
            0x54 => {
                self.registers.b = self.lsr8(self.registers.b);
                2
            }
            0x56 => {
                self.registers.b = self.ror8(self.registers.b);
                2
            }
            0x57 => {
                self.registers.b = self.asr8(self.registers.b);
                2
            }
            0x58 => {
                self.registers.b = self.asl8(self.registers.b);
                2
            }
            0x59 => {
                self.registers.b = self.rol8(self.registers.b);
                2
            }
            0x5A => {
                self.registers.b = self.dec8(self.registers.b);
                2
            }
            0x5C => {
                self.registers.b = self.inc8(self.registers.b);
                2
            }
            0x5D => {
                self.tst8(self.registers.b);
                2
            }
            0x5F => {
                self.registers.b = self.clr8();
                2
            }

            // --- Unary on memory, indexed -------------------------------
            0x60 => {
                self.rmw_indexed(bus, Self::neg8);
                7
            }
            0x63 => {
                self.rmw_indexed(bus, Self::com8);
                7
            }
            0x64 => {
                self.rmw_indexed(bus, Self::lsr8);
                7
            }
            0x66 => {
                self.rmw_indexed(bus, Self::ror8);
                7
            }
            0x67 => {
                self.rmw_indexed(bus, Self::asr8);
                7
            }
            0x68 => {
                self.rmw_indexed(bus, Self::asl8);
                7
            }
            0x69 => {
                self.rmw_indexed(bus, Self::rol8);
                7
            }
            0x6A => {
                self.rmw_indexed(bus, Self::dec8);
                7
            }
            0x6C => {
                self.rmw_indexed(bus, Self::inc8);
                7
            }
            0x6D => {
                // TST indexed
                let addr = self.indexed_addr(bus);
                let value = bus.load8(addr);
                self.tst8(value);
                7
            }
            0x6E => {
                // JMP indexed: target word read through X
                let addr = self.indexed_addr(bus);
                self.registers.pc = bus.load16(addr);
                4
            }
            0x6F => {
                // CLR indexed
                let addr = self.indexed_addr(bus);
                let value = self.clr8();
                bus.store8(addr, value);
                7
            }

            // --- Unary on memory, extended + MB8861 bit ops -------------
            0x70 => {
                self.rmw_extended(bus, Self::neg8);
                6
            }
            0x71 => {
                // NIM #v,ix
                self.bitop_indexed(bus, Self::nim8, true);
                8
            }
            0x72 => {
                // OIM #v,ix
                self.bitop_indexed(bus, Self::oim8, true);
                8
            }
            0x73 => {
                self.rmw_extended(bus, Self::com8);
                6
            }
            0x74 => {
                self.rmw_extended(bus, Self::lsr8);
                6
            }
            0x75 => {
                // XIM #v,ix
                self.bitop_indexed(bus, Self::xim8, true);
                8
            }
            0x76 => {
                self.rmw_extended(bus, Self::ror8);
                6
            }
            0x77 => {
                self.rmw_extended(bus, Self::asr8);
                6
            }
            0x78 => {
                self.rmw_extended(bus, Self::asl8);
                6
            }
            0x79 => {
                self.rmw_extended(bus, Self::rol8);
                6
            }
            0x7A => {
                self.rmw_extended(bus, Self::dec8);
                6
            }
            0x7B => {
                // TMM #v,ix
                self.bitop_indexed(bus, Self::tmm8, false);
                7
            }
            0x7C => {
                self.rmw_extended(bus, Self::inc8);
                6
            }
            0x7D => {
                // TST extended
                let addr = self.extended_addr(bus);
                let value = bus.load8(addr);
                self.tst8(value);
                6
            }
            0x7E => {
                // JMP extended
                self.registers.pc = self.extended_addr(bus);
                3
            }
            0x7F => {
                // CLR extended
                let addr = self.extended_addr(bus);
                let value = self.clr8();
                bus.store8(addr, value);
                6
            }

            // --- Accumulator A binary ops -------------------------------
            0x80 => {
                self.alu_imm(bus, |c, m| c.registers.a = c.sub8(c.registers.a, m));
                2
            }
            0x81 => {
                self.alu_imm(bus, |c, m| c.cmp8(c.registers.a, m));
                2
            }
            0x82 => {
                self.alu_imm(bus, |c, m| c.registers.a = c.sbc8(c.registers.a, m));
                2
            }
            0x84 => {
                self.alu_imm(bus, |c, m| c.registers.a = c.and8(c.registers.a, m));
                2
            }
            0x85 => {
                self.alu_imm(bus, |c, m| c.bit8(c.registers.a, m));
                2
            }
            0x86 => {
                self.alu_imm(bus, |c, m| c.registers.a = c.lda8(m));
                2
            }
            0x88 => {
                self.alu_imm(bus, |c, m| c.registers.a = c.eor8(c.registers.a, m));
                2
            }
            0x89 => {
                self.alu_imm(bus, |c, m| c.registers.a = c.adc8(c.registers.a, m));
                2
            }
            0x8A => {
                self.alu_imm(bus, |c, m| c.registers.a = c.ora8(c.registers.a, m));
                2
            }
            0x8B => {
                self.alu_imm(bus, |c, m| c.registers.a = c.add8(c.registers.a, m));
                2
            }
            0x8C => {
                // CPX immediate
                let operand = self.fetch16(bus);
                self.cpx(operand);
                3
            }
            0x8D => {
                self.op_bsr(bus);
                8
            }
            0x8E => {
                // LDS immediate
                let operand = self.fetch16(bus);
                self.op_lds(operand);
                3
            }

            0x90 => {
                self.alu_direct(bus, |c, m| c.registers.a = c.sub8(c.registers.a, m));
                3
            }
            0x91 => {
                self.alu_direct(bus, |c, m| c.cmp8(c.registers.a, m));
                3
            }
            0x92 => {
                self.alu_direct(bus, |c, m| c.registers.a = c.sbc8(c.registers.a, m));
                3
            }
            0x94 => {
                self.alu_direct(bus, |c, m| c.registers.a = c.and8(c.registers.a, m));
                3
            }
            0x95 => {
                self.alu_direct(bus, |c, m| c.bit8(c.registers.a, m));
                3
            }
            0x96 => {
                self.alu_direct(bus, |c, m| c.registers.a = c.lda8(m));
                3
            }
            0x97 => {
                // STAA direct
                let addr = self.direct_addr(bus);
                self.sta8(bus, addr, self.registers.a);
                4
            }
            0x98 => {
                self.alu_direct(bus, |c, m| c.registers.a = c.eor8(c.registers.a, m));
                3
            }
            0x99 => {
                self.alu_direct(bus, |c, m| c.registers.a = c.adc8(c.registers.a, m));
                3
            }
            0x9A => {
                self.alu_direct(bus, |c, m| c.registers.a = c.ora8(c.registers.a, m));
                3
            }
            0x9B => {
                self.alu_direct(bus, |c, m| c.registers.a = c.add8(c.registers.a, m));
                3
            }
            0x9C => {
                // CPX direct
                let addr = self.direct_addr(bus);
                let value = bus.load16(addr);
                self.cpx(value);
                4
            }
            0x9E => {
                // LDS direct
                let addr = self.direct_addr(bus);
                let value = bus.load16(addr);
                self.op_lds(value);
                4
            }
            0x9F => {
                // STS direct
                let addr = self.direct_addr(bus);
                self.op_sts(bus, addr);
                5
            }

            0xA0 => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.sub8(c.registers.a, m));
                5
            }
            0xA1 => {
                self.alu_indexed(bus, |c, m| c.cmp8(c.registers.a, m));
                5
            }
            0xA2 => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.sbc8(c.registers.a, m));
                5
            }
            0xA4 => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.and8(c.registers.a, m));
                5
            }
            0xA5 => {
                self.alu_indexed(bus, |c, m| c.bit8(c.registers.a, m));
                5
            }
            0xA6 => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.lda8(m));
                5
            }
            0xA7 => {
                // STAA indexed
                let addr = self.indexed_addr(bus);
                self.sta8(bus, addr, self.registers.a);
                6
            }
            0xA8 => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.eor8(c.registers.a, m));
                5
            }
            0xA9 => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.adc8(c.registers.a, m));
                5
            }
            0xAA => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.ora8(c.registers.a, m));
                5
            }
            0xAB => {
                self.alu_indexed(bus, |c, m| c.registers.a = c.add8(c.registers.a, m));
                5
            }
            0xAC => {
                // CPX indexed
                let addr = self.indexed_addr(bus);
                let value = bus.load16(addr);
                self.cpx(value);
                6
            }
            0xAD => {
                self.op_jsr_indexed(bus);
                8
            }
            0xAE => {
                // LDS indexed
                let addr = self.indexed_addr(bus);
                let value = bus.load16(addr);
                self.op_lds(value);
                6
            }
            0xAF => {
                // STS indexed
                let addr = self.indexed_addr(bus);
                self.op_sts(bus, addr);
                7
            }

            0xB0 => {
                self.alu_extended(bus, |c, m| c.registers.a = c.sub8(c.registers.a, m));
                4
            }
            0xB1 => {
                self.alu_extended(bus, |c, m| c.cmp8(c.registers.a, m));
                4
            }
            0xB2 => {
                self.alu_extended(bus, |c, m| c.registers.a = c.sbc8(c.registers.a, m));
                4
            }
            0xB4 => {
                self.alu_extended(bus, |c, m| c.registers.a = c.and8(c.registers.a, m));
                4
            }
            0xB5 => {
                self.alu_extended(bus, |c, m| c.bit8(c.registers.a, m));
                4
            }
            0xB6 => {
                self.alu_extended(bus, |c, m| c.registers.a = c.lda8(m));
                4
            }
            0xB7 => {
                // STAA extended
                let addr = self.extended_addr(bus);
                self.sta8(bus, addr, self.registers.a);
                5
            }
            0xB8 => {
                self.alu_extended(bus, |c, m| c.registers.a = c.eor8(c.registers.a, m));
                4
            }
            0xB9 => {
                self.alu_extended(bus, |c, m| c.registers.a = c.adc8(c.registers.a, m));
                4
            }
            0xBA => {
                self.alu_extended(bus, |c, m| c.registers.a = c.ora8(c.registers.a, m));
                4
            }
            0xBB => {
                self.alu_extended(bus, |c, m| c.registers.a = c.add8(c.registers.a, m));
                4
            }
            0xBC => {
                // CPX extended
                let addr = self.extended_addr(bus);
                let value = bus.load16(addr);
                self.cpx(value);
                5
            }
            0xBD => {
                self.op_jsr_extended(bus);
                9
            }
            0xBE => {
                // LDS extended
                let addr = self.extended_addr(bus);
                let value = bus.load16(addr);
                self.op_lds(value);
                5
            }
            0xBF => {
                // STS extended
                let addr = self.extended_addr(bus);
                self.op_sts(bus, addr);
                6
            }

            // --- Accumulator B binary ops -------------------------------
            0xC0 => {
                self.alu_imm(bus, |c, m| c.registers.b = c.sub8(c.registers.b, m));
                2
            }
            0xC1 => {
                self.alu_imm(bus, |c, m| c.cmp8(c.registers.b, m));
                2
            }
            0xC2 => {
                self.alu_imm(bus, |c, m| c.registers.b = c.sbc8(c.registers.b, m));
                2
            }
            0xC4 => {
                self.alu_imm(bus, |c, m| c.registers.b = c.and8(c.registers.b, m));
                2
            }
            0xC5 => {
                self.alu_imm(bus, |c, m| c.bit8(c.registers.b, m));
                2
            }
            0xC6 => {
                self.alu_imm(bus, |c, m| c.registers.b = c.lda8(m));
                2
            }
            0xC8 => {
                self.alu_imm(bus, |c, m| c.registers.b = c.eor8(c.registers.b, m));
                2
            }
            0xC9 => {
                self.alu_imm(bus, |c, m| c.registers.b = c.adc8(c.registers.b, m));
                2
            }
            0xCA => {
                self.alu_imm(bus, |c, m| c.registers.b = c.ora8(c.registers.b, m));
                2
            }
            0xCB => {
                self.alu_imm(bus, |c, m| c.registers.b = c.add8(c.registers.b, m));
                2
            }
            0xCE => {
                // LDX immediate
                let operand = self.fetch16(bus);
                self.op_ldx(operand);
                3
            }

            0xD0 => {
                self.alu_direct(bus, |c, m| c.registers.b = c.sub8(c.registers.b, m));
                3
            }
            0xD1 => {
                self.alu_direct(bus, |c, m| c.cmp8(c.registers.b, m));
                3
            }
            0xD2 => {
                self.alu_direct(bus, |c, m| c.registers.b = c.sbc8(c.registers.b, m));
                3
            }
            0xD4 => {
                self.alu_direct(bus, |c, m| c.registers.b = c.and8(c.registers.b, m));
                3
            }
            0xD5 => {
                self.alu_direct(bus, |c, m| c.bit8(c.registers.b, m));
                3
            }
            0xD6 => {
                self.alu_direct(bus, |c, m| c.registers.b = c.lda8(m));
                3
            }
            0xD7 => {
                // STAB direct
                let addr = self.direct_addr(bus);
                self.sta8(bus, addr, self.registers.b);
                4
            }
            0xD8 => {
                self.alu_direct(bus, |c, m| c.registers.b = c.eor8(c.registers.b, m));
                3
            }
            0xD9 => {
                self.alu_direct(bus, |c, m| c.registers.b = c.adc8(c.registers.b, m));
                3
            }
            0xDA => {
                self.alu_direct(bus, |c, m| c.registers.b = c.ora8(c.registers.b, m));
                3
            }
            0xDB => {
                self.alu_direct(bus, |c, m| c.registers.b = c.add8(c.registers.b, m));
                3
            }
            0xDE => {
                // LDX direct
                let addr = self.direct_addr(bus);
                let value = bus.load16(addr);
                self.op_ldx(value);
                4
            }
            0xDF => {
                // STX direct
                let addr = self.direct_addr(bus);
                self.op_stx(bus, addr);
                5
            }

            0xE0 => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.sub8(c.registers.b, m));
                5
            }
            0xE1 => {
                self.alu_indexed(bus, |c, m| c.cmp8(c.registers.b, m));
                5
            }
            0xE2 => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.sbc8(c.registers.b, m));
                5
            }
            0xE4 => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.and8(c.registers.b, m));
                5
            }
            0xE5 => {
                self.alu_indexed(bus, |c, m| c.bit8(c.registers.b, m));
                5
            }
            0xE6 => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.lda8(m));
                5
            }
            0xE7 => {
                // STAB indexed
                let addr = self.indexed_addr(bus);
                self.sta8(bus, addr, self.registers.b);
                6
            }
            0xE8 => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.eor8(c.registers.b, m));
                5
            }
            0xE9 => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.adc8(c.registers.b, m));
                5
            }
            0xEA => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.ora8(c.registers.b, m));
                5
            }
            0xEB => {
                self.alu_indexed(bus, |c, m| c.registers.b = c.add8(c.registers.b, m));
                5
            }
            0xEC => {
                // ADX immediate: X += zero-extended imm8 (MB8861 extension)
                let operand = self.fetch8(bus) as u16;
                self.registers.x = self.add16(self.registers.x, operand);
                3
            }
            0xEE => {
                // LDX indexed
                let addr = self.indexed_addr(bus);
                let value = bus.load16(addr);
                self.op_ldx(value);
                6
            }
            0xEF => {
                // STX indexed
                let addr = self.indexed_addr(bus);
                self.op_stx(bus, addr);
                7
            }

            0xF0 => {
                self.alu_extended(bus, |c, m| c.registers.b = c.sub8(c.registers.b, m));
                4
            }
            0xF1 => {
                self.alu_extended(bus, |c, m| c.cmp8(c.registers.b, m));
                4
            }
            0xF2 => {
                self.alu_extended(bus, |c, m| c.registers.b = c.sbc8(c.registers.b, m));
                4
            }
            0xF4 => {
                self.alu_extended(bus, |c, m| c.registers.b = c.and8(c.registers.b, m));
                4
            }
            0xF5 => {
                self.alu_extended(bus, |c, m| c.bit8(c.registers.b, m));
                4
            }
            0xF6 => {
                self.alu_extended(bus, |c, m| c.registers.b = c.lda8(m));
                4
            }
            0xF7 => {
                // STAB extended
                let addr = self.extended_addr(bus);
                self.sta8(bus, addr, self.registers.b);
                5
            }
            0xF8 => {
                self.alu_extended(bus, |c, m| c.registers.b = c.eor8(c.registers.b, m));
                4
            }
            0xF9 => {
                self.alu_extended(bus, |c, m| c.registers.b = c.adc8(c.registers.b, m));
                4
            }
            0xFA => {
                // ORAB extended. The silicon in the JR-100 performs an ADD
                // here instead of an OR, and the BASIC ROM depends on it.
                self.alu_extended(bus, |c, m| c.registers.b = c.add8(c.registers.b, m));
                4
            }
            0xFB => {
                self.alu_extended(bus, |c, m| c.registers.b = c.add8(c.registers.b, m));
                4
            }
            0xFC => {
                // ADX extended: X += word operand (MB8861 extension)
                let addr = self.extended_addr(bus);
                let value = bus.load16(addr);
                self.registers.x = self.add16(self.registers.x, value);
                7
            }
            0xFE => {
                // LDX extended
                let addr = self.extended_addr(bus);
                let value = bus.load16(addr);
                self.op_ldx(value);
                5
            }
            0xFF => {
                // STX extended
                let addr = self.extended_addr(bus);
                self.op_stx(bus, addr);
                6
            }

            _ => return None,
        };
        Some(cycles)
    }
}
