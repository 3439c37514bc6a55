//! R6522 VIA (Versatile Interface Adapter).
//!
//! Two 16-bit timers, two 8-bit ports with handshake lines, an 8-bit shift
//! register, and an interrupt controller. The chip is driven by a catch-up
//! cursor (`current_clock`) that chases the system clock: every memory
//! access advances the chip to the cycle before the access, applies the
//! register side effect, then advances it through the access cycle, so
//! timer underflows and the access land in the right order.
//!
//! Board-specific wiring (keyboard scan, font switching, the beeper line)
//! goes through the [`ViaHooks`] seam; the chip itself is board-agnostic.

/// Register offsets (RS3:RS0).
pub const REG_IORB: u16 = 0x0;
pub const REG_IORA: u16 = 0x1;
pub const REG_DDRB: u16 = 0x2;
pub const REG_DDRA: u16 = 0x3;
pub const REG_T1CL: u16 = 0x4;
pub const REG_T1CH: u16 = 0x5;
pub const REG_T1LL: u16 = 0x6;
pub const REG_T1LH: u16 = 0x7;
pub const REG_T2CL: u16 = 0x8;
pub const REG_T2CH: u16 = 0x9;
pub const REG_SR: u16 = 0xA;
pub const REG_ACR: u16 = 0xB;
pub const REG_PCR: u16 = 0xC;
pub const REG_IFR: u16 = 0xD;
pub const REG_IER: u16 = 0xE;
/// Port A without handshake side effects.
pub const REG_IORANH: u16 = 0xF;

/// Interrupt flag bits (IFR/IER).
pub const IFR_CA2: u8 = 0x01;
pub const IFR_CA1: u8 = 0x02;
pub const IFR_SR: u8 = 0x04;
pub const IFR_CB2: u8 = 0x08;
pub const IFR_CB1: u8 = 0x10;
pub const IFR_T2: u8 = 0x20;
pub const IFR_T1: u8 = 0x40;
/// Composite IRQ mirror: set exactly when `(IFR & IER & 0x7F) != 0`.
pub const IFR_IRQ: u8 = 0x80;

/// Board wiring callbacks. Every method defaults to a no-op so the chip is
/// testable standalone; [`NullHooks`] is the canonical empty implementation.
pub trait ViaHooks {
    /// After a write to IORB (port B output updated).
    fn store_orb(&mut self, _via: &mut Via6522) {}
    /// After a write to IORA (port A output updated).
    fn store_iora(&mut self, _via: &mut Via6522) {}
    /// After T1 is loaded from its latch (T1CH write or free-run reload).
    fn store_t1ch(&mut self, _via: &mut Via6522) {}
    /// Timer 1 underflow in one-shot mode (ACR bits 7-6 = 00).
    fn timer1_timeout_mode0(&mut self, _via: &mut Via6522) {}
    /// Timer 1 underflow in free-run mode (01).
    fn timer1_timeout_mode1(&mut self, _via: &mut Via6522) {}
    /// Timer 1 underflow in one-shot PB7 mode (10).
    fn timer1_timeout_mode2(&mut self, _via: &mut Via6522) {}
    /// Timer 1 underflow in free-run PB7 mode (11).
    fn timer1_timeout_mode3(&mut self, _via: &mut Via6522) {}
    /// Composite IRQ line transition.
    fn handler_irq(&mut self, _asserted: bool) {}
    fn handler_ca2(&mut self, _state: u8) {}
    fn handler_cb1(&mut self, _state: u8) {}
    fn handler_cb2(&mut self, _state: u8) {}
    fn port_a_written(&mut self, _value: u8) {}
    fn port_b_written(&mut self, _value: u8) {}
}

/// No-op hook set for standalone use and tests.
pub struct NullHooks;

impl ViaHooks for NullHooks {}

/// Complete serializable chip state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViaState {
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

pub struct Via6522 {
    ifr: u8,
    ier: u8,
    pcr: u8,
    acr: u8,
    ira: u8,
    ora: u8,
    ddra: u8,
    irb: u8,
    orb: u8,
    ddrb: u8,
    sr: u8,
    port_a: u8,
    port_b: u8,
    ca1_in: u8,
    ca2_in: u8,
    ca2_out: u8,
    /// Countdown for the CA2 pulse mode; -1 when idle.
    ca2_timer: i32,
    cb1_in: u8,
    cb1_out: u8,
    cb2_in: u8,
    cb2_out: u8,
    previous_pb6: u8,
    latch1: u16,
    latch2: u16,
    /// Counters run to -1 before reloading, hence signed.
    timer1: i32,
    timer2: i32,
    shift_tick: bool,
    shift_counter: u8,
    shift_started: bool,
    /// One-shot load delay: the first tick after a counter load does not
    /// decrement.
    timer1_initialized: bool,
    timer1_enable: bool,
    timer2_initialized: bool,
    timer2_enable: bool,
    /// Catch-up cursor; never exceeds the system clock.
    current_clock: u64,
}

impl Default for Via6522 {
    fn default() -> Self {
        Self::new()
    }
}

impl Via6522 {
    pub fn new() -> Self {
        Self {
            ifr: 0,
            ier: 0,
            pcr: 0,
            acr: 0,
            ira: 0,
            ora: 0,
            ddra: 0,
            irb: 0,
            orb: 0,
            ddrb: 0,
            sr: 0,
            port_a: 0,
            port_b: 0,
            ca1_in: 0,
            ca2_in: 0,
            ca2_out: 0,
            ca2_timer: -1,
            cb1_in: 0,
            cb1_out: 0,
            cb2_in: 0,
            cb2_out: 0,
            previous_pb6: 0,
            latch1: 0,
            latch2: 0,
            timer1: 0,
            timer2: 0,
            shift_tick: false,
            shift_counter: 0,
            shift_started: false,
            timer1_initialized: false,
            timer1_enable: false,
            timer2_initialized: false,
            timer2_enable: false,
            current_clock: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // -----------------------------------------------------------------
    // Register accessors used by board hooks and snapshots
    // -----------------------------------------------------------------

    pub fn ifr(&self) -> u8 {
        self.ifr
    }

    pub fn ier(&self) -> u8 {
        self.ier
    }

    pub fn acr(&self) -> u8 {
        self.acr
    }

    pub fn pcr(&self) -> u8 {
        self.pcr
    }

    pub fn ora(&self) -> u8 {
        self.ora
    }

    pub fn orb(&self) -> u8 {
        self.orb
    }

    pub fn timer1(&self) -> i32 {
        self.timer1
    }

    pub fn timer2(&self) -> i32 {
        self.timer2
    }

    pub fn current_clock(&self) -> u64 {
        self.current_clock
    }

    /// State of the composite IRQ output line.
    pub fn irq_asserted(&self) -> bool {
        self.ifr & IFR_IRQ != 0
    }

    // -----------------------------------------------------------------
    // Interrupt flags
    // -----------------------------------------------------------------

    fn process_irq<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        if self.ier & self.ifr & 0x7F != 0 {
            if self.ifr & IFR_IRQ == 0 {
                self.ifr |= IFR_IRQ;
                hooks.handler_irq(true);
            }
        } else if self.ifr & IFR_IRQ != 0 {
            self.ifr &= !IFR_IRQ;
            hooks.handler_irq(false);
        }
    }

    fn set_interrupt<H: ViaHooks + ?Sized>(&mut self, bits: u8, hooks: &mut H) {
        if self.ifr & bits == 0 {
            self.ifr |= bits;
            self.process_irq(hooks);
        }
    }

    fn clear_interrupt<H: ViaHooks + ?Sized>(&mut self, bits: u8, hooks: &mut H) {
        if self.ifr & bits != 0 {
            self.ifr &= !bits;
            self.process_irq(hooks);
        }
    }

    fn is_interrupt_set(&self, bits: u8) -> bool {
        self.ifr & bits != 0
    }

    // -----------------------------------------------------------------
    // Port A
    // -----------------------------------------------------------------

    /// Drive an external input pin on port A. Ignored for bits configured
    /// as outputs.
    pub fn set_port_a(&mut self, bit: u8, state: u8) {
        let mask = 1 << bit;
        if self.ddra & mask != 0 {
            return;
        }
        if state != 0 {
            self.port_a |= mask;
        } else {
            self.port_a &= !mask;
        }
        if self.acr & 0x01 == 0 {
            self.ira = self.port_a;
        }
    }

    /// Drive all external input pins on port A at once.
    pub fn set_port_a_value(&mut self, value: u8) {
        self.port_a = (self.port_a & self.ddra) | (value & !self.ddra);
        if self.acr & 0x01 == 0 {
            self.ira = self.port_a;
        }
    }

    /// Pin-level view of port A: latched inputs where DDR=0, pin state
    /// where DDR=1.
    pub fn input_port_a(&self) -> u8 {
        (self.ira & !self.ddra) | (self.port_a & self.ddra)
    }

    pub fn input_port_a_bit(&self, bit: u8) -> u8 {
        (self.input_port_a() >> bit) & 0x01
    }

    fn output_port_a<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        hooks.port_a_written(self.ora);
    }

    // -----------------------------------------------------------------
    // Port B
    // -----------------------------------------------------------------

    pub fn set_port_b(&mut self, bit: u8, state: u8) {
        let mask = 1 << bit;
        if self.ddrb & mask != 0 {
            return;
        }
        if state != 0 {
            self.port_b |= mask;
        } else {
            self.port_b &= !mask;
        }
        if self.acr & 0x02 == 0 {
            self.irb = self.port_b;
        }
    }

    pub fn set_port_b_value(&mut self, value: u8) {
        self.port_b = (self.port_b & self.ddrb) | (value & !self.ddrb);
        if self.acr & 0x02 == 0 {
            self.irb = self.port_b;
        }
    }

    /// Toggle an input pin on port B (timer 1 PB7 modes).
    pub fn invert_port_b(&mut self, bit: u8) {
        let mask = 1 << bit;
        if self.ddrb & mask != 0 {
            return;
        }
        self.port_b ^= mask;
        if self.acr & 0x02 == 0 {
            self.irb = self.port_b;
        }
    }

    /// Pin-level view of port B: latched inputs where DDR=0, output
    /// register where DDR=1.
    pub fn input_port_b(&self) -> u8 {
        (self.irb & !self.ddrb) | (self.orb & self.ddrb)
    }

    pub fn input_port_b_bit(&self, bit: u8) -> u8 {
        (self.input_port_b() >> bit) & 0x01
    }

    fn output_port_b<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        hooks.port_b_written(self.orb);
    }

    // -----------------------------------------------------------------
    // Handshake lines
    // -----------------------------------------------------------------

    /// CA1 edge. On the PCR-selected active edge: latch IRA when input
    /// latching is on, raise the CA1 flag, and re-raise CA2 in handshake
    /// mode 0x08.
    pub fn set_ca1<H: ViaHooks + ?Sized>(&mut self, state: u8, hooks: &mut H) {
        if self.ca1_in == state {
            return;
        }
        self.ca1_in = state;
        let rising = state == 1 && self.pcr & 0x01 == 0x01;
        let falling = state == 0 && self.pcr & 0x01 == 0x00;
        if rising || falling {
            if self.acr & 0x01 == 0x01 {
                self.ira = self.input_port_a();
            }
            self.set_interrupt(IFR_CA1, hooks);
            if self.ca2_out == 0 && self.pcr & 0x0E == 0x08 {
                self.ca2_out = 1;
                hooks.handler_ca2(1);
            }
        }
    }

    /// CA2 edge (input modes only).
    pub fn set_ca2<H: ViaHooks + ?Sized>(&mut self, state: u8, hooks: &mut H) {
        if self.ca2_in == state {
            return;
        }
        self.ca2_in = state;
        if self.pcr & 0x08 == 0x00 {
            let rising = state == 1 && self.pcr & 0x0C == 0x04;
            let falling = state == 0 && self.pcr & 0x0C == 0x00;
            if rising || falling {
                self.set_interrupt(IFR_CA2, hooks);
            }
        }
    }

    /// CB1 edge. Also clocks the shift register in its external-clock
    /// modes (ACR bits 4-2 = 011 in, 111 out).
    pub fn set_cb1<H: ViaHooks + ?Sized>(&mut self, state: u8, hooks: &mut H) {
        if self.cb1_in == state {
            return;
        }
        self.cb1_in = state;
        let rising = state == 1 && self.pcr & 0x10 == 0x10;
        let falling = state == 0 && self.pcr & 0x10 == 0x00;
        if rising || falling {
            if self.acr & 0x02 == 0x02 {
                self.irb = self.input_port_b();
            }
            if self.shift_started && self.acr & 0x1C == 0x0C {
                self.process_shift_in(hooks);
            }
            if self.shift_started && self.acr & 0x1C == 0x1C {
                self.process_shift_out(hooks);
            }
            self.set_interrupt(IFR_CB1, hooks);
            if self.cb2_out == 0 && self.pcr & 0xA0 == 0x20 {
                self.cb2_out = 1;
                hooks.handler_cb2(1);
            }
        }
    }

    /// CB2 edge (input modes only).
    pub fn set_cb2<H: ViaHooks + ?Sized>(&mut self, state: u8, hooks: &mut H) {
        if self.cb2_in == state {
            return;
        }
        self.cb2_in = state;
        if self.pcr & 0x80 == 0x00 {
            let rising = state == 1 && self.pcr & 0xC0 == 0x40;
            let falling = state == 0 && self.pcr & 0xC0 == 0x00;
            if rising || falling {
                self.set_interrupt(IFR_CB2, hooks);
            }
        }
    }

    // -----------------------------------------------------------------
    // Shift register
    // -----------------------------------------------------------------

    fn initialize_shift_in<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        self.shift_tick = false;
        self.shift_counter = 0;
        if self.is_interrupt_set(IFR_SR) {
            self.clear_interrupt(IFR_SR, hooks);
            self.process_shift_in(hooks);
        }
        self.shift_started = true;
    }

    fn initialize_shift_out<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        self.shift_tick = false;
        self.shift_counter = 0;
        if self.is_interrupt_set(IFR_SR) {
            self.clear_interrupt(IFR_SR, hooks);
            self.process_shift_out(hooks);
        }
        self.shift_started = true;
    }

    /// One shift clock edge, input direction. Data shifts on the falling
    /// internal tick; after 8 bits the SR flag raises and shifting stops.
    fn process_shift_in<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        if !self.shift_started {
            return;
        }
        if self.shift_tick {
            self.cb1_out = 1;
            hooks.handler_cb1(1);
            self.sr = (self.sr << 1) | (self.cb2_in & 0x01);
            self.shift_counter = (self.shift_counter + 1) % 8;
            if self.shift_counter == 0 {
                self.set_interrupt(IFR_SR, hooks);
                self.shift_started = false;
            }
        } else {
            self.cb1_out = 0;
            hooks.handler_cb1(0);
        }
        self.shift_tick = !self.shift_tick;
    }

    /// One shift clock edge, output direction. Mode 0x10 (free-run) never
    /// raises the SR flag.
    fn process_shift_out<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        if !self.shift_started {
            return;
        }
        if self.shift_tick {
            self.cb1_out = 1;
            hooks.handler_cb1(1);
            self.cb2_out = (self.sr >> 7) & 0x01;
            hooks.handler_cb2(self.cb2_out);
            self.sr = (self.sr << 1) | (self.cb2_out & 0x01);
            if self.acr & 0x1C != 0x10 {
                self.shift_counter = (self.shift_counter + 1) % 8;
                if self.shift_counter == 0 {
                    self.set_interrupt(IFR_SR, hooks);
                    self.shift_started = false;
                }
            }
        } else {
            self.cb1_out = 0;
            hooks.handler_cb1(0);
        }
        self.shift_tick = !self.shift_tick;
    }

    // -----------------------------------------------------------------
    // Memory-mapped access
    // -----------------------------------------------------------------

    /// Read a register. `clock` is the system clock at the access; the
    /// chip catches up to the cycle before, applies the side effect, then
    /// runs through the access cycle.
    pub fn load8<H: ViaHooks + ?Sized>(&mut self, offset: u16, clock: u64, hooks: &mut H) -> u8 {
        self.run_until(clock as i64 - 1, hooks);
        let result = match offset & 0x0F {
            REG_IORB => {
                let result = if self.acr & 0x02 == 0 {
                    self.input_port_b()
                } else {
                    self.irb
                };
                let cb2 = if self.pcr & 0xA0 == 0x20 { 0 } else { IFR_CB2 };
                self.clear_interrupt(IFR_CB1 | cb2, hooks);
                result
            }
            REG_IORA => {
                let result = if self.acr & 0x01 == 0 {
                    self.input_port_a()
                } else {
                    self.ira
                };
                let ca2 = if self.pcr & 0x0A == 0x02 { 0 } else { IFR_CA2 };
                self.clear_interrupt(IFR_CA1 | ca2, hooks);
                if self.ca2_out == 1 && (self.pcr & 0x0E == 0x0A || self.pcr & 0x0E == 0x08) {
                    self.ca2_out = 0;
                    hooks.handler_ca2(0);
                    if self.pcr & 0x0E == 0x08 {
                        self.ca2_timer = 1;
                    }
                }
                result
            }
            REG_DDRB => self.ddrb,
            REG_DDRA => self.ddra,
            REG_T1CL => {
                self.clear_interrupt(IFR_T1, hooks);
                (self.timer1 & 0xFF) as u8
            }
            REG_T1CH => ((self.timer1 >> 8) & 0xFF) as u8,
            REG_T1LL => (self.latch1 & 0xFF) as u8,
            REG_T1LH => (self.latch1 >> 8) as u8,
            REG_T2CL => {
                self.clear_interrupt(IFR_T2, hooks);
                (self.timer2 & 0xFF) as u8
            }
            REG_T2CH => ((self.timer2 >> 8) & 0xFF) as u8,
            REG_SR => {
                match self.acr & 0x1C {
                    0x00 => {}
                    0x04 | 0x08 | 0x0C => self.initialize_shift_in(hooks),
                    _ => self.initialize_shift_out(hooks),
                }
                self.sr
            }
            REG_ACR => self.acr,
            REG_PCR => self.pcr,
            REG_IFR => self.ifr,
            REG_IER => self.ier | 0x80,
            REG_IORANH => {
                if self.acr & 0x01 == 0 {
                    self.input_port_a()
                } else {
                    self.ira
                }
            }
            _ => unreachable!(),
        };
        self.run_until(clock as i64, hooks);
        result
    }

    /// Write a register, with the same catch-up bracketing as `load8`.
    pub fn store8<H: ViaHooks + ?Sized>(
        &mut self,
        offset: u16,
        value: u8,
        clock: u64,
        hooks: &mut H,
    ) {
        self.run_until(clock as i64 - 1, hooks);
        match offset & 0x0F {
            REG_IORB => {
                self.orb = value;
                self.output_port_b(hooks);
                let cb2 = if self.pcr & 0xA0 == 0x20 { 0 } else { IFR_CB2 };
                self.clear_interrupt(IFR_CB1 | cb2, hooks);
                if self.cb2_out == 1 && self.pcr & 0xC0 == 0x80 {
                    self.cb2_out = 0;
                    hooks.handler_cb2(0);
                }
                hooks.store_orb(self);
            }
            REG_IORA => {
                self.ora = value;
                if self.ddra != 0x00 {
                    self.output_port_a(hooks);
                }
                let ca2 = if self.pcr & 0x0A == 0x02 { 0 } else { IFR_CA2 };
                self.clear_interrupt(IFR_CA1 | ca2, hooks);
                if self.ca2_out == 1 && (self.pcr & 0x0E == 0x0A || self.pcr & 0x0C == 0x08) {
                    self.ca2_out = 0;
                    hooks.handler_ca2(0);
                }
                if self.pcr & 0x0E == 0x0A {
                    self.ca2_timer = 1;
                }
                hooks.store_iora(self);
            }
            REG_DDRB => self.ddrb = value,
            REG_DDRA => self.ddra = value,
            REG_T1CL => {
                self.latch1 = (self.latch1 & 0xFF00) | value as u16;
            }
            REG_T1CH => {
                self.latch1 = (self.latch1 & 0x00FF) | ((value as u16) << 8);
                self.timer1 = self.latch1 as i32;
                self.clear_interrupt(IFR_T1, hooks);
                self.timer1_initialized = true;
                self.timer1_enable = true;
                if self.acr & 0x80 != 0 {
                    self.set_port_b(7, 0);
                }
                hooks.store_t1ch(self);
            }
            REG_T1LL => {
                self.latch1 = (self.latch1 & 0xFF00) | value as u16;
            }
            REG_T1LH => {
                self.latch1 = (self.latch1 & 0x00FF) | ((value as u16) << 8);
            }
            REG_T2CL => {
                self.latch2 = (self.latch2 & 0xFF00) | value as u16;
            }
            REG_T2CH => {
                self.latch2 = (self.latch2 & 0x00FF) | ((value as u16) << 8);
                self.timer2 = self.latch2 as i32;
                self.clear_interrupt(IFR_T2, hooks);
                self.timer2_initialized = true;
                self.timer2_enable = true;
            }
            REG_SR => {
                match self.acr & 0x1C {
                    0x00 => {}
                    0x04 | 0x08 | 0x0C => self.initialize_shift_in(hooks),
                    _ => self.initialize_shift_out(hooks),
                }
                self.sr = value;
            }
            REG_ACR => self.acr = value,
            REG_PCR => self.pcr = value,
            REG_IFR => {
                // Bit 7 set clears every flag; otherwise write-one-to-clear.
                let bits = if value & 0x80 != 0 { 0x7F } else { value };
                self.clear_interrupt(bits, hooks);
            }
            REG_IER => {
                if value & 0x80 != 0 {
                    self.ier |= value & 0x7F;
                } else {
                    self.ier &= !(value & 0x7F);
                }
                self.process_irq(hooks);
            }
            REG_IORANH => {
                self.ora = value;
                if self.ddra != 0x00 {
                    self.output_port_a(hooks);
                }
            }
            _ => unreachable!(),
        }
        self.run_until(clock as i64, hooks);
    }

    // -----------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------

    /// Catch the chip up to the system clock.
    pub fn execute<H: ViaHooks + ?Sized>(&mut self, clock: u64, hooks: &mut H) {
        self.run_until(clock as i64, hooks);
    }

    fn run_until<H: ViaHooks + ?Sized>(&mut self, target: i64, hooks: &mut H) {
        while (self.current_clock as i64) < target {
            self.tick(hooks);
            self.current_clock += 1;
        }
    }

    /// One φ2 cycle: CA2 pulse countdown, both timers, φ2-clocked shift.
    fn tick<H: ViaHooks + ?Sized>(&mut self, hooks: &mut H) {
        if self.ca2_timer >= 0 {
            self.ca2_timer -= 1;
            if self.ca2_timer < 0 {
                self.ca2_out = 1;
                hooks.handler_ca2(1);
            }
        }

        // Timer 1
        if self.timer1_initialized {
            self.timer1_initialized = false;
        } else if self.timer1 >= 0 {
            self.timer1 -= 1;
        } else {
            if self.timer1_enable {
                self.set_interrupt(IFR_T1, hooks);
                match self.acr & 0xC0 {
                    0x00 => {
                        self.timer1_enable = false;
                        hooks.timer1_timeout_mode0(self);
                    }
                    0x40 => {
                        self.invert_port_b(7);
                        hooks.timer1_timeout_mode1(self);
                    }
                    0x80 => {
                        self.timer1_enable = false;
                        self.set_port_b(7, 1);
                        hooks.timer1_timeout_mode2(self);
                    }
                    _ => {
                        self.invert_port_b(7);
                        hooks.timer1_timeout_mode3(self);
                    }
                }
            }
            self.timer1 = self.latch1 as i32;
            hooks.store_t1ch(self);
        }

        // Timer 2: PB6 falling edges are sampled every cycle regardless of
        // mode so the edge detector stays current.
        let current_pb6 = self.input_port_b() & 0x40;
        let pb6_negative = self.previous_pb6 != 0 && current_pb6 == 0;
        self.previous_pb6 = current_pb6;

        if self.timer2 >= 0 {
            if self.acr & 0x20 == 0x00 {
                if self.timer2_initialized {
                    self.timer2_initialized = false;
                } else {
                    self.timer2 -= 1;
                }
            } else if self.timer2_initialized {
                self.timer2_initialized = false;
            } else if pb6_negative {
                self.timer2 -= 1;
            }
        } else {
            if self.timer2_enable {
                self.set_interrupt(IFR_T2, hooks);
                self.timer2_enable = false;
            }
            if self.shift_started && self.timer2 & 0xFF == 0xFF {
                match self.acr & 0x1C {
                    0x04 => self.process_shift_in(hooks),
                    0x10 | 0x14 => self.process_shift_out(hooks),
                    _ => {}
                }
            }
            self.timer2 = self.latch2 as i32;
        }

        // Shift register, φ2-clocked modes
        match self.acr & 0x1C {
            0x08 => self.process_shift_in(hooks),
            0x18 => self.process_shift_out(hooks),
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // State capture
    // -----------------------------------------------------------------

    /// Side-effect-free register image for debugger peeks.
    pub fn peek8(&self, offset: u16) -> u8 {
        match offset & 0x0F {
            REG_IORB => self.input_port_b(),
            REG_IORA | REG_IORANH => self.input_port_a(),
            REG_DDRB => self.ddrb,
            REG_DDRA => self.ddra,
            REG_T1CL => (self.timer1 & 0xFF) as u8,
            REG_T1CH => ((self.timer1 >> 8) & 0xFF) as u8,
            REG_T1LL => (self.latch1 & 0xFF) as u8,
            REG_T1LH => (self.latch1 >> 8) as u8,
            REG_T2CL => (self.timer2 & 0xFF) as u8,
            REG_T2CH => ((self.timer2 >> 8) & 0xFF) as u8,
            REG_SR => self.sr,
            REG_ACR => self.acr,
            REG_PCR => self.pcr,
            REG_IFR => self.ifr,
            REG_IER => self.ier | 0x80,
            _ => unreachable!(),
        }
    }

    pub fn snapshot(&self) -> ViaState {
        ViaState {
            ifr: self.ifr,
            ier: self.ier,
            pcr: self.pcr,
            acr: self.acr,
            ira: self.ira,
            ora: self.ora,
            ddra: self.ddra,
            irb: self.irb,
            orb: self.orb,
            ddrb: self.ddrb,
            sr: self.sr,
            port_a: self.port_a,
            port_b: self.port_b,
            ca1_in: self.ca1_in,
            ca2_in: self.ca2_in,
            ca2_out: self.ca2_out,
            ca2_timer: self.ca2_timer,
            cb1_in: self.cb1_in,
            cb1_out: self.cb1_out,
            cb2_in: self.cb2_in,
            cb2_out: self.cb2_out,
            previous_pb6: self.previous_pb6,
            latch1: self.latch1,
            latch2: self.latch2,
            timer1: self.timer1,
            timer2: self.timer2,
            shift_tick: self.shift_tick,
            shift_counter: self.shift_counter,
            shift_started: self.shift_started,
            timer1_initialized: self.timer1_initialized,
            timer1_enable: self.timer1_enable,
            timer2_initialized: self.timer2_initialized,
            timer2_enable: self.timer2_enable,
            current_clock: self.current_clock,
        }
    }

    pub fn restore(&mut self, state: &ViaState) {
        self.ifr = state.ifr;
        self.ier = state.ier;
        self.pcr = state.pcr;
        self.acr = state.acr;
        self.ira = state.ira;
        self.ora = state.ora;
        self.ddra = state.ddra;
        self.irb = state.irb;
        self.orb = state.orb;
        self.ddrb = state.ddrb;
        self.sr = state.sr;
        self.port_a = state.port_a;
        self.port_b = state.port_b;
        self.ca1_in = state.ca1_in;
        self.ca2_in = state.ca2_in;
        self.ca2_out = state.ca2_out;
        self.ca2_timer = state.ca2_timer;
        self.cb1_in = state.cb1_in;
        self.cb1_out = state.cb1_out;
        self.cb2_in = state.cb2_in;
        self.cb2_out = state.cb2_out;
        self.previous_pb6 = state.previous_pb6;
        self.latch1 = state.latch1;
        self.latch2 = state.latch2;
        self.timer1 = state.timer1;
        self.timer2 = state.timer2;
        self.shift_tick = state.shift_tick;
        self.shift_counter = state.shift_counter;
        self.shift_started = state.shift_started;
        self.timer1_initialized = state.timer1_initialized;
        self.timer1_enable = state.timer1_enable;
        self.timer2_initialized = state.timer2_initialized;
        self.timer2_enable = state.timer2_enable;
        self.current_clock = state.current_clock;
    }
}
