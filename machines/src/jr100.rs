//! JR-100 board: memory map, devices, and VIA wiring.
//!
//! The address space is dispatched through a precomputed per-address slot
//! table, so the hot path is a single indexed load plus a jump. Ranges
//! mapped later overwrite earlier ones byte-by-byte.

use jr100_core::core::{Bus, InterruptState};
use jr100_core::device::beeper::Beeper;
use jr100_core::device::display::{self, CharacterDisplay};
use jr100_core::device::keyboard::Keyboard;
use jr100_core::device::via6522::{Via6522, ViaHooks};

use crate::program::ProgramLoadError;

pub const MAIN_RAM_STANDARD: usize = 0x4000;
pub const MAIN_RAM_EXTENDED: usize = 0x8000;
pub const USER_CHAR_START: u16 = 0xC000;
pub const USER_CHAR_LENGTH: usize = 0x0100;
pub const VIDEO_RAM_START: u16 = 0xC100;
pub const VIDEO_RAM_LENGTH: usize = 0x0300;
pub const VIA_START: u16 = 0xC800;
pub const EXT_IO_START: u16 = 0xCC00;
pub const EXT_IO_LENGTH: usize = 0x0400;
/// Offset of the gamepad status latch inside the extended I/O window.
pub const EXT_IO_GAMEPAD_OFFSET: u16 = 0x02;
pub const BASIC_ROM_START: u16 = 0xE000;
pub const BASIC_ROM_LENGTH: usize = 0x2000;
/// Floating-bus cell; BASIC reads 0xAA here to detect the machine.
pub const UNMAPPED_QUIRK_ADDR: u16 = 0xD000;

/// Timer-1 reference frequency used for the beeper pitch. The odd value
/// comes from the crystal, not the nominal CPU clock.
pub const SOUND_REFERENCE_HZ: f64 = 894_886.25;

/// Gamepad status bits in the extended I/O latch.
pub const GAMEPAD_RIGHT: u8 = 0x01;
pub const GAMEPAD_LEFT: u8 = 0x02;
pub const GAMEPAD_UP: u8 = 0x04;
pub const GAMEPAD_DOWN: u8 = 0x08;
pub const GAMEPAD_SWITCH: u8 = 0x10;

/// Owner of one byte of the address space.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Slot {
    Hole,
    Ram,
    UserChars,
    VideoRam,
    Via,
    ExtIo,
    Rom,
}

pub struct Jr100Hardware {
    page: Box<[Slot; 0x10000]>,
    main_ram: Vec<u8>,
    user_chars: [u8; USER_CHAR_LENGTH],
    video_ram: [u8; VIDEO_RAM_LENGTH],
    rom: [u8; BASIC_ROM_LENGTH],
    gamepad_status: u8,

    pub via: Via6522,
    pub display: CharacterDisplay,
    pub keyboard: Keyboard,
    pub sound: Beeper,

    clock_count: u64,
    irq_line: bool,
    cpu_clock_frequency: f64,
    /// Host nanoseconds at power-on; sound events are stamped relative to it.
    base_time: u64,
    /// Last frequency pushed to the beeper, to dedupe T1CH rewrites.
    previous_frequency: f64,
    extended_ram: bool,
}

impl Jr100Hardware {
    pub fn new(extended_ram: bool, cpu_clock_frequency: f64) -> Self {
        let ram_len = if extended_ram {
            MAIN_RAM_EXTENDED
        } else {
            MAIN_RAM_STANDARD
        };

        let mut page = Box::new([Slot::Hole; 0x10000]);
        map_range(&mut page, 0x0000, ram_len as u32 - 1, Slot::Ram);
        map_range(
            &mut page,
            USER_CHAR_START as u32,
            USER_CHAR_START as u32 + USER_CHAR_LENGTH as u32 - 1,
            Slot::UserChars,
        );
        map_range(
            &mut page,
            VIDEO_RAM_START as u32,
            VIDEO_RAM_START as u32 + VIDEO_RAM_LENGTH as u32 - 1,
            Slot::VideoRam,
        );
        map_range(&mut page, VIA_START as u32, VIA_START as u32 + 0x0F, Slot::Via);
        map_range(
            &mut page,
            EXT_IO_START as u32,
            EXT_IO_START as u32 + EXT_IO_LENGTH as u32 - 1,
            Slot::ExtIo,
        );
        map_range(
            &mut page,
            BASIC_ROM_START as u32,
            BASIC_ROM_START as u32 + BASIC_ROM_LENGTH as u32 - 1,
            Slot::Rom,
        );

        Self {
            page,
            main_ram: vec![0; ram_len],
            user_chars: [0; USER_CHAR_LENGTH],
            video_ram: [0; VIDEO_RAM_LENGTH],
            rom: [0; BASIC_ROM_LENGTH],
            gamepad_status: 0,
            via: Via6522::new(),
            display: CharacterDisplay::new(),
            keyboard: Keyboard::new(),
            sound: Beeper::new(),
            clock_count: 0,
            irq_line: false,
            cpu_clock_frequency,
            base_time: 0,
            previous_frequency: 0.0,
            extended_ram,
        }
    }

    pub fn has_extended_ram(&self) -> bool {
        self.extended_ram
    }

    pub fn irq_line(&self) -> bool {
        self.irq_line
    }

    pub fn base_time(&self) -> u64 {
        self.base_time
    }

    pub fn set_base_time(&mut self, base_time: u64) {
        self.base_time = base_time;
    }

    pub fn cpu_clock_frequency(&self) -> f64 {
        self.cpu_clock_frequency
    }

    pub fn gamepad_status(&self) -> u8 {
        self.gamepad_status
    }

    /// Pack the five gamepad lines into the extended I/O latch.
    pub fn set_gamepad_state(&mut self, left: bool, right: bool, up: bool, down: bool, switch: bool) {
        let mut status = 0;
        if right {
            status |= GAMEPAD_RIGHT;
        }
        if left {
            status |= GAMEPAD_LEFT;
        }
        if up {
            status |= GAMEPAD_UP;
        }
        if down {
            status |= GAMEPAD_DOWN;
        }
        if switch {
            status |= GAMEPAD_SWITCH;
        }
        self.gamepad_status = status;
    }

    /// Load the BASIC ROM from a PROG v1 container and rebuild the
    /// character generator from the font image at its head.
    pub fn load_rom(&mut self, data: &[u8]) -> Result<(), ProgramLoadError> {
        if data.len() < 4 || &data[0..4] != b"PROG" {
            return Err(ProgramLoadError::InvalidMagic);
        }
        let read_u32 = |offset: usize| -> Result<u32, ProgramLoadError> {
            let bytes = data
                .get(offset..offset + 4)
                .ok_or(ProgramLoadError::UnexpectedEof)?;
            Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        };
        // Skip the version word: v1 ROM dumps are the only shape in the wild.
        let name_length = read_u32(8)? as usize;
        let mut offset = 12 + name_length;
        let _start = read_u32(offset)?;
        let length = read_u32(offset + 4)? as usize;
        offset += 12; // start, length, reserved flag
        let payload = data
            .get(offset..offset + length)
            .ok_or(ProgramLoadError::UnexpectedEof)?;
        let copy_len = payload.len().min(self.rom.len());
        self.rom[..copy_len].copy_from_slice(&payload[..copy_len]);
        self.display
            .load_character_rom(&self.rom[..256 * display::PPC]);
        Ok(())
    }

    /// Raw ROM image (font source at its head).
    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    /// Run device catch-up: the VIA chases the clock that the CPU advanced.
    pub fn execute_devices(&mut self) {
        let Self {
            via,
            display,
            keyboard,
            sound,
            irq_line,
            previous_frequency,
            cpu_clock_frequency,
            base_time,
            clock_count,
            ..
        } = self;
        let mut hooks = Jr100ViaHooks {
            display,
            keyboard,
            sound,
            irq_line,
            previous_frequency,
            cpu_clock_frequency: *cpu_clock_frequency,
            base_time: *base_time,
        };
        via.execute(*clock_count, &mut hooks);
    }

    pub fn reset_devices(&mut self) {
        self.via.reset();
        self.irq_line = false;
        self.previous_frequency = 0.0;
    }

    /// Recompute the IRQ mirror from the VIA (used after state restore).
    pub fn sync_irq_line(&mut self) {
        self.irq_line = self.via.irq_asserted();
    }

    // -----------------------------------------------------------------
    // Side-effect-free access for snapshots and debuggers
    // -----------------------------------------------------------------

    pub fn peek8(&self, addr: u16) -> u8 {
        match self.page[addr as usize] {
            Slot::Ram => self.main_ram[addr as usize],
            Slot::UserChars => self.user_chars[(addr - USER_CHAR_START) as usize],
            Slot::VideoRam => self.video_ram[(addr - VIDEO_RAM_START) as usize],
            Slot::Via => self.via.peek8(addr - VIA_START),
            Slot::ExtIo => {
                if addr == EXT_IO_START + EXT_IO_GAMEPAD_OFFSET {
                    self.gamepad_status
                } else {
                    0x00
                }
            }
            Slot::Rom => self.rom[(addr - BASIC_ROM_START) as usize],
            Slot::Hole => {
                if addr == UNMAPPED_QUIRK_ADDR {
                    0xAA
                } else {
                    0x00
                }
            }
        }
    }

    /// Restore one byte without device side effects. VIA and ROM bytes are
    /// skipped; their state is restored separately.
    pub fn poke8(&mut self, addr: u16, value: u8) {
        match self.page[addr as usize] {
            Slot::Ram => self.main_ram[addr as usize] = value,
            Slot::UserChars => {
                let index = (addr - USER_CHAR_START) as usize;
                self.user_chars[index] = value;
                self.display.update_font(index / 8, index % 8, value);
            }
            Slot::VideoRam => {
                let index = (addr - VIDEO_RAM_START) as usize;
                self.video_ram[index] = value;
                self.display.write_video_ram(index, value);
            }
            Slot::ExtIo => {
                if addr == EXT_IO_START + EXT_IO_GAMEPAD_OFFSET {
                    self.gamepad_status = value;
                }
            }
            Slot::Via | Slot::Rom | Slot::Hole => {}
        }
    }
}

impl Bus for Jr100Hardware {
    fn load8(&mut self, addr: u16) -> u8 {
        match self.page[addr as usize] {
            Slot::Ram => self.main_ram[addr as usize],
            Slot::UserChars => self.user_chars[(addr - USER_CHAR_START) as usize],
            Slot::VideoRam => self.video_ram[(addr - VIDEO_RAM_START) as usize],
            Slot::Via => {
                let Self {
                    via,
                    display,
                    keyboard,
                    sound,
                    irq_line,
                    previous_frequency,
                    cpu_clock_frequency,
                    base_time,
                    clock_count,
                    ..
                } = self;
                let mut hooks = Jr100ViaHooks {
                    display,
                    keyboard,
                    sound,
                    irq_line,
                    previous_frequency,
                    cpu_clock_frequency: *cpu_clock_frequency,
                    base_time: *base_time,
                };
                via.load8(addr - VIA_START, *clock_count, &mut hooks)
            }
            Slot::ExtIo => {
                if addr == EXT_IO_START + EXT_IO_GAMEPAD_OFFSET {
                    self.gamepad_status
                } else {
                    0x00
                }
            }
            Slot::Rom => self.rom[(addr - BASIC_ROM_START) as usize],
            Slot::Hole => {
                if addr == UNMAPPED_QUIRK_ADDR {
                    0xAA
                } else {
                    0x00
                }
            }
        }
    }

    fn store8(&mut self, addr: u16, value: u8) {
        match self.page[addr as usize] {
            Slot::Ram => self.main_ram[addr as usize] = value,
            Slot::UserChars => {
                let index = (addr - USER_CHAR_START) as usize;
                self.user_chars[index] = value;
                self.display.update_font(index / 8, index % 8, value);
            }
            Slot::VideoRam => {
                let index = (addr - VIDEO_RAM_START) as usize;
                self.video_ram[index] = value;
                self.display.write_video_ram(index, value);
            }
            Slot::Via => {
                let Self {
                    via,
                    display,
                    keyboard,
                    sound,
                    irq_line,
                    previous_frequency,
                    cpu_clock_frequency,
                    base_time,
                    clock_count,
                    ..
                } = self;
                let mut hooks = Jr100ViaHooks {
                    display,
                    keyboard,
                    sound,
                    irq_line,
                    previous_frequency,
                    cpu_clock_frequency: *cpu_clock_frequency,
                    base_time: *base_time,
                };
                via.store8(addr - VIA_START, value, *clock_count, &mut hooks);
            }
            Slot::ExtIo => {
                if addr == EXT_IO_START + EXT_IO_GAMEPAD_OFFSET {
                    self.gamepad_status = value;
                }
            }
            // ROM writes and unmapped stores are silently dropped.
            Slot::Rom | Slot::Hole => {}
        }
    }

    fn clock(&self) -> u64 {
        self.clock_count
    }

    fn set_clock(&mut self, clock: u64) {
        self.clock_count = clock;
    }

    fn check_interrupts(&self) -> InterruptState {
        InterruptState {
            nmi: false,
            irq: self.irq_line,
        }
    }
}

fn map_range(page: &mut [Slot; 0x10000], start: u32, end: u32, slot: Slot) {
    for addr in start..=end.min(0xFFFF) {
        page[addr as usize] = slot;
    }
}

/// VIA-to-board wiring for the JR-100.
struct Jr100ViaHooks<'a> {
    display: &'a mut CharacterDisplay,
    keyboard: &'a Keyboard,
    sound: &'a mut Beeper,
    irq_line: &'a mut bool,
    previous_frequency: &'a mut f64,
    cpu_clock_frequency: f64,
    base_time: u64,
}

impl Jr100ViaHooks<'_> {
    /// Hardware jumper: input bit PB7 is mirrored onto PB6 so timer 2 can
    /// count timer 1's square wave.
    fn jumper_pb7_pb6(&mut self, via: &mut Via6522) {
        via.set_port_b(6, via.input_port_b_bit(7));
    }
}

impl ViaHooks for Jr100ViaHooks<'_> {
    /// PB5 selects the font plane.
    fn store_orb(&mut self, via: &mut Via6522) {
        if via.input_port_b() & 0x20 != 0 {
            self.display.set_current_font(display::FONT_USER_DEFINED);
        } else {
            self.display.set_current_font(display::FONT_NORMAL);
        }
        self.jumper_pb7_pb6(via);
    }

    /// ORA low nibble selects a keyboard row; the matrix is active low and
    /// inverted onto PB0-4.
    fn store_iora(&mut self, via: &mut Via6522) {
        let matrix = self.keyboard.matrix();
        let mut value = via.input_port_b() & 0xE0;
        let row = (via.ora() & 0x0F) as usize;
        if row < matrix.len() {
            value |= !matrix[row] & 0x1F;
        }
        via.set_port_b_value(value);
    }

    /// In square-wave mode (ACR 7-6 = 11) a T1 load sets the beeper pitch.
    ///
    /// This hook also runs on every free-run reload, so only transitions
    /// are recorded; otherwise the event history would grow by one entry
    /// per timer period.
    fn store_t1ch(&mut self, via: &mut Via6522) {
        if via.acr() & 0xC0 == 0xC0 {
            let divisor = via.timer1() + 2;
            if divisor <= 0 {
                return;
            }
            let frequency = SOUND_REFERENCE_HZ / divisor as f64 / 2.0;
            if (frequency - *self.previous_frequency).abs() < 1e-6 {
                if !self.sound.is_line_on() {
                    self.sound.set_line_on();
                }
                return;
            }
            *self.previous_frequency = frequency;
            let timestamp =
                (via.current_clock() as f64 * 1e9 / self.cpu_clock_frequency) as u64 + self.base_time;
            self.sound.set_frequency(timestamp, frequency);
            if !self.sound.is_line_on() {
                self.sound.set_line_on();
            }
        } else if self.sound.is_line_on() {
            self.sound.set_line_off();
        }
    }

    fn timer1_timeout_mode0(&mut self, _via: &mut Via6522) {
        self.sound.set_line_off();
    }

    fn timer1_timeout_mode2(&mut self, via: &mut Via6522) {
        self.jumper_pb7_pb6(via);
    }

    fn timer1_timeout_mode3(&mut self, via: &mut Via6522) {
        self.jumper_pb7_pb6(via);
    }

    fn handler_irq(&mut self, asserted: bool) {
        *self.irq_line = asserted;
    }
}
