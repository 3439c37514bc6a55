//! Machine registry for automatic front-end discovery.
//!
//! Machine variants self-register via [`inventory::submit!`] with a
//! [`MachineEntry`] containing a CLI name and a factory function, so the
//! front-end discovers available machines at runtime without a central
//! list.

use jr100_core::core::machine::Machine;

use crate::computer::Jr100Computer;
use crate::program::ProgramLoadError;

/// Describes a front-end-capable machine variant.
pub struct MachineEntry {
    /// CLI name used to select this machine (e.g., "jr100").
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Factory: construct a Machine from a BASIC ROM image.
    pub create: fn(&[u8]) -> Result<Box<dyn Machine>, ProgramLoadError>,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        create: fn(&[u8]) -> Result<Box<dyn Machine>, ProgramLoadError>,
    ) -> Self {
        Self {
            name,
            description,
            create,
        }
    }
}

inventory::collect!(MachineEntry);

/// Return all registered machine variants, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|entry| entry.name);
    entries
}

/// Look up a machine variant by its CLI name.
pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|entry| entry.name == name)
}

fn create_jr100(rom: &[u8]) -> Result<Box<dyn Machine>, ProgramLoadError> {
    let mut computer = Jr100Computer::with_rom(rom, false)?;
    computer.power_on();
    Ok(Box::new(computer))
}

fn create_jr100_ext(rom: &[u8]) -> Result<Box<dyn Machine>, ProgramLoadError> {
    let mut computer = Jr100Computer::with_rom(rom, true)?;
    computer.power_on();
    Ok(Box::new(computer))
}

inventory::submit! {
    MachineEntry::new("jr100", "JR-100 (16 KiB RAM)", create_jr100)
}

inventory::submit! {
    MachineEntry::new("jr100-ext", "JR-100 (32 KiB RAM)", create_jr100_ext)
}
