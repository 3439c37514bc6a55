pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{InputButton, Machine};
    pub use crate::core::{Bus, InterruptState};
    pub use crate::cpu::mb8861::Mb8861;
    pub use crate::device::via6522::{Via6522, ViaHooks};
}
