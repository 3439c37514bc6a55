pub mod computer;
pub mod jr100;
pub mod program;
pub mod registry;
pub mod snapshot;

pub use computer::{GamepadSource, GamepadState, Jr100Computer, RunningStatus};
pub use jr100::Jr100Hardware;
pub use program::{AddressRegion, ProgramInfo, ProgramLoadError};
pub use snapshot::{Snapshot, SnapshotError};
