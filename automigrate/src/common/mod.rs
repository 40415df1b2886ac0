//! Shared building blocks: lock registry, event bus, atomic helpers and constants.

mod constants;
mod event_bus;
mod lock;
mod util;

pub use constants::*;
pub use event_bus::*;
pub use lock::*;
pub use util::*;
