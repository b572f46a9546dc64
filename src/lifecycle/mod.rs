//! Process lifecycle helpers

mod shutdown;
mod startup;

pub use shutdown::ShutdownSignal;
pub use startup::cover_displays;
