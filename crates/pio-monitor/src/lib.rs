//! Line-oriented monitor for the PIO emulator.
//!
//! A thin shell: commands are parsed into [`Command`] and each maps onto one
//! `pio_core` register, stepping or program operation.

use env_logger as _;
#[cfg(test)]
use tempfile as _;

/// Command grammar.
pub mod command;
pub use command::{Command, DEFAULT_WAIT_MILLIS, HELP_TEXT};

/// Command errors.
pub mod error;
pub use error::MonitorError;

/// Command execution.
pub mod monitor;
pub use monitor::{Monitor, Outcome};
