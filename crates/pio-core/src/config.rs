//! Host-supplied emulator configuration.

use std::time::Duration;

/// Default upper bound on one sleep slice of a blocking wait.
pub const DEFAULT_WAIT_POLL_INTERVAL_US: u64 = 1_000;

/// Default nominal system clock frequency.
pub const DEFAULT_MASTER_CLOCK_HZ: u32 = 125_000_000;

/// Configuration for an [`crate::Emulator`] instance.
///
/// Survives a full emulator reset.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EmulatorConfig {
    /// Emits a `trace` log record per executed instruction.
    pub trace_instructions: bool,
    /// Longest sleep between two checks of a blocking wait, in microseconds.
    pub wait_poll_interval_us: u64,
    /// Nominal master clock frequency, published as `MASTERCLK_FREQ`.
    pub master_clock_hz: u32,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            trace_instructions: false,
            wait_poll_interval_us: DEFAULT_WAIT_POLL_INTERVAL_US,
            master_clock_hz: DEFAULT_MASTER_CLOCK_HZ,
        }
    }
}

impl EmulatorConfig {
    /// Poll interval as a [`Duration`], never shorter than one microsecond.
    #[must_use]
    pub const fn wait_poll_interval(&self) -> Duration {
        let micros = if self.wait_poll_interval_us == 0 {
            1
        } else {
            self.wait_poll_interval_us
        };
        Duration::from_micros(micros)
    }
}
