use thiserror::Error;

/// Errors reported by the emulator's host-facing operations.
///
/// Stalls and wait timeouts are normal execution outcomes and never surface
/// here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PioError {
    /// Address does not belong to any known register.
    #[error("no register at address {address:#010x}")]
    InvalidAddress {
        /// Rejected address.
        address: u32,
    },
    /// A configuration write was rejected; the register keeps its old value.
    #[error("invalid value for {register}: {reason}")]
    InvalidConfig {
        /// Label of the register that rejected the write.
        register: String,
        /// Human-readable rejection reason.
        reason: &'static str,
    },
    /// Program hex-dump text could not be parsed.
    #[error("program line {line}: {reason}")]
    ProgramParse {
        /// 1-indexed source line.
        line: usize,
        /// Parse failure description.
        reason: String,
    },
    /// Program does not fit into the 32-word instruction memory.
    #[error("program of {len} words exceeds the 32-word instruction memory")]
    ProgramTooLarge {
        /// Number of words in the rejected program.
        len: usize,
    },
    /// Host API called with an index outside the modelled hardware.
    #[error("{what} index {index} out of range")]
    IndexOutOfRange {
        /// Kind of index (`"pio"`, `"sm"`, `"gpio"`).
        what: &'static str,
        /// Rejected index.
        index: usize,
    },
    /// A blocking wait was cancelled by its owner.
    #[error("wait on {address:#010x} cancelled")]
    WaitCancelled {
        /// Address that was being polled.
        address: u32,
    },
}

impl PioError {
    /// Returns `true` when the error is an unknown-address rejection.
    #[must_use]
    pub const fn is_invalid_address(&self) -> bool {
        matches!(self, Self::InvalidAddress { .. })
    }
}

/// Convenience alias for results carrying a [`PioError`].
pub type PioResult<T> = Result<T, PioError>;
