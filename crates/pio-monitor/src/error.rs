//! Errors reported back to the monitor prompt.

use std::path::PathBuf;

use pio_core::PioError;
use thiserror::Error;

/// Failure of a single monitor command. None of these end the session.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The first word of the line is not a command.
    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(String),
    /// A required argument was not given.
    #[error("`{command}` needs a {argument} argument")]
    MissingArgument {
        /// Command being parsed.
        command: &'static str,
        /// Name of the missing argument.
        argument: &'static str,
    },
    /// More arguments than the command accepts.
    #[error("`{command}` takes at most {max} arguments")]
    TooManyArguments {
        /// Command being parsed.
        command: &'static str,
        /// Accepted argument count.
        max: usize,
    },
    /// An argument is not a valid number for its position.
    #[error("invalid {argument} `{text}`")]
    InvalidNumber {
        /// Name of the argument.
        argument: &'static str,
        /// Text as typed.
        text: String,
    },
    /// Reading or writing a program file failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The emulator rejected the operation.
    #[error(transparent)]
    Emulator(#[from] PioError),
}
