//! Command-line grammar.
//!
//! One command per line, words separated by whitespace. Numbers are decimal
//! or `0x`/`0b` prefixed; `#` starts a comment.

use std::path::PathBuf;

use crate::error::MonitorError;

/// Wall-clock bound used by `wait` when none is given.
pub const DEFAULT_WAIT_MILLIS: u64 = 1000;

/// Help shown by the `help` command.
pub const HELP_TEXT: &str = "\
Commands:
  read <addr>                          read a register
  write <addr> <value>                 write a register
  set <addr> <bits>                    set bits
  clear <addr> <bits>                  clear bits
  xor <addr> <bits>                    toggle bits
  wait <addr> <value> [mask] [cycles] [ms]
                                       block until (reg & mask) == (value & mask)
  step [n]                             run n cycles (default 1)
  load <file> [pio] [origin]           load a program hex dump
  save <file> [pio]                    save instruction memory as a hex dump
  unload [pio]                         zero instruction memory
  label <addr>                         name the register at an address
  disasm [pio]                         disassemble instruction memory
  reset                                reset the whole emulator
  help                                 show this text
  quit                                 leave the monitor";

/// A parsed monitor command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read one register.
    Read {
        /// Register address.
        address: u32,
    },
    /// Write one register.
    Write {
        /// Register address.
        address: u32,
        /// Value written.
        value: u32,
    },
    /// Set the given bits, leaving the others alone.
    Set {
        /// Register address.
        address: u32,
        /// Bits to set.
        bits: u32,
    },
    /// Clear the given bits.
    Clear {
        /// Register address.
        address: u32,
        /// Bits to clear.
        bits: u32,
    },
    /// Toggle the given bits.
    Xor {
        /// Register address.
        address: u32,
        /// Bits to toggle.
        bits: u32,
    },
    /// Block until a register matches.
    Wait {
        /// Register address.
        address: u32,
        /// Expected value.
        value: u32,
        /// Bits compared.
        mask: u32,
        /// Cycle bound, 0 for none.
        cycles_timeout: u64,
        /// Wall-clock bound in milliseconds, 0 for none.
        millis_timeout: u64,
    },
    /// Run cycles.
    Step {
        /// Number of cycles.
        cycles: u64,
    },
    /// Load a program file.
    Load {
        /// Hex-dump file.
        path: PathBuf,
        /// Target PIO block.
        pio: usize,
        /// Load address; 0 when absent. The file's `.origin` is not consulted.
        origin: Option<u8>,
    },
    /// Save instruction memory.
    Save {
        /// Destination file.
        path: PathBuf,
        /// Source PIO block.
        pio: usize,
    },
    /// Zero instruction memory.
    Unload {
        /// Target PIO block.
        pio: usize,
    },
    /// Name the register at an address.
    Label {
        /// Register address.
        address: u32,
    },
    /// Disassemble instruction memory.
    Disasm {
        /// Source PIO block.
        pio: usize,
    },
    /// Reset the emulator.
    Reset,
    /// Show help.
    Help,
    /// Leave the monitor.
    Quit,
}

impl Command {
    /// Parses one line. Blank and comment-only lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] for unknown commands and bad or missing
    /// arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, MonitorError> {
        let line = line.split_once('#').map_or(line, |(code, _)| code);
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();
        let command = match name.to_ascii_lowercase().as_str() {
            "read" | "r" => {
                let args = Args::new("read", &args, 1)?;
                Self::Read {
                    address: args.number(0, "address")?,
                }
            }
            "write" | "w" => {
                let args = Args::new("write", &args, 2)?;
                Self::Write {
                    address: args.number(0, "address")?,
                    value: args.number(1, "value")?,
                }
            }
            "set" => {
                let args = Args::new("set", &args, 2)?;
                Self::Set {
                    address: args.number(0, "address")?,
                    bits: args.number(1, "bits")?,
                }
            }
            "clear" => {
                let args = Args::new("clear", &args, 2)?;
                Self::Clear {
                    address: args.number(0, "address")?,
                    bits: args.number(1, "bits")?,
                }
            }
            "xor" => {
                let args = Args::new("xor", &args, 2)?;
                Self::Xor {
                    address: args.number(0, "address")?,
                    bits: args.number(1, "bits")?,
                }
            }
            "wait" => {
                let args = Args::new("wait", &args, 5)?;
                Self::Wait {
                    address: args.number(0, "address")?,
                    value: args.number(1, "value")?,
                    mask: args.optional(2, "mask")?.unwrap_or(u32::MAX),
                    cycles_timeout: args.optional(3, "cycles")?.unwrap_or(0),
                    millis_timeout: args.optional(4, "ms")?.unwrap_or(DEFAULT_WAIT_MILLIS),
                }
            }
            "step" | "s" => {
                let args = Args::new("step", &args, 1)?;
                Self::Step {
                    cycles: args.optional(0, "cycles")?.unwrap_or(1),
                }
            }
            "load" => {
                let args = Args::new("load", &args, 3)?;
                Self::Load {
                    path: args.path(0)?,
                    pio: args.optional(1, "pio")?.unwrap_or(0),
                    origin: args.optional(2, "origin")?,
                }
            }
            "save" => {
                let args = Args::new("save", &args, 2)?;
                Self::Save {
                    path: args.path(0)?,
                    pio: args.optional(1, "pio")?.unwrap_or(0),
                }
            }
            "unload" => {
                let args = Args::new("unload", &args, 1)?;
                Self::Unload {
                    pio: args.optional(0, "pio")?.unwrap_or(0),
                }
            }
            "label" => {
                let args = Args::new("label", &args, 1)?;
                Self::Label {
                    address: args.number(0, "address")?,
                }
            }
            "disasm" | "d" => {
                let args = Args::new("disasm", &args, 1)?;
                Self::Disasm {
                    pio: args.optional(0, "pio")?.unwrap_or(0),
                }
            }
            "reset" => {
                Args::new("reset", &args, 0)?;
                Self::Reset
            }
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => return Err(MonitorError::UnknownCommand(name.to_string())),
        };
        Ok(Some(command))
    }
}

struct Args<'a> {
    command: &'static str,
    words: &'a [&'a str],
}

impl<'a> Args<'a> {
    fn new(
        command: &'static str,
        words: &'a [&'a str],
        max: usize,
    ) -> Result<Self, MonitorError> {
        if words.len() > max {
            return Err(MonitorError::TooManyArguments { command, max });
        }
        Ok(Self { command, words })
    }

    fn number<T: ParseNumber>(
        &self,
        index: usize,
        argument: &'static str,
    ) -> Result<T, MonitorError> {
        self.optional(index, argument)?.ok_or(MonitorError::MissingArgument {
            command: self.command,
            argument,
        })
    }

    fn optional<T: ParseNumber>(
        &self,
        index: usize,
        argument: &'static str,
    ) -> Result<Option<T>, MonitorError> {
        self.words
            .get(index)
            .map(|text| {
                T::parse_number(text).ok_or_else(|| MonitorError::InvalidNumber {
                    argument,
                    text: (*text).to_string(),
                })
            })
            .transpose()
    }

    fn path(&self, index: usize) -> Result<PathBuf, MonitorError> {
        self.words
            .get(index)
            .map(|word| PathBuf::from(*word))
            .ok_or(MonitorError::MissingArgument {
                command: self.command,
                argument: "file",
            })
    }
}

trait ParseNumber: Sized {
    fn from_radix(digits: &str, radix: u32) -> Option<Self>;

    fn parse_number(text: &str) -> Option<Self> {
        let digits = text.replace('_', "");
        let lower = digits.to_ascii_lowercase();
        if let Some(hex) = lower.strip_prefix("0x") {
            Self::from_radix(hex, 16)
        } else if let Some(bin) = lower.strip_prefix("0b") {
            Self::from_radix(bin, 2)
        } else {
            Self::from_radix(&lower, 10)
        }
    }
}

macro_rules! parse_number_impl {
    ($($ty:ty),*) => {
        $(impl ParseNumber for $ty {
            fn from_radix(digits: &str, radix: u32) -> Option<Self> {
                Self::from_str_radix(digits, radix).ok()
            }
        })*
    };
}

parse_number_impl!(u8, u32, u64, usize);

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line)
            .expect("line should parse")
            .expect("line should hold a command")
    }

    #[test]
    fn numbers_accept_hex_binary_and_decimal() {
        assert_eq!(
            parse("write 0x50200000 0b101"),
            Command::Write {
                address: 0x5020_0000,
                value: 5
            }
        );
        assert_eq!(parse("step 1_000"), Command::Step { cycles: 1000 });
        assert_eq!(parse("STEP"), Command::Step { cycles: 1 });
    }

    #[test]
    fn wait_fills_in_defaults() {
        assert_eq!(
            parse("wait 0x50204000 7"),
            Command::Wait {
                address: 0x5020_4000,
                value: 7,
                mask: u32::MAX,
                cycles_timeout: 0,
                millis_timeout: DEFAULT_WAIT_MILLIS,
            }
        );
        assert_eq!(
            parse("wait 0x50204000 7 0xff 100 0"),
            Command::Wait {
                address: 0x5020_4000,
                value: 7,
                mask: 0xff,
                cycles_timeout: 100,
                millis_timeout: 0,
            }
        );
    }

    #[test]
    fn load_takes_optional_pio_and_origin() {
        assert_eq!(
            parse("load blink.hex 1 8"),
            Command::Load {
                path: PathBuf::from("blink.hex"),
                pio: 1,
                origin: Some(8),
            }
        );
        assert_eq!(
            parse("load blink.hex"),
            Command::Load {
                path: PathBuf::from("blink.hex"),
                pio: 0,
                origin: None,
            }
        );
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(Command::parse("   ").expect("blank"), None);
        assert_eq!(Command::parse("# just a note").expect("comment"), None);
        assert_eq!(parse("reset # again"), Command::Reset);
    }

    #[test]
    fn rejects_unknown_command() {
        let error = Command::parse("frobnicate").expect_err("unknown command");
        assert!(matches!(error, MonitorError::UnknownCommand(name) if name == "frobnicate"));
    }

    #[test]
    fn rejects_missing_argument() {
        let error = Command::parse("write 0x50200000").expect_err("missing value");
        assert!(matches!(
            error,
            MonitorError::MissingArgument {
                command: "write",
                argument: "value"
            }
        ));
    }

    #[test]
    fn rejects_extra_arguments() {
        let error = Command::parse("reset now").expect_err("extra argument");
        assert!(matches!(error, MonitorError::TooManyArguments { command: "reset", max: 0 }));
    }

    #[test]
    fn rejects_out_of_range_origin() {
        let error = Command::parse("load a.hex 0 300").expect_err("origin beyond u8");
        assert!(error.to_string().contains("origin"));
    }
}
