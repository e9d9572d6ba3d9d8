//! Command execution against a shared emulator.

use std::fmt::Write as _;
use std::fs;

use pio_core::{
    AddressSpace, CancelToken, Emulator, EmulatorConfig, Program, SharedEmulator, WaitStatus,
};

use crate::command::{Command, HELP_TEXT};
use crate::error::MonitorError;

/// What the prompt should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this text.
    Print(String),
    /// Nothing to show.
    Done,
    /// End the session.
    Quit,
}

/// A monitor session. Every command maps onto one emulator operation.
#[derive(Debug, Clone, Default)]
pub struct Monitor {
    emulator: SharedEmulator,
}

impl Monitor {
    /// Creates a session over a fresh emulator.
    #[must_use]
    pub fn new(config: EmulatorConfig) -> Self {
        Self::with_emulator(SharedEmulator::with_config(config))
    }

    /// Creates a session over an emulator other threads may also drive.
    #[must_use]
    pub const fn with_emulator(emulator: SharedEmulator) -> Self {
        Self { emulator }
    }

    /// Emulator handle.
    #[must_use]
    pub const fn emulator(&self) -> &SharedEmulator {
        &self.emulator
    }

    /// Parses and runs one input line.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] when the line does not parse or the command
    /// fails.
    pub fn execute_line(&self, line: &str) -> Result<Outcome, MonitorError> {
        Command::parse(line)?.map_or(Ok(Outcome::Done), |command| self.execute(command))
    }

    /// Runs one command.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError`] for emulator rejections and file errors.
    pub fn execute(&self, command: Command) -> Result<Outcome, MonitorError> {
        log::debug!("monitor: {command:?}");
        match command {
            Command::Read { address } => {
                let value = self.emulator.read(address)?;
                Ok(Outcome::Print(self.show(address, value)))
            }
            Command::Write { address, value } => {
                self.emulator.write(address, value)?;
                Ok(Outcome::Done)
            }
            Command::Set { address, bits } => {
                self.emulator.write_masked(address, u32::MAX, bits)?;
                Ok(Outcome::Done)
            }
            Command::Clear { address, bits } => {
                self.emulator.write_masked(address, 0, bits)?;
                Ok(Outcome::Done)
            }
            Command::Xor { address, bits } => {
                self.emulator.with(|emulator| {
                    let current = emulator.peek(address)?;
                    emulator.write_masked(address, !current, bits)
                })?;
                Ok(Outcome::Done)
            }
            Command::Wait {
                address,
                value,
                mask,
                cycles_timeout,
                millis_timeout,
            } => {
                let outcome = self.emulator.wait_with_cancel(
                    address,
                    value,
                    mask,
                    cycles_timeout,
                    millis_timeout,
                    &CancelToken::new(),
                )?;
                let status = match outcome.status {
                    WaitStatus::Matched => "matched",
                    WaitStatus::TimedOut => "timed out",
                };
                Ok(Outcome::Print(format!(
                    "{} ({status})",
                    self.show(address, outcome.value)
                )))
            }
            Command::Step { cycles } => {
                let cycle = self.emulator.with(|emulator| {
                    emulator.step(cycles);
                    emulator.cycle_count()
                });
                Ok(Outcome::Print(format!("cycle {cycle}")))
            }
            Command::Load { path, pio, origin } => {
                let text = fs::read_to_string(&path).map_err(|source| MonitorError::Io {
                    path: path.clone(),
                    source,
                })?;
                let program = Program::parse(&text)?;
                let placed = self
                    .emulator
                    .with(|emulator| emulator.load_program(pio, &program, origin))?;
                Ok(Outcome::Print(format!(
                    "loaded {} words into PIO{pio} at {placed}",
                    program.code().len()
                )))
            }
            Command::Save { path, pio } => {
                let program = self
                    .emulator
                    .with(|emulator| emulator.pio(pio).map(|block| block.memory().snapshot()))?;
                fs::write(&path, program.to_hex_dump())
                    .map_err(|source| MonitorError::Io { path, source })?;
                Ok(Outcome::Done)
            }
            Command::Unload { pio } => {
                self.emulator.with(|emulator| emulator.unload(pio))?;
                Ok(Outcome::Done)
            }
            Command::Label { address } => {
                Ok(Outcome::Print(self.emulator.label_for_address(address)))
            }
            Command::Disasm { pio } => {
                let listing = self.emulator.with(|emulator| disassemble(emulator, pio))?;
                Ok(Outcome::Print(listing))
            }
            Command::Reset => {
                self.emulator.reset();
                Ok(Outcome::Done)
            }
            Command::Help => Ok(Outcome::Print(HELP_TEXT.to_string())),
            Command::Quit => Ok(Outcome::Quit),
        }
    }

    fn show(&self, address: u32, value: u32) -> String {
        format!(
            "{} = {value:#010x}",
            self.emulator.label_for_address(address)
        )
    }
}

/// Lists instruction memory decoded with SM0's side-set configuration,
/// marking SM0's program counter and wrap bounds.
fn disassemble(emulator: &Emulator, pio: usize) -> Result<String, MonitorError> {
    let block = emulator.pio(pio)?;
    let sm = block.sm(0)?;
    let exec = sm.exec_ctrl();
    let pc = sm.core().pc;
    let mut out = String::new();
    for (address, &opcode) in block.memory().words().iter().enumerate() {
        let address = u8::try_from(address).unwrap_or(u8::MAX);
        let marker = if address == pc { '>' } else { ' ' };
        let wrap = if address == exec.wrap_bottom && address == exec.wrap_top {
            "  ; wrap_target, wrap"
        } else if address == exec.wrap_bottom {
            "  ; wrap_target"
        } else if address == exec.wrap_top {
            "  ; wrap"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{marker}{address:2}: {opcode:04x}  {}{wrap}",
            sm.decode(opcode)
        );
    }
    out.pop();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pio_core::PIO0_BASE;

    #[test]
    fn read_prints_label_and_value() {
        let monitor = Monitor::default();
        let outcome = monitor.execute_line("read 0x50200044").expect("read");
        assert_eq!(outcome, Outcome::Print("PIO0_DBG_CFGINFO = 0x00200404".to_string()));
    }

    #[test]
    fn bit_commands_edit_in_place() {
        let monitor = Monitor::default();
        let x = PIO0_BASE + 0x4000;
        monitor.execute_line(&format!("write {x} 0xf0")).expect("write");
        monitor.execute_line(&format!("set {x} 0x0f")).expect("set");
        assert_eq!(monitor.emulator().read(x), Ok(0xff));
        monitor.execute_line(&format!("clear {x} 0x11")).expect("clear");
        assert_eq!(monitor.emulator().read(x), Ok(0xee));
        monitor.execute_line(&format!("xor {x} 0x0f")).expect("xor");
        assert_eq!(monitor.emulator().read(x), Ok(0xe1));
    }

    #[test]
    fn step_reports_cycle_count() {
        let monitor = Monitor::default();
        assert_eq!(
            monitor.execute_line("step 3").expect("step"),
            Outcome::Print("cycle 3".to_string())
        );
    }

    #[test]
    fn invalid_address_is_reported_not_fatal() {
        let monitor = Monitor::default();
        let error = monitor.execute_line("read 0").expect_err("unmapped");
        assert!(matches!(error, MonitorError::Emulator(err) if err.is_invalid_address()));
        assert_eq!(monitor.execute_line("quit").expect("quit"), Outcome::Quit);
    }

    #[test]
    fn disasm_marks_pc_and_wrap() {
        let monitor = Monitor::default();
        monitor
            .execute_line(&format!("write {} 0xe021", PIO0_BASE + 0x048))
            .expect("instr mem");
        let Outcome::Print(listing) = monitor.execute_line("disasm").expect("disasm") else {
            panic!("disasm prints a listing");
        };
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 32);
        assert!(lines[0].starts_with("> 0: e021  set x, 1"));
        assert!(lines[0].ends_with("; wrap_target"));
        assert!(lines[31].ends_with("; wrap"));
    }

    #[test]
    fn wait_reports_match() {
        let monitor = Monitor::default();
        let outcome = monitor
            .execute_line(&format!("wait {} 0 0xffffffff 1 0", PIO0_BASE))
            .expect("wait");
        assert_eq!(outcome, Outcome::Print("PIO0_CTRL = 0x00000000 (matched)".to_string()));
    }
}
