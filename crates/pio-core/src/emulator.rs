//! Top-level emulator: both PIO blocks, the GPIO bank and the global
//! emulator registers behind one [`AddressSpace`].

#![allow(clippy::cast_possible_truncation)]

use crate::block::{BlockCycle, PioBlock};
use crate::config::EmulatorConfig;
use crate::error::{PioError, PioResult};
use crate::gpio::{GpioBank, PioOutputs};
use crate::program::Program;
use crate::registers::{AddressSpace, PicoEmuRegister, Register};

/// Number of PIO blocks.
pub const PIO_COUNT: usize = 2;

/// Emulated RP2040 PIO subsystem.
///
/// Cycles are driven explicitly: [`Emulator::trigger_cycle_phase0`] plans
/// the next cycle of every state machine against one snapshot, and
/// [`Emulator::trigger_cycle_phase1`] commits it, PIO0 before PIO1.
#[derive(Debug, Clone)]
pub struct Emulator {
    config: EmulatorConfig,
    pios: [PioBlock; PIO_COUNT],
    gpio: GpioBank,
    cycle: u64,
    phase0_count: u64,
    phase1_count: u64,
    pending: Option<[BlockCycle; PIO_COUNT]>,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new(EmulatorConfig::default())
    }
}

impl Emulator {
    /// Creates an emulator in its reset state.
    #[must_use]
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            pios: [PioBlock::new(0), PioBlock::new(1)],
            gpio: GpioBank::default(),
            cycle: 0,
            phase0_count: 0,
            phase1_count: 0,
            pending: None,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    /// PIO block `pio`.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `pio >= 2`.
    pub fn pio(&self, pio: usize) -> PioResult<&PioBlock> {
        self.pios
            .get(pio)
            .ok_or(PioError::IndexOutOfRange { what: "pio", index: pio })
    }

    /// Mutable PIO block `pio`.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `pio >= 2`.
    pub fn pio_mut(&mut self, pio: usize) -> PioResult<&mut PioBlock> {
        self.pios
            .get_mut(pio)
            .ok_or(PioError::IndexOutOfRange { what: "pio", index: pio })
    }

    /// GPIO bank.
    #[must_use]
    pub const fn gpio(&self) -> &GpioBank {
        &self.gpio
    }

    /// Mutable GPIO bank.
    pub fn gpio_mut(&mut self) -> &mut GpioBank {
        &mut self.gpio
    }

    /// Completed cycles since the last reset.
    #[must_use]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle
    }

    /// Number of phase-0 triggers since the last reset.
    #[must_use]
    pub const fn phase0_count(&self) -> u64 {
        self.phase0_count
    }

    /// Number of phase-1 triggers since the last reset.
    #[must_use]
    pub const fn phase1_count(&self) -> u64 {
        self.phase1_count
    }

    /// Returns `true` between a phase 0 and its phase 1.
    #[must_use]
    pub const fn has_pending_cycle(&self) -> bool {
        self.pending.is_some()
    }

    fn outputs(&self) -> [PioOutputs; PIO_COUNT] {
        [self.pios[0].outputs(), self.pios[1].outputs()]
    }

    /// Pin inputs every PIO block samples this cycle.
    #[must_use]
    pub fn pio_inputs(&self) -> u32 {
        self.gpio.pio_inputs(&self.outputs())
    }

    /// Phase 0: samples inputs and IRQ flags and plans the next cycle of all
    /// eight state machines. Nothing observable changes. Triggering phase 0
    /// again before phase 1 replaces the plan.
    pub fn trigger_cycle_phase0(&mut self) {
        let inputs = self.pio_inputs();
        let trace = self.config.trace_instructions;
        self.pending = Some([
            self.pios[0].plan_cycle(inputs, trace),
            self.pios[1].plan_cycle(inputs, trace),
        ]);
        self.phase0_count += 1;
    }

    /// Phase 1: commits the planned cycle, running phase 0 first when no
    /// plan is pending.
    pub fn trigger_cycle_phase1(&mut self) {
        if self.pending.is_none() {
            self.trigger_cycle_phase0();
        }
        if let Some(planned) = self.pending.take() {
            for (block, cycle) in self.pios.iter_mut().zip(&planned) {
                block.commit_cycle(cycle);
            }
        }
        self.phase1_count += 1;
        self.cycle += 1;
    }

    /// Runs `cycles` complete cycles.
    pub fn step(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.trigger_cycle_phase0();
            self.trigger_cycle_phase1();
        }
    }

    /// Full reset: memories, state machines, FIFOs, GPIO state and counters
    /// return to power-on values. The configuration is kept.
    pub fn reset(&mut self) {
        log::debug!("emulator reset after {} cycles", self.cycle);
        *self = Self::new(self.config.clone());
    }

    /// Loads `program` into PIO block `pio`; returns the load address.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `pio >= 2` and
    /// [`PioError::ProgramTooLarge`] for programs over 32 words.
    pub fn load_program(
        &mut self,
        pio: usize,
        program: &Program,
        origin: Option<u8>,
    ) -> PioResult<u8> {
        self.pio_mut(pio)?.load_program(program, origin)
    }

    /// Zeroes the instruction memory of PIO block `pio`.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `pio >= 2`.
    pub fn unload(&mut self, pio: usize) -> PioResult<()> {
        self.pio_mut(pio)?.unload();
        Ok(())
    }

    fn decode(address: u32) -> PioResult<Register> {
        Register::decode(address).ok_or(PioError::InvalidAddress { address })
    }

    const fn read_pico(&self, reg: PicoEmuRegister) -> u32 {
        match reg {
            PicoEmuRegister::WallclockLsb => self.cycle as u32,
            PicoEmuRegister::WallclockMsb => (self.cycle >> 32) as u32,
            PicoEmuRegister::MasterclkFreq => self.config.master_clock_hz,
            PicoEmuRegister::MasterclkTriggerPhase0 => self.phase0_count as u32,
            PicoEmuRegister::MasterclkTriggerPhase1 => self.phase1_count as u32,
            PicoEmuRegister::GpioExtLevels => self.gpio.ext_levels(),
            PicoEmuRegister::GpioExtDriven => self.gpio.ext_driven(),
            PicoEmuRegister::Reset => 0,
        }
    }

    fn write_pico(&mut self, reg: PicoEmuRegister, value: u32) {
        match reg {
            PicoEmuRegister::MasterclkTriggerPhase0 => self.trigger_cycle_phase0(),
            PicoEmuRegister::MasterclkTriggerPhase1 => self.trigger_cycle_phase1(),
            PicoEmuRegister::GpioExtLevels => self.gpio.set_ext_levels(value),
            PicoEmuRegister::GpioExtDriven => self.gpio.set_ext_driven(value),
            PicoEmuRegister::Reset => self.reset(),
            PicoEmuRegister::WallclockLsb
            | PicoEmuRegister::WallclockMsb
            | PicoEmuRegister::MasterclkFreq => {}
        }
    }

    fn peek_register(&self, reg: Register) -> PioResult<u32> {
        match reg {
            Register::Pio { pio, reg, .. } => self.pio(pio)?.peek(reg),
            Register::PioEmu { pio, reg } => self.pio(pio)?.read_emu(reg),
            Register::PicoEmu(reg) => Ok(self.read_pico(reg)),
            Register::IoBank0 { reg, .. } => Ok(self.gpio.read_io(reg, &self.outputs())),
            Register::PadsBank0 { reg, .. } => Ok(self.gpio.read_pad(reg)),
        }
    }

    fn write_register(&mut self, reg: Register, value: u32) -> PioResult<()> {
        match reg {
            Register::Pio { pio, reg: pio_reg, .. } => {
                let label = reg.label();
                self.pio_mut(pio)?.write(pio_reg, &label, value)
            }
            Register::PioEmu { pio, reg } => self.pio_mut(pio)?.write_emu(reg, value),
            Register::PicoEmu(reg) => {
                self.write_pico(reg, value);
                Ok(())
            }
            Register::IoBank0 { reg, .. } => {
                self.gpio.write_io(reg, value);
                Ok(())
            }
            Register::PadsBank0 { reg, .. } => {
                self.gpio.write_pad(reg, value);
                Ok(())
            }
        }
    }

    fn base_of(&self, reg: Register) -> PioResult<u32> {
        match reg {
            Register::Pio { pio, reg, .. } => self.pio(pio)?.masked_write_base(reg),
            Register::PioEmu { pio, reg } => self.pio(pio)?.masked_write_base_emu(reg),
            Register::PicoEmu(
                PicoEmuRegister::MasterclkTriggerPhase0
                | PicoEmuRegister::MasterclkTriggerPhase1
                | PicoEmuRegister::Reset,
            ) => Ok(0),
            other => self.peek_register(other),
        }
    }
}

impl AddressSpace for Emulator {
    fn read(&mut self, address: u32) -> PioResult<u32> {
        match Self::decode(address)? {
            Register::Pio { pio, reg, .. } => self.pio_mut(pio)?.read(reg),
            other => self.peek_register(other),
        }
    }

    fn peek(&self, address: u32) -> PioResult<u32> {
        self.peek_register(Self::decode(address)?)
    }

    fn write(&mut self, address: u32, value: u32) -> PioResult<()> {
        let reg = Self::decode(address)?;
        let canonical = reg.canonical();
        let base = self.base_of(canonical)?;
        let (value, mask) = reg.alias().masked_write(value, base);
        self.write_register(canonical, (base & !mask) | (value & mask))
    }

    fn masked_write_base(&self, address: u32) -> PioResult<u32> {
        self.base_of(Self::decode(address)?.canonical())
    }

    fn provides_address(&self, address: u32) -> bool {
        Register::decode(address).is_some()
    }

    fn label_for_address(&self, address: u32) -> String {
        Register::decode(address).map_or_else(|| format!("{address:#010x}"), Register::label)
    }

    fn write_masked(&mut self, address: u32, value: u32, mask: u32) -> PioResult<()> {
        let canonical = Self::decode(address)?.canonical();
        let base = self.base_of(canonical)?;
        self.write_register(canonical, (base & !mask) | (value & mask))
    }
}
