//! One PIO block: shared instruction memory, four state machines and the
//! block-wide registers (IRQ flags, interrupt groups, FIFO status, pin
//! latches).

#![allow(clippy::cast_possible_truncation)]

use crate::error::{PioError, PioResult};
use crate::fifo::FifoDirection;
use crate::gpio::PioOutputs;
use crate::memory::InstructionMemory;
use crate::program::Program;
use crate::registers::{PioEmuRegister, PioRegister, SmEmuField, SmField};
use crate::sm::{CycleContext, SmCycle, StateMachine, SM_COUNT};

/// `DBG_CFGINFO`: 32 instructions, 4 state machines, FIFO depth 4.
pub const DBG_CFGINFO: u32 = 0x0020_0404;

const CTRL_SM_ENABLE_MASK: u32 = 0xf;
const CTRL_SM_RESTART_LSB: u32 = 4;
const CTRL_CLKDIV_RESTART_LSB: u32 = 8;

const FDEBUG_TXSTALL_LSB: u32 = 24;
const FDEBUG_TXOVER_LSB: u32 = 16;
const FDEBUG_RXUNDER_LSB: u32 = 8;
const FDEBUG_RXSTALL_LSB: u32 = 0;
const FDEBUG_MASK: u32 = 0x0f0f_0f0f;

const FORCED_PENDING_BIT: u32 = 16;

/// Planned effects of one cycle for all four state machines of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCycle {
    sms: [SmCycle; SM_COUNT],
}

impl BlockCycle {
    /// Planned cycle of state machine `sm`.
    #[must_use]
    pub fn sm(&self, sm: usize) -> Option<&SmCycle> {
        self.sms.get(sm)
    }
}

/// A PIO block.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PioBlock {
    index: usize,
    memory: InstructionMemory,
    sms: [StateMachine; SM_COUNT],
    enabled: u8,
    irq: u8,
    fdebug: u32,
    inte: [u32; 2],
    intf: [u32; 2],
    input_sync_bypass: u32,
    pin_values: u32,
    pin_dirs: u32,
}

impl PioBlock {
    /// Creates block `index` in its reset state.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            memory: InstructionMemory::default(),
            sms: Default::default(),
            enabled: 0,
            irq: 0,
            fdebug: 0,
            inte: [0; 2],
            intf: [0; 2],
            input_sync_bypass: 0,
            pin_values: 0,
            pin_dirs: 0,
        }
    }

    /// Block index (0 or 1).
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Shared instruction memory.
    #[must_use]
    pub const fn memory(&self) -> &InstructionMemory {
        &self.memory
    }

    /// State machine `sm`.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `sm >= 4`.
    pub fn sm(&self, sm: usize) -> PioResult<&StateMachine> {
        self.sms
            .get(sm)
            .ok_or(PioError::IndexOutOfRange { what: "sm", index: sm })
    }

    /// Mutable state machine `sm`.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `sm >= 4`.
    pub fn sm_mut(&mut self, sm: usize) -> PioResult<&mut StateMachine> {
        self.sms
            .get_mut(sm)
            .ok_or(PioError::IndexOutOfRange { what: "sm", index: sm })
    }

    /// `CTRL.SM_ENABLE` bits.
    #[must_use]
    pub const fn enabled_mask(&self) -> u8 {
        self.enabled
    }

    /// Sets or clears the enable bit of state machine `sm`.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for `sm >= 4`.
    pub fn set_enabled(&mut self, sm: usize, enabled: bool) -> PioResult<()> {
        self.sm(sm)?;
        if enabled {
            self.enabled |= 1 << sm;
        } else {
            self.enabled &= !(1 << sm);
        }
        Ok(())
    }

    /// Block IRQ flags.
    #[must_use]
    pub const fn irq_flags(&self) -> u8 {
        self.irq
    }

    /// Sticky FIFO debug flags.
    #[must_use]
    pub const fn fdebug(&self) -> u32 {
        self.fdebug
    }

    /// Output level and direction latches driven by this block.
    #[must_use]
    pub const fn outputs(&self) -> PioOutputs {
        PioOutputs {
            pins: self.pin_values,
            pindirs: self.pin_dirs,
        }
    }

    /// Loads `program` into instruction memory at `origin` (or 0) and returns
    /// the address it was placed at.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::ProgramTooLarge`] for programs over 32 words.
    pub fn load_program(&mut self, program: &Program, origin: Option<u8>) -> PioResult<u8> {
        self.memory.load(program, origin)
    }

    /// Zeroes instruction memory.
    pub fn unload(&mut self) {
        self.memory.unload();
    }

    /// Returns the block to its reset state, memory included.
    pub fn reset(&mut self) {
        *self = Self::new(self.index);
    }

    /// Phase 0: plans one cycle for every state machine against the same
    /// snapshot of IRQ flags and pin inputs.
    #[must_use]
    pub fn plan_cycle(&self, inputs: u32, trace: bool) -> BlockCycle {
        let memory = self.memory.words();
        BlockCycle {
            sms: std::array::from_fn(|sm| {
                self.sms[sm].plan(&CycleContext {
                    pio: self.index as u8,
                    sm: sm as u8,
                    memory,
                    inputs,
                    irq_flags: self.irq,
                    enabled: self.enabled & (1 << sm) != 0,
                    trace,
                })
            }),
        }
    }

    /// Phase 1: commits a planned cycle, SM0 first.
    ///
    /// A state machine restarted or reconfigured since phase 0 drops its
    /// whole planned cycle, including IRQ, pin and FIFO effects.
    ///
    /// IRQ clears from all state machines apply before any set, so a flag
    /// both set and cleared in the same cycle ends up set. Pin writes apply
    /// in state machine order with side-set last, so a later state machine
    /// wins and side-set beats `OUT`/`SET` of the same state machine.
    pub fn commit_cycle(&mut self, cycle: &BlockCycle) {
        let pio = self.index as u8;
        let mut irq_set = 0;
        let mut irq_clear = 0;
        for (sm, planned) in cycle.sms.iter().enumerate() {
            if !self.sms[sm].commit(planned, pio, sm as u8) {
                continue;
            }
            irq_set |= planned.irq_set;
            irq_clear |= planned.irq_clear;

            if let Some(write) = planned.out_pins {
                self.pin_values = write.apply(self.pin_values);
            }
            if let Some(write) = planned.out_dirs {
                self.pin_dirs = write.apply(self.pin_dirs);
            }
            if let Some(write) = planned.side_set {
                if planned.side_set_dirs {
                    self.pin_dirs = write.apply(self.pin_dirs);
                } else {
                    self.pin_values = write.apply(self.pin_values);
                }
            }
            if planned.tx_stall {
                self.fdebug |= 1 << (FDEBUG_TXSTALL_LSB + sm as u32);
            }
            if planned.rx_stall {
                self.fdebug |= 1 << (FDEBUG_RXSTALL_LSB + sm as u32);
            }
            if planned.breakpoint {
                self.enabled &= !(1 << sm);
                log::info!(
                    "PIO{pio} SM{sm}: breakpoint at pc {}, state machine disabled",
                    self.sms[sm].core().pc
                );
            }
        }
        self.irq = (self.irq & !irq_clear) | irq_set;
    }

    fn fstat(&self) -> u32 {
        self.sms.iter().enumerate().fold(0, |acc, (sm, machine)| {
            let fifo = machine.fifo();
            acc | u32::from(fifo.is_empty(FifoDirection::Tx)) << (24 + sm)
                | u32::from(fifo.is_full(FifoDirection::Tx)) << (16 + sm)
                | u32::from(fifo.is_empty(FifoDirection::Rx)) << (8 + sm)
                | u32::from(fifo.is_full(FifoDirection::Rx)) << sm
        })
    }

    fn flevel(&self) -> u32 {
        self.sms.iter().enumerate().fold(0, |acc, (sm, machine)| {
            let tx = machine.level(FifoDirection::Tx) as u32 & 0xf;
            let rx = machine.level(FifoDirection::Rx) as u32 & 0xf;
            acc | tx << (8 * sm) | rx << (8 * sm + 4)
        })
    }

    /// Raw interrupt sources (`INTR`).
    #[must_use]
    pub fn intr(&self) -> u32 {
        let fifo_sources = self.sms.iter().enumerate().fold(0, |acc, (sm, machine)| {
            let fifo = machine.fifo();
            acc | u32::from(!fifo.is_empty(FifoDirection::Rx)) << sm
                | u32::from(!fifo.is_full(FifoDirection::Tx)) << (4 + sm)
        });
        fifo_sources | u32::from(self.irq & 0xf) << 8
    }

    fn ints(&self, group: usize) -> u32 {
        let (inte, intf) = (self.inte.get(group), self.intf.get(group));
        (self.intr() & inte.copied().unwrap_or(0)) | intf.copied().unwrap_or(0)
    }

    /// Reads a silicon register, applying read side effects (`RXFn` pops).
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for a state machine or group
    /// index beyond the hardware.
    pub fn read(&mut self, reg: PioRegister) -> PioResult<u32> {
        if let PioRegister::Rxf(sm) = reg {
            let pio = self.index;
            let word = self.sm_mut(sm)?.fifo_mut().pop(FifoDirection::Rx);
            return Ok(word.unwrap_or_else(|| {
                self.fdebug |= 1 << (FDEBUG_RXUNDER_LSB + sm as u32);
                log::warn!("PIO{pio}_RXF{sm}: read from empty RX FIFO");
                0
            }));
        }
        self.peek(reg)
    }

    /// Reads a silicon register without side effects.
    ///
    /// # Errors
    ///
    /// Same as [`PioBlock::read`].
    pub fn peek(&self, reg: PioRegister) -> PioResult<u32> {
        let value = match reg {
            PioRegister::Ctrl => u32::from(self.enabled),
            PioRegister::Fstat => self.fstat(),
            PioRegister::Fdebug => self.fdebug,
            PioRegister::Flevel => self.flevel(),
            PioRegister::Txf(sm) => {
                self.sm(sm)?;
                0
            }
            PioRegister::Rxf(sm) => self.sm(sm)?.fifo().peek(FifoDirection::Rx).unwrap_or(0),
            PioRegister::Irq => u32::from(self.irq),
            PioRegister::IrqForce => 0,
            PioRegister::InputSyncBypass => self.input_sync_bypass,
            PioRegister::DbgPadout => self.pin_values,
            PioRegister::DbgPadoe => self.pin_dirs,
            PioRegister::DbgCfginfo => DBG_CFGINFO,
            PioRegister::InstrMem(index) => u32::from(self.memory.read(index)),
            PioRegister::Sm(sm, field) => {
                let machine = self.sm(sm)?;
                match field {
                    SmField::Clkdiv => machine.clkdiv_register(),
                    SmField::Execctrl => machine.execctrl_register(),
                    SmField::Shiftctrl => machine.shiftctrl_register(),
                    SmField::Addr => u32::from(machine.core().pc),
                    SmField::Instr => u32::from(machine.current_opcode(self.memory.words())),
                    SmField::Pinctrl => machine.pinctrl_register(),
                }
            }
            PioRegister::Intr => self.intr(),
            PioRegister::Inte(group) => self.group(&self.inte, group)?,
            PioRegister::Intf(group) => self.group(&self.intf, group)?,
            PioRegister::Ints(group) => {
                self.group(&self.inte, group)?;
                self.ints(group)
            }
        };
        Ok(value)
    }

    fn group(&self, registers: &[u32; 2], group: usize) -> PioResult<u32> {
        registers.get(group).copied().ok_or(PioError::IndexOutOfRange {
            what: "irq group",
            index: group,
        })
    }

    fn group_mut(registers: &mut [u32; 2], group: usize) -> PioResult<&mut u32> {
        registers.get_mut(group).ok_or(PioError::IndexOutOfRange {
            what: "irq group",
            index: group,
        })
    }

    /// Writes a silicon register. Read-only bits are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::InvalidConfig`] for a rejected `SMx_CLKDIV` value
    /// (labelled with `label`) and [`PioError::IndexOutOfRange`] for indices
    /// beyond the hardware.
    pub fn write(&mut self, reg: PioRegister, label: &str, value: u32) -> PioResult<()> {
        match reg {
            PioRegister::Ctrl => self.write_ctrl(value),
            PioRegister::Fdebug => self.fdebug &= !(value & FDEBUG_MASK),
            PioRegister::Txf(sm) => {
                let pio = self.index;
                if !self.sm_mut(sm)?.fifo_mut().push(FifoDirection::Tx, value) {
                    self.fdebug |= 1 << (FDEBUG_TXOVER_LSB + sm as u32);
                    log::warn!("PIO{pio}_TXF{sm}: write to full TX FIFO dropped {value:#010x}");
                }
            }
            PioRegister::Irq => self.irq &= !(value as u8),
            PioRegister::IrqForce => self.irq |= value as u8,
            PioRegister::InputSyncBypass => self.input_sync_bypass = value,
            PioRegister::InstrMem(index) => self.memory.write(index, value as u16),
            PioRegister::Sm(sm, field) => {
                let machine = self.sm_mut(sm)?;
                match field {
                    SmField::Clkdiv => machine.set_clkdiv_register(label, value)?,
                    SmField::Execctrl => machine.set_execctrl_register(value),
                    SmField::Shiftctrl => machine.set_shiftctrl_register(value),
                    SmField::Instr => machine.force_instruction(value as u16),
                    SmField::Pinctrl => machine.set_pinctrl_register(value),
                    SmField::Addr => {}
                }
            }
            PioRegister::Inte(group) => *Self::group_mut(&mut self.inte, group)? = value & 0xfff,
            PioRegister::Intf(group) => *Self::group_mut(&mut self.intf, group)? = value & 0xfff,
            PioRegister::Rxf(sm) => {
                self.sm(sm)?;
            }
            PioRegister::Fstat
            | PioRegister::Flevel
            | PioRegister::DbgPadout
            | PioRegister::DbgPadoe
            | PioRegister::DbgCfginfo
            | PioRegister::Intr
            | PioRegister::Ints(_) => {}
        }
        Ok(())
    }

    fn write_ctrl(&mut self, value: u32) {
        let enabled = (value & CTRL_SM_ENABLE_MASK) as u8;
        if enabled != self.enabled {
            log::debug!(
                "PIO{}: SM_ENABLE {:#06b} -> {enabled:#06b}",
                self.index,
                self.enabled
            );
        }
        self.enabled = enabled;
        for (sm, machine) in self.sms.iter_mut().enumerate() {
            if value & 1 << (CTRL_SM_RESTART_LSB as usize + sm) != 0 {
                machine.restart();
            }
            if value & 1 << (CTRL_CLKDIV_RESTART_LSB as usize + sm) != 0 {
                machine.restart_clock();
            }
        }
    }

    /// Value unmasked bits keep in a masked write to `reg`.
    ///
    /// # Errors
    ///
    /// Same as [`PioBlock::peek`].
    pub fn masked_write_base(&self, reg: PioRegister) -> PioResult<u32> {
        if reg.is_action() {
            Ok(0)
        } else {
            self.peek(reg)
        }
    }

    /// Reads an emulator extension register.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for a state machine beyond the
    /// hardware.
    pub fn read_emu(&self, reg: PioEmuRegister) -> PioResult<u32> {
        let (sm, field) = match reg {
            PioEmuRegister::GpioPins => return Ok(self.pin_values),
            PioEmuRegister::GpioPinDirs => return Ok(self.pin_dirs),
            PioEmuRegister::Sm(sm, field) => (sm, field),
        };
        let machine = self.sm(sm)?;
        let core = machine.core();
        let value = match field {
            SmEmuField::RegX => core.x,
            SmEmuField::RegY => core.y,
            SmEmuField::Pc => u32::from(core.pc),
            SmEmuField::Isr => core.shift.isr,
            SmEmuField::IsrShiftCount => u32::from(core.shift.isr_count),
            SmEmuField::Osr => core.shift.osr,
            SmEmuField::OsrShiftCount => u32::from(core.shift.osr_count),
            SmEmuField::FifoMem(slot) => machine.fifo().slot(slot).unwrap_or(0),
            SmEmuField::ClkEnable => u32::from(core.clock_enable),
            SmEmuField::Delay => u32::from(core.delay),
            SmEmuField::DelayCycle => u32::from(core.delay_cycle),
            SmEmuField::InstrOrigin => core.origin.code(),
            SmEmuField::ForcedInstr => core
                .forced
                .map_or(0, |opcode| 1 << FORCED_PENDING_BIT | u32::from(opcode)),
            SmEmuField::Breakpoints => machine.breakpoints(),
        };
        Ok(value)
    }

    /// Writes an emulator extension register. Read-only fields ignore the
    /// write.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::IndexOutOfRange`] for a state machine beyond the
    /// hardware.
    pub fn write_emu(&mut self, reg: PioEmuRegister, value: u32) -> PioResult<()> {
        let (sm, field) = match reg {
            PioEmuRegister::GpioPins => {
                self.pin_values = value;
                return Ok(());
            }
            PioEmuRegister::GpioPinDirs => {
                self.pin_dirs = value;
                return Ok(());
            }
            PioEmuRegister::Sm(sm, field) => (sm, field),
        };
        let machine = self.sm_mut(sm)?;
        match field {
            SmEmuField::FifoMem(slot) => {
                machine.fifo_mut().set_slot(slot, value);
            }
            SmEmuField::ForcedInstr => machine.force_instruction(value as u16),
            SmEmuField::Breakpoints => machine.set_breakpoints(value),
            SmEmuField::ClkEnable | SmEmuField::DelayCycle | SmEmuField::InstrOrigin => {}
            _ => {
                let core = machine.core_mut();
                match field {
                    SmEmuField::RegX => core.x = value,
                    SmEmuField::RegY => core.y = value,
                    SmEmuField::Pc => core.pc = (value & 0x1f) as u8,
                    SmEmuField::Isr => core.shift.isr = value,
                    SmEmuField::IsrShiftCount => core.shift.isr_count = value.min(32) as u8,
                    SmEmuField::Osr => core.shift.osr = value,
                    SmEmuField::OsrShiftCount => core.shift.osr_count = value.min(32) as u8,
                    SmEmuField::Delay => core.delay = (value & 0x1f) as u8,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Value unmasked bits keep in a masked write to `reg`.
    ///
    /// # Errors
    ///
    /// Same as [`PioBlock::read_emu`].
    pub fn masked_write_base_emu(&self, reg: PioEmuRegister) -> PioResult<u32> {
        match reg {
            PioEmuRegister::Sm(_, SmEmuField::ForcedInstr) => Ok(0),
            other => self.read_emu(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(program: &[u16]) -> PioBlock {
        let mut block = PioBlock::new(0);
        let program = Program::new(None, None, program.to_vec());
        block.load_program(&program, None).expect("program fits");
        block
    }

    fn step(block: &mut PioBlock) {
        let cycle = block.plan_cycle(0, false);
        block.commit_cycle(&cycle);
    }

    #[test]
    fn reset_block_reports_empty_fifos() {
        let block = PioBlock::new(1);
        assert_eq!(block.peek(PioRegister::Fstat), Ok(0x0f00_0f00));
        assert_eq!(block.peek(PioRegister::Flevel), Ok(0));
        assert_eq!(block.peek(PioRegister::DbgCfginfo), Ok(DBG_CFGINFO));
        assert_eq!(block.peek(PioRegister::Intr), Ok(0xf0));
    }

    #[test]
    fn irq_set_wins_over_clear_in_same_cycle() {
        // irq set 0 ; irq clear 0
        let mut block = block_with(&[0xc000, 0xc040]);
        block.sm_mut(1).expect("sm1").core_mut().pc = 1;
        block.write(PioRegister::Ctrl, "CTRL", 0x3).expect("ctrl");
        step(&mut block);
        assert_eq!(block.irq_flags() & 1, 1);
    }

    #[test]
    fn later_state_machine_wins_pin_conflict() {
        // set pins, 1 ; set pins, 0
        let mut block = block_with(&[0xe001, 0xe000]);
        for sm in 0..2 {
            block
                .write(PioRegister::Sm(sm, SmField::Pinctrl), "PINCTRL", 1 << 26)
                .expect("pinctrl");
        }
        block.sm_mut(1).expect("sm1").core_mut().pc = 1;
        block.write(PioRegister::Ctrl, "CTRL", 0x3).expect("ctrl");
        step(&mut block);
        assert_eq!(block.outputs().pins & 1, 0);

        block.write(PioRegister::Ctrl, "CTRL", 0x1).expect("ctrl");
        block.sm_mut(0).expect("sm0").core_mut().pc = 0;
        step(&mut block);
        assert_eq!(block.peek(PioRegister::DbgPadout), Ok(1));
    }

    #[test]
    fn blocked_pull_sets_txstall() {
        // pull block
        let mut block = block_with(&[0x80a0]);
        block.write(PioRegister::Ctrl, "CTRL", 0x1).expect("ctrl");
        step(&mut block);
        assert_eq!(block.fdebug(), 1 << 24);
        block.write(PioRegister::Fdebug, "FDEBUG", 1 << 24).expect("fdebug");
        assert_eq!(block.fdebug(), 0);
    }

    #[test]
    fn host_fifo_misuse_sets_debug_flags() {
        let mut block = PioBlock::new(0);
        assert_eq!(block.read(PioRegister::Rxf(2)), Ok(0));
        assert_eq!(block.fdebug(), 1 << (8 + 2));

        for word in 0..5 {
            block.write(PioRegister::Txf(1), "TXF1", word).expect("txf");
        }
        assert_eq!(block.fdebug() & 1 << (16 + 1), 1 << (16 + 1));
        assert_eq!(block.peek(PioRegister::Flevel), Ok(4 << 8));
        assert_eq!(block.peek(PioRegister::Fstat).map(|v| v & 1 << 17), Ok(1 << 17));
    }

    #[test]
    fn rx_reads_pop_in_order() {
        let mut block = PioBlock::new(0);
        let fifo = block.sm_mut(0).expect("sm0").fifo_mut();
        assert!(fifo.push(FifoDirection::Rx, 10));
        assert!(fifo.push(FifoDirection::Rx, 20));
        assert_eq!(block.peek(PioRegister::Rxf(0)), Ok(10));
        assert_eq!(block.read(PioRegister::Rxf(0)), Ok(10));
        assert_eq!(block.read(PioRegister::Rxf(0)), Ok(20));
        assert_eq!(block.fdebug(), 0);
    }

    #[test]
    fn ctrl_strobes_do_not_read_back() {
        let mut block = PioBlock::new(0);
        block
            .write(PioRegister::Sm(0, SmField::Execctrl), "EXECCTRL", 0x0001_f000 | 5 << 7)
            .expect("execctrl");
        block.sm_mut(0).expect("sm0").core_mut().pc = 9;
        block.write(PioRegister::Ctrl, "CTRL", 1 << 4 | 1 << 8 | 0x2).expect("ctrl");
        assert_eq!(block.peek(PioRegister::Ctrl), Ok(0x2));
        assert_eq!(block.peek(PioRegister::Sm(0, SmField::Addr)), Ok(5));
    }

    #[test]
    fn ints_combines_raw_enable_and_force() {
        let mut block = PioBlock::new(0);
        block.write(PioRegister::IrqForce, "IRQ_FORCE", 0x3).expect("force");
        block.write(PioRegister::Inte(0), "IRQ0_INTE", 1 << 8).expect("inte");
        block.write(PioRegister::Intf(1), "IRQ1_INTF", 1 << 2).expect("intf");
        assert_eq!(block.peek(PioRegister::Ints(0)), Ok(1 << 8));
        assert_eq!(block.peek(PioRegister::Ints(1)), Ok(1 << 2));
        block.write(PioRegister::Irq, "IRQ", 0x1).expect("irq");
        assert_eq!(block.irq_flags(), 0x2);
        assert_eq!(block.peek(PioRegister::Ints(0)), Ok(0));
    }

    #[test]
    fn invalid_clkdiv_is_rejected_with_label() {
        let mut block = PioBlock::new(0);
        let err = block
            .write(PioRegister::Sm(2, SmField::Clkdiv), "PIO0_SM2_CLKDIV", 0x0000_0100)
            .expect_err("frac without int");
        assert!(matches!(err, PioError::InvalidConfig { ref register, .. } if register == "PIO0_SM2_CLKDIV"));
        assert_eq!(block.peek(PioRegister::Sm(2, SmField::Clkdiv)), Ok(0x0001_0000));
    }

    #[test]
    fn breakpoint_disables_state_machine() {
        // set x, 1
        let mut block = block_with(&[0xe021]);
        block
            .write_emu(PioEmuRegister::Sm(0, SmEmuField::Breakpoints), 1)
            .expect("breakpoints");
        block.set_enabled(0, true).expect("enable");
        step(&mut block);
        assert_eq!(block.enabled_mask(), 0);
        assert_eq!(block.read_emu(PioEmuRegister::Sm(0, SmEmuField::RegX)), Ok(0));

        block.set_enabled(0, true).expect("enable");
        step(&mut block);
        assert_eq!(block.enabled_mask(), 1);
        assert_eq!(block.read_emu(PioEmuRegister::Sm(0, SmEmuField::RegX)), Ok(1));
    }

    #[test]
    fn forced_instruction_shows_pending_flag() {
        let mut block = PioBlock::new(0);
        block
            .write(PioRegister::Sm(3, SmField::Instr), "INSTR", 0xe025)
            .expect("instr");
        assert_eq!(
            block.read_emu(PioEmuRegister::Sm(3, SmEmuField::ForcedInstr)),
            Ok(1 << 16 | 0xe025)
        );
        assert_eq!(block.peek(PioRegister::Sm(3, SmField::Instr)), Ok(0xe025));
        step(&mut block);
        assert_eq!(block.read_emu(PioEmuRegister::Sm(3, SmEmuField::ForcedInstr)), Ok(0));
        assert_eq!(block.read_emu(PioEmuRegister::Sm(3, SmEmuField::RegX)), Ok(5));
        assert_eq!(block.read_emu(PioEmuRegister::Sm(3, SmEmuField::InstrOrigin)), Ok(2));
    }

    #[test]
    fn read_only_emu_fields_ignore_writes() {
        let mut block = PioBlock::new(0);
        block
            .write_emu(PioEmuRegister::Sm(0, SmEmuField::DelayCycle), 1)
            .expect("write");
        assert_eq!(block.read_emu(PioEmuRegister::Sm(0, SmEmuField::DelayCycle)), Ok(0));
        block.write_emu(PioEmuRegister::Sm(0, SmEmuField::FifoMem(6)), 0xdead).expect("write");
        assert_eq!(block.read_emu(PioEmuRegister::Sm(0, SmEmuField::FifoMem(6))), Ok(0xdead));
        assert_eq!(block.peek(PioRegister::Flevel), Ok(0));
    }

    #[test]
    fn out_of_range_indices_are_reported() {
        let mut block = PioBlock::new(0);
        assert_eq!(
            block.peek(PioRegister::Sm(4, SmField::Addr)),
            Err(PioError::IndexOutOfRange { what: "sm", index: 4 })
        );
        assert!(block.write(PioRegister::Inte(2), "INTE", 0).is_err());
    }

    #[test]
    fn reset_clears_memory_and_state() {
        let mut block = block_with(&[0xe021]);
        block.write(PioRegister::IrqForce, "IRQ_FORCE", 0xff).expect("force");
        block.reset();
        assert_eq!(block, PioBlock::new(0));
    }
}
