//! One PIO state machine: registers, configuration and host-side controls.
//!
//! Execution is split in two: [`StateMachine::plan`] computes an
//! [`SmCycle`] from an immutable snapshot, and [`StateMachine::commit`]
//! applies it. Everything a sibling state machine might observe (IRQ flags,
//! pin inputs) is sampled before any commit happens.

mod control;
mod execute;

pub use control::{
    ExecControl, InstructionOrigin, PinControl, PinWrite, EXECCTRL_RESET, PINCTRL_RESET,
};
pub use execute::{CycleContext, SmCycle};

use crate::clock::ClockDivider;
use crate::decoder::{decode, Instruction};
use crate::error::PioResult;
use crate::fifo::{FifoDirection, FifoPair};
use crate::shift::{ShiftControl, ShiftRegisters, FJOIN_RX_BIT, FJOIN_TX_BIT};

/// Number of state machines per PIO block.
pub const SM_COUNT: usize = 4;

/// `EXEC_STALLED` bit of `SMx_EXECCTRL`.
const EXEC_STALLED_BIT: u32 = 31;

/// Execution state that changes from cycle to cycle.
///
/// Kept `Copy` so a cycle can be planned on a scratch copy and merged back
/// field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct SmCore {
    /// Program counter (0..=31).
    pub pc: u8,
    /// Scratch register X.
    pub x: u32,
    /// Scratch register Y.
    pub y: u32,
    /// ISR/OSR and their shift counters.
    pub shift: ShiftRegisters,
    /// Delay cycles still to be spent before the next instruction.
    pub delay: u8,
    /// The last cycle was spent in a delay.
    pub delay_cycle: bool,
    /// The clock divider fired on the last cycle.
    pub clock_enable: bool,
    /// The last executed instruction did not complete.
    pub stalled: bool,
    /// An `IRQ WAIT` raised its flag and is waiting for it to clear.
    pub irq_wait: bool,
    /// Opcode produced by `OUT EXEC`/`MOV EXEC`, run instead of the next fetch.
    pub exec: Option<u16>,
    /// Host-injected opcode, run on the next cycle regardless of enable.
    pub forced: Option<u16>,
    /// Origin of the last executed instruction.
    pub origin: InstructionOrigin,
    /// The breakpoint at PC was already taken; execute through it once.
    pub skip_breakpoint: bool,
    /// Most recent `OUT`/`SET` pin level write, for `OUT_STICKY`.
    pub sticky_pins: Option<PinWrite>,
    /// Most recent `OUT`/`SET` pin direction write, for `OUT_STICKY`.
    pub sticky_dirs: Option<PinWrite>,
}

/// A single PIO state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct StateMachine {
    core: SmCore,
    clock: ClockDivider,
    exec_ctrl: ExecControl,
    shift_ctrl: ShiftControl,
    pin_ctrl: PinControl,
    fifo: FifoPair,
    breakpoints: u32,
    config_epoch: u32,
}

impl StateMachine {
    /// Execution registers.
    #[must_use]
    pub const fn core(&self) -> &SmCore {
        &self.core
    }

    /// Mutable execution registers, for emulator-extension writes.
    pub fn core_mut(&mut self) -> &mut SmCore {
        &mut self.core
    }

    /// Clock divider.
    #[must_use]
    pub const fn clock(&self) -> &ClockDivider {
        &self.clock
    }

    /// Decoded `EXECCTRL`.
    #[must_use]
    pub const fn exec_ctrl(&self) -> ExecControl {
        self.exec_ctrl
    }

    /// Decoded shift fields of `SHIFTCTRL`.
    #[must_use]
    pub const fn shift_ctrl(&self) -> ShiftControl {
        self.shift_ctrl
    }

    /// Decoded `PINCTRL`.
    #[must_use]
    pub const fn pin_ctrl(&self) -> PinControl {
        self.pin_ctrl
    }

    /// TX/RX FIFO pair.
    #[must_use]
    pub const fn fifo(&self) -> &FifoPair {
        &self.fifo
    }

    /// Mutable TX/RX FIFO pair.
    pub fn fifo_mut(&mut self) -> &mut FifoPair {
        &mut self.fifo
    }

    /// Breakpoint address mask (bit n marks instruction address n).
    #[must_use]
    pub const fn breakpoints(&self) -> u32 {
        self.breakpoints
    }

    /// Replaces the breakpoint mask.
    pub fn set_breakpoints(&mut self, mask: u32) {
        self.breakpoints = mask;
    }

    /// `SMx_CLKDIV` value.
    #[must_use]
    pub const fn clkdiv_register(&self) -> u32 {
        self.clock.to_register()
    }

    /// Writes `SMx_CLKDIV`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PioError::InvalidConfig`] for `INT == 0` with a
    /// non-zero `FRAC`; the divider keeps its previous value.
    pub fn set_clkdiv_register(&mut self, label: &str, value: u32) -> PioResult<()> {
        let before = self.clock.to_register();
        self.clock.set_register(label, value)?;
        self.touch_config_if(before != self.clock.to_register());
        Ok(())
    }

    /// `SMx_EXECCTRL` value including the read-only `EXEC_STALLED` flag.
    #[must_use]
    pub const fn execctrl_register(&self) -> u32 {
        self.exec_ctrl.to_register() | (self.core.stalled as u32) << EXEC_STALLED_BIT
    }

    /// Writes `SMx_EXECCTRL`.
    pub fn set_execctrl_register(&mut self, value: u32) {
        let before = self.exec_ctrl;
        self.exec_ctrl = ExecControl::from_register(value);
        self.touch_config_if(before != self.exec_ctrl);
    }

    /// `SMx_SHIFTCTRL` value including the join flags.
    #[must_use]
    pub const fn shiftctrl_register(&self) -> u32 {
        let (join_tx, join_rx) = self.fifo.join();
        self.shift_ctrl.to_register()
            | (join_tx as u32) << FJOIN_TX_BIT
            | (join_rx as u32) << FJOIN_RX_BIT
    }

    /// Writes `SMx_SHIFTCTRL`; a change of either join flag flushes both
    /// FIFOs.
    pub fn set_shiftctrl_register(&mut self, value: u32) {
        let before = self.shiftctrl_register();
        self.shift_ctrl = ShiftControl::from_register(value);
        self.fifo.set_join(
            value & (1 << FJOIN_TX_BIT) != 0,
            value & (1 << FJOIN_RX_BIT) != 0,
        );
        self.touch_config_if(before != self.shiftctrl_register());
    }

    /// `SMx_PINCTRL` value.
    #[must_use]
    pub const fn pinctrl_register(&self) -> u32 {
        self.pin_ctrl.to_register()
    }

    /// Writes `SMx_PINCTRL`.
    pub fn set_pinctrl_register(&mut self, value: u32) {
        let before = self.pin_ctrl;
        self.pin_ctrl = PinControl::from_register(value);
        self.touch_config_if(before != self.pin_ctrl);
    }

    /// Opcode the state machine will execute next: a forced instruction, a
    /// pending `EXEC`, or the word at PC.
    #[must_use]
    pub fn current_opcode(&self, memory: &[u16]) -> u16 {
        self.core
            .forced
            .or(self.core.exec)
            .unwrap_or_else(|| memory.get(usize::from(self.core.pc)).copied().unwrap_or(0))
    }

    /// Decodes `opcode` under the current side-set configuration.
    #[must_use]
    pub const fn decode(&self, opcode: u16) -> Instruction {
        decode(opcode, self.pin_ctrl.sideset_count, self.exec_ctrl.side_en)
    }

    /// Schedules `opcode` for execution on the next cycle (`SMx_INSTR`).
    pub fn force_instruction(&mut self, opcode: u16) {
        log::debug!("forced instruction {opcode:#06x} queued");
        self.core.forced = Some(opcode);
    }

    /// Applies `CTRL.SM_RESTART`.
    ///
    /// PC returns to the wrap target; ISR, shift counters, delay, IRQ wait
    /// and pending `EXEC`/forced opcodes are cleared. X, Y, OSR contents and
    /// FIFOs survive.
    pub fn restart(&mut self) {
        let core = &mut self.core;
        core.pc = self.exec_ctrl.wrap_bottom;
        core.shift.restart();
        core.delay = 0;
        core.delay_cycle = false;
        core.stalled = false;
        core.irq_wait = false;
        core.exec = None;
        core.forced = None;
        core.skip_breakpoint = false;
        core.sticky_pins = None;
        core.sticky_dirs = None;
        self.touch_config();
    }

    /// Applies `CTRL.CLKDIV_RESTART`.
    pub fn restart_clock(&mut self) {
        self.clock.restart();
        self.touch_config();
    }

    /// Invalidates a cycle planned before a restart or configuration change.
    fn touch_config(&mut self) {
        self.config_epoch = self.config_epoch.wrapping_add(1);
    }

    fn touch_config_if(&mut self, changed: bool) {
        if changed {
            self.touch_config();
        }
    }

    /// Queue level of one FIFO direction.
    #[must_use]
    pub const fn level(&self, direction: FifoDirection) -> usize {
        self.fifo.level(direction)
    }
}
