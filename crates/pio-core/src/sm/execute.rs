//! Per-cycle instruction execution.
//!
//! A cycle runs in two steps:
//! 1. [`StateMachine::plan`] reads the state machine and a [`CycleContext`]
//!    snapshot and produces an [`SmCycle`] without mutating anything.
//! 2. [`StateMachine::commit`] applies the state machine's own part of the
//!    plan (registers, FIFOs, clock phase). Block-level effects (IRQ flags,
//!    pin latches, `FDEBUG`, breakpoint disables) are applied by the owning
//!    block from the public fields of [`SmCycle`].
//!
//! A stalled instruction leaves no trace besides its side-set and the stall
//! flags.

#![allow(clippy::cast_possible_truncation)]

use super::{InstructionOrigin, PinWrite, SmCore, StateMachine};
use crate::decoder::{
    InSource, Instruction, IrqIndex, JmpCondition, MovDestination, MovOp, MovSource, Operation,
    OutDestination, SetDestination, WaitSource,
};
use crate::fifo::FifoDirection;
use crate::memory::INSTRUCTION_MEMORY_WORDS;

/// Snapshot a state machine plans its cycle against.
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    /// PIO block index, for logging.
    pub pio: u8,
    /// State machine index within the block; used for relative IRQs.
    pub sm: u8,
    /// Shared instruction memory.
    pub memory: &'a [u16; INSTRUCTION_MEMORY_WORDS],
    /// GPIO inputs as seen by the block.
    pub inputs: u32,
    /// Block IRQ flags at the start of the cycle.
    pub irq_flags: u8,
    /// `CTRL.SM_ENABLE` for this state machine.
    pub enabled: bool,
    /// Emit a trace record per executed instruction.
    pub trace: bool,
}

/// Effects of one planned cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SmCycle {
    epoch: u32,
    base: SmCore,
    next: SmCore,
    clock_ticked: bool,
    tx_pop: bool,
    rx_push: Option<u32>,
    /// IRQ flags raised by this state machine.
    pub irq_set: u8,
    /// IRQ flags cleared by this state machine.
    pub irq_clear: u8,
    /// Pin level write from `OUT`, `SET` or `MOV PINS`.
    pub out_pins: Option<PinWrite>,
    /// Pin direction write from `OUT PINDIRS` or `SET PINDIRS`.
    pub out_dirs: Option<PinWrite>,
    /// Side-set write; overrides `out_pins`/`out_dirs` on overlapping pins.
    pub side_set: Option<PinWrite>,
    /// Side-set targets pin directions.
    pub side_set_dirs: bool,
    /// Stalled on an empty TX FIFO.
    pub tx_stall: bool,
    /// Stalled on a full RX FIFO.
    pub rx_stall: bool,
    /// Fetch hit a breakpoint; the state machine must be disabled.
    pub breakpoint: bool,
}

impl SmCycle {
    fn new(core: SmCore, epoch: u32) -> Self {
        let mut next = core;
        next.delay_cycle = false;
        next.clock_enable = false;
        Self {
            epoch,
            base: core,
            next,
            clock_ticked: false,
            tx_pop: false,
            rx_push: None,
            irq_set: 0,
            irq_clear: 0,
            out_pins: None,
            out_dirs: None,
            side_set: None,
            side_set_dirs: false,
            tx_stall: false,
            rx_stall: false,
            breakpoint: false,
        }
    }

    /// Execution registers as they will be after the commit.
    #[must_use]
    pub const fn next_core(&self) -> &SmCore {
        &self.next
    }
}

/// How control continues after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Advance,
    Jump(u8),
    Exec(u16),
    Stall,
}

impl StateMachine {
    /// Plans one system clock cycle.
    #[must_use]
    pub fn plan(&self, ctx: &CycleContext<'_>) -> SmCycle {
        let mut cycle = SmCycle::new(self.core, self.config_epoch);
        if ctx.enabled {
            cycle.clock_ticked = true;
            cycle.next.clock_enable = self.clock.peek();
        }
        let fires = cycle.next.clock_enable;

        if let Some(opcode) = self.core.forced {
            self.run(opcode, InstructionOrigin::Forced, ctx, &mut cycle);
        } else if fires {
            self.plan_enabled_cycle(ctx, &mut cycle);
        }

        if ctx.enabled && self.exec_ctrl.out_sticky {
            cycle.out_pins = cycle.out_pins.or(cycle.next.sticky_pins);
            cycle.out_dirs = cycle.out_dirs.or(cycle.next.sticky_dirs);
        }
        cycle
    }

    fn plan_enabled_cycle(&self, ctx: &CycleContext<'_>, cycle: &mut SmCycle) {
        if self.core.delay > 0 {
            cycle.next.delay -= 1;
            cycle.next.delay_cycle = true;
            return;
        }
        if let Some(opcode) = self.core.exec {
            self.run(opcode, InstructionOrigin::Exec, ctx, cycle);
            return;
        }
        let pc = self.core.pc & 0x1f;
        if self.breakpoints & (1 << pc) != 0 && !self.core.skip_breakpoint {
            cycle.breakpoint = true;
            cycle.next.skip_breakpoint = true;
            return;
        }
        self.run(
            ctx.memory[usize::from(pc)],
            InstructionOrigin::Memory,
            ctx,
            cycle,
        );
    }

    fn run(
        &self,
        opcode: u16,
        origin: InstructionOrigin,
        ctx: &CycleContext<'_>,
        cycle: &mut SmCycle,
    ) {
        let instr = self.decode(opcode);
        if ctx.trace {
            log::trace!(
                "PIO{} SM{} {:02} {:?}: {instr}",
                ctx.pio,
                ctx.sm,
                self.core.pc,
                origin
            );
        }
        cycle.next.origin = origin;

        let flow = self.execute(&instr, ctx, cycle);

        if let Some(value) = instr.side_set {
            cycle.side_set = Some(PinWrite {
                base: self.pin_ctrl.sideset_base,
                count: instr.layout.side_set_data_bits(),
                value: u32::from(value),
            });
            cycle.side_set_dirs = self.exec_ctrl.side_pindir;
        }

        let next = &mut cycle.next;
        if flow == Flow::Stall {
            next.stalled = true;
            return;
        }
        next.stalled = false;
        match origin {
            InstructionOrigin::Forced => next.forced = None,
            InstructionOrigin::Exec => next.exec = None,
            InstructionOrigin::Memory => next.skip_breakpoint = false,
        }
        next.delay = instr.delay;
        match flow {
            Flow::Jump(target) => next.pc = target & 0x1f,
            Flow::Exec(produced) => {
                next.exec = Some(produced);
                next.delay = 0;
            }
            Flow::Advance | Flow::Stall => {}
        }
        if origin == InstructionOrigin::Memory && !matches!(flow, Flow::Jump(_)) {
            next.pc = self.advance_pc(self.core.pc);
        }
    }

    const fn advance_pc(&self, pc: u8) -> u8 {
        if pc == self.exec_ctrl.wrap_top {
            self.exec_ctrl.wrap_bottom
        } else {
            (pc + 1) & 0x1f
        }
    }

    const fn input_pins(&self, ctx: &CycleContext<'_>) -> u32 {
        ctx.inputs.rotate_right(self.pin_ctrl.in_base as u32)
    }

    fn status(&self) -> u32 {
        let direction = if self.exec_ctrl.status_sel {
            FifoDirection::Rx
        } else {
            FifoDirection::Tx
        };
        if self.fifo.level(direction) < usize::from(self.exec_ctrl.status_n) {
            u32::MAX
        } else {
            0
        }
    }

    fn execute(&self, instr: &Instruction, ctx: &CycleContext<'_>, cycle: &mut SmCycle) -> Flow {
        match instr.operation {
            Operation::Jmp { condition, address } => self.execute_jmp(condition, address, ctx, cycle),
            Operation::Wait {
                polarity,
                source,
                index,
            } => self.execute_wait(polarity, source, index, ctx, cycle),
            Operation::In { source, bit_count } => self.execute_in(source, bit_count, ctx, cycle),
            Operation::Out {
                destination,
                bit_count,
            } => self.execute_out(destination, bit_count, cycle),
            Operation::Push { if_full, block } => self.execute_push(if_full, block, cycle),
            Operation::Pull { if_empty, block } => self.execute_pull(if_empty, block, cycle),
            Operation::Mov {
                destination,
                op,
                source,
            } => self.execute_mov(destination, op, source, ctx, cycle),
            Operation::Irq { clear, wait, index } => execute_irq(clear, wait, index, ctx, cycle),
            Operation::Set { destination, data } => self.execute_set(destination, data, cycle),
        }
    }

    fn execute_jmp(
        &self,
        condition: JmpCondition,
        address: u8,
        ctx: &CycleContext<'_>,
        cycle: &mut SmCycle,
    ) -> Flow {
        let next = &mut cycle.next;
        let taken = match condition {
            JmpCondition::Always => true,
            JmpCondition::XZero => next.x == 0,
            JmpCondition::XPostDecrement => {
                let taken = next.x != 0;
                next.x = next.x.wrapping_sub(1);
                taken
            }
            JmpCondition::YZero => next.y == 0,
            JmpCondition::YPostDecrement => {
                let taken = next.y != 0;
                next.y = next.y.wrapping_sub(1);
                taken
            }
            JmpCondition::XNotEqualY => next.x != next.y,
            JmpCondition::Pin => ctx.inputs & (1 << self.exec_ctrl.jmp_pin) != 0,
            JmpCondition::OsrNotEmpty => !next.shift.osr_empty(self.shift_ctrl),
        };
        if taken {
            Flow::Jump(address)
        } else {
            Flow::Advance
        }
    }

    fn execute_wait(
        &self,
        polarity: bool,
        source: WaitSource,
        index: u8,
        ctx: &CycleContext<'_>,
        cycle: &mut SmCycle,
    ) -> Flow {
        let satisfied = match source {
            WaitSource::Gpio => (ctx.inputs & (1 << (index & 0x1f)) != 0) == polarity,
            WaitSource::Pin => (self.input_pins(ctx) & (1 << (index & 0x1f)) != 0) == polarity,
            WaitSource::Irq => {
                let bit = 1u8 << IrqIndex::new(index).resolve(ctx.sm);
                let raised = ctx.irq_flags & bit != 0;
                if raised && polarity {
                    cycle.irq_clear |= bit;
                }
                raised == polarity
            }
            WaitSource::Reserved => true,
        };
        if satisfied {
            Flow::Advance
        } else {
            Flow::Stall
        }
    }

    fn execute_in(
        &self,
        source: InSource,
        bit_count: u8,
        ctx: &CycleContext<'_>,
        cycle: &mut SmCycle,
    ) -> Flow {
        let control = self.shift_ctrl;
        let next = &mut cycle.next;
        let value = match source {
            InSource::Pins => self.input_pins(ctx),
            InSource::X => next.x,
            InSource::Y => next.y,
            InSource::Null | InSource::Reserved4 | InSource::Reserved5 => 0,
            InSource::Isr => next.shift.isr,
            InSource::Osr => next.shift.osr,
        };
        let reaches_threshold = control.autopush
            && next.shift.isr_count.saturating_add(bit_count).min(32) >= control.push_bits();
        if reaches_threshold && self.fifo.is_full(FifoDirection::Rx) {
            cycle.rx_stall = true;
            return Flow::Stall;
        }
        next.shift.shift_in(value, bit_count, control.in_shift_right);
        if reaches_threshold {
            cycle.rx_push = Some(next.shift.take_isr());
        }
        Flow::Advance
    }

    fn execute_out(
        &self,
        destination: OutDestination,
        bit_count: u8,
        cycle: &mut SmCycle,
    ) -> Flow {
        let control = self.shift_ctrl;
        if control.autopull && cycle.next.shift.osr_empty(control) {
            let Some(word) = self.fifo.peek(FifoDirection::Tx) else {
                cycle.tx_stall = true;
                return Flow::Stall;
            };
            cycle.next.shift.load_osr(word);
            cycle.tx_pop = true;
        }
        let data = cycle.next.shift.shift_out(bit_count, control.out_shift_right);
        if control.autopull && !cycle.tx_pop && cycle.next.shift.osr_empty(control) {
            if let Some(word) = self.fifo.peek(FifoDirection::Tx) {
                cycle.next.shift.load_osr(word);
                cycle.tx_pop = true;
            }
        }

        let gated = self.exec_ctrl.inline_out_en && data & (1 << self.exec_ctrl.out_en_sel) == 0;
        let write = PinWrite {
            base: self.pin_ctrl.out_base,
            count: self.pin_ctrl.out_count.min(32),
            value: data,
        };
        match destination {
            OutDestination::Pins => {
                if !gated {
                    cycle.out_pins = Some(write);
                    cycle.next.sticky_pins = Some(write);
                }
            }
            OutDestination::PinDirs => {
                if !gated {
                    cycle.out_dirs = Some(write);
                    cycle.next.sticky_dirs = Some(write);
                }
            }
            OutDestination::X => cycle.next.x = data,
            OutDestination::Y => cycle.next.y = data,
            OutDestination::Null => {}
            OutDestination::Pc => return Flow::Jump((data & 0x1f) as u8),
            OutDestination::Isr => {
                cycle.next.shift.isr = data;
                cycle.next.shift.isr_count = bit_count;
            }
            OutDestination::Exec => return Flow::Exec(data as u16),
        }
        Flow::Advance
    }

    fn execute_push(&self, if_full: bool, block: bool, cycle: &mut SmCycle) -> Flow {
        let next = &mut cycle.next;
        if if_full && !next.shift.isr_full(self.shift_ctrl) {
            return Flow::Advance;
        }
        if self.fifo.is_full(FifoDirection::Rx) {
            if block {
                cycle.rx_stall = true;
                return Flow::Stall;
            }
            next.shift.take_isr();
            return Flow::Advance;
        }
        cycle.rx_push = Some(next.shift.take_isr());
        Flow::Advance
    }

    fn execute_pull(&self, if_empty: bool, block: bool, cycle: &mut SmCycle) -> Flow {
        let control = self.shift_ctrl;
        let next = &mut cycle.next;
        // With autopull a full OSR turns PULL into a barrier no-op.
        if control.autopull && next.shift.osr_count == 0 {
            return Flow::Advance;
        }
        if if_empty && !next.shift.osr_empty(control) {
            return Flow::Advance;
        }
        match self.fifo.peek(FifoDirection::Tx) {
            Some(word) => {
                next.shift.load_osr(word);
                cycle.tx_pop = true;
            }
            None if block => {
                cycle.tx_stall = true;
                return Flow::Stall;
            }
            None => {
                let x = next.x;
                next.shift.load_osr(x);
            }
        }
        Flow::Advance
    }

    fn execute_mov(
        &self,
        destination: MovDestination,
        op: MovOp,
        source: MovSource,
        ctx: &CycleContext<'_>,
        cycle: &mut SmCycle,
    ) -> Flow {
        let next = &mut cycle.next;
        let value = match source {
            MovSource::Pins => self.input_pins(ctx),
            MovSource::X => next.x,
            MovSource::Y => next.y,
            MovSource::Null | MovSource::Reserved4 => 0,
            MovSource::Status => self.status(),
            MovSource::Isr => next.shift.isr,
            MovSource::Osr => next.shift.osr,
        };
        let value = match op {
            MovOp::None | MovOp::Reserved => value,
            MovOp::Invert => !value,
            MovOp::BitReverse => value.reverse_bits(),
        };
        match destination {
            MovDestination::Pins => {
                let write = PinWrite {
                    base: self.pin_ctrl.out_base,
                    count: self.pin_ctrl.out_count.min(32),
                    value,
                };
                cycle.out_pins = Some(write);
                next.sticky_pins = Some(write);
            }
            MovDestination::X => next.x = value,
            MovDestination::Y => next.y = value,
            MovDestination::Reserved3 => {}
            MovDestination::Exec => return Flow::Exec(value as u16),
            MovDestination::Pc => return Flow::Jump((value & 0x1f) as u8),
            MovDestination::Isr => {
                next.shift.isr = value;
                next.shift.isr_count = 0;
            }
            MovDestination::Osr => next.shift.load_osr(value),
        }
        Flow::Advance
    }

    fn execute_set(&self, destination: SetDestination, data: u8, cycle: &mut SmCycle) -> Flow {
        let write = PinWrite {
            base: self.pin_ctrl.set_base,
            count: self.pin_ctrl.set_count.min(5),
            value: u32::from(data),
        };
        let next = &mut cycle.next;
        match destination {
            SetDestination::Pins => {
                cycle.out_pins = Some(write);
                next.sticky_pins = Some(write);
            }
            SetDestination::PinDirs => {
                cycle.out_dirs = Some(write);
                next.sticky_dirs = Some(write);
            }
            SetDestination::X => next.x = u32::from(data),
            SetDestination::Y => next.y = u32::from(data),
            SetDestination::Reserved3
            | SetDestination::Reserved5
            | SetDestination::Reserved6
            | SetDestination::Reserved7 => {}
        }
        Flow::Advance
    }

    /// Returns `false` when a restart or a CLKDIV, EXECCTRL, SHIFTCTRL or
    /// PINCTRL write landed after `cycle` was planned. Such a plan was made
    /// against state that no longer exists and must not be committed.
    #[must_use]
    pub const fn accepts(&self, cycle: &SmCycle) -> bool {
        cycle.epoch == self.config_epoch
    }

    /// Applies the state machine's own part of a planned cycle.
    ///
    /// Fields that a host write changed between planning and commit keep the
    /// host's value unless the cycle itself changed them. Returns `false`
    /// when [`StateMachine::accepts`] rejects the cycle; it is then dropped
    /// and the state machine idles for that cycle.
    pub fn commit(&mut self, cycle: &SmCycle, pio: u8, sm: u8) -> bool {
        if !self.accepts(cycle) {
            log::debug!("PIO{pio} SM{sm}: reconfigured between phases, planned cycle dropped");
            return false;
        }
        if cycle.clock_ticked {
            self.clock.tick();
        }
        merge_core(&mut self.core, &cycle.base, &cycle.next);

        if cycle.tx_pop && self.fifo.pop(FifoDirection::Tx).is_none() {
            log::warn!("PIO{pio} SM{sm}: TX FIFO drained before commit");
        }
        if let Some(word) = cycle.rx_push {
            if !self.fifo.push(FifoDirection::Rx, word) {
                log::warn!("PIO{pio} SM{sm}: RX FIFO filled before commit, dropped {word:#010x}");
            }
        }
        match (cycle.base.stalled, cycle.next.stalled) {
            (false, true) => log::debug!("PIO{pio} SM{sm}: stalled at pc {}", self.core.pc),
            (true, false) => log::debug!("PIO{pio} SM{sm}: resumed"),
            _ => {}
        }
        true
    }
}

fn execute_irq(
    clear: bool,
    wait: bool,
    index: IrqIndex,
    ctx: &CycleContext<'_>,
    cycle: &mut SmCycle,
) -> Flow {
    let bit = 1u8 << index.resolve(ctx.sm);
    if clear {
        cycle.irq_clear |= bit;
        return Flow::Advance;
    }
    if !wait {
        cycle.irq_set |= bit;
        return Flow::Advance;
    }
    if !cycle.next.irq_wait {
        cycle.irq_set |= bit;
        cycle.next.irq_wait = true;
        return Flow::Stall;
    }
    if ctx.irq_flags & bit == 0 {
        cycle.next.irq_wait = false;
        Flow::Advance
    } else {
        Flow::Stall
    }
}

fn merge_field<T: PartialEq + Copy>(current: &mut T, base: T, next: T) {
    if base != next {
        *current = next;
    }
}

fn merge_core(current: &mut SmCore, base: &SmCore, next: &SmCore) {
    merge_field(&mut current.pc, base.pc, next.pc);
    merge_field(&mut current.x, base.x, next.x);
    merge_field(&mut current.y, base.y, next.y);
    merge_field(&mut current.shift.isr, base.shift.isr, next.shift.isr);
    merge_field(&mut current.shift.isr_count, base.shift.isr_count, next.shift.isr_count);
    merge_field(&mut current.shift.osr, base.shift.osr, next.shift.osr);
    merge_field(&mut current.shift.osr_count, base.shift.osr_count, next.shift.osr_count);
    merge_field(&mut current.delay, base.delay, next.delay);
    merge_field(&mut current.exec, base.exec, next.exec);
    merge_field(&mut current.forced, base.forced, next.forced);
    merge_field(&mut current.irq_wait, base.irq_wait, next.irq_wait);
    merge_field(&mut current.skip_breakpoint, base.skip_breakpoint, next.skip_breakpoint);
    merge_field(&mut current.sticky_pins, base.sticky_pins, next.sticky_pins);
    merge_field(&mut current.sticky_dirs, base.sticky_dirs, next.sticky_dirs);
    current.delay_cycle = next.delay_cycle;
    current.clock_enable = next.clock_enable;
    current.stalled = next.stalled;
    current.origin = next.origin;
}
