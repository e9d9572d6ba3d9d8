//! Cycle-level emulator of the RP2040 PIO peripheral.
//!
//! Two PIO blocks of four state machines each, the GPIO bank they drive,
//! and a register-exact address space that hosts, monitors and remote
//! clients use to observe and control them.

/// Error taxonomy for host-facing operations.
pub mod error;
pub use error::{PioError, PioResult};

/// Host-supplied configuration.
pub mod config;
pub use config::{EmulatorConfig, DEFAULT_MASTER_CLOCK_HZ, DEFAULT_WAIT_POLL_INTERVAL_US};

/// Opcode decoding and disassembly.
pub mod decoder;
pub use decoder::{
    decode, FieldLayout, InSource, Instruction, IrqIndex, JmpCondition, MovDestination, MovOp,
    MovSource, OpcodeClass, Operation, OutDestination, SetDestination, WaitSource,
    DELAY_SIDE_SET_FIELD_BITS, MAX_SIDE_SET_COUNT,
};

/// Fractional clock divider.
pub mod clock;
pub use clock::{ClockDivider, CLKDIV_RESET};

/// ISR/OSR shift registers and `SHIFTCTRL`.
pub mod shift;
pub use shift::{ShiftControl, ShiftRegisters, SHIFTCTRL_RESET};

/// TX/RX FIFO pair with join modes.
pub mod fifo;
pub use fifo::{FifoDirection, FifoPair, FIFO_DEPTH, FIFO_SLOTS};

/// Shared instruction memory.
pub mod memory;
pub use memory::{InstructionMemory, INSTRUCTION_MEMORY_WORDS};

/// Program hex-dump format.
pub mod program;
pub use program::Program;

/// State machine execution.
pub mod sm;
pub use sm::{
    CycleContext, ExecControl, InstructionOrigin, PinControl, PinWrite, SmCore, SmCycle,
    StateMachine, EXECCTRL_RESET, PINCTRL_RESET, SM_COUNT,
};

/// PIO block aggregation.
pub mod block;
pub use block::{BlockCycle, PioBlock, DBG_CFGINFO};

/// GPIO bank, overrides and pads.
pub mod gpio;
pub use gpio::{
    GpioBank, GpioControl, Override, PinSignals, PioOutputs, FUNCSEL_NULL, FUNCSEL_PIO0,
    FUNCSEL_PIO1, GPIO_COUNT,
};

/// Register address map.
pub mod registers;
pub use registers::{
    pio_base, AddressSpace, Alias, IoBank0Register, PadsBank0Register, PicoEmuRegister,
    PioEmuRegister, PioRegister, Register, SmEmuField, SmField, IO_BANK0_BASE, PADS_BANK0_BASE,
    PICO_EMU_BASE, PIO0_BASE, PIO1_BASE, PIO_EMU_OFFSET,
};

/// Top-level emulator.
pub mod emulator;
pub use emulator::{Emulator, PIO_COUNT};

/// Shared handle and blocking wait.
pub mod wait;
pub use wait::{CancelToken, SharedEmulator, WaitOutcome, WaitStatus};

/// Remote request/response contract.
pub mod remote;
pub use remote::{RegisterService, Request, Response};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
