//! PIO instruction decoder.
//!
//! Decoding is total: every 16-bit word maps to some [`Instruction`]. The
//! split of the 5-bit delay/side-set field depends on the state machine's
//! current `PINCTRL_SIDESET_COUNT` and `EXECCTRL_SIDE_EN`, so it is supplied
//! at decode time and never stored alongside the raw opcode.

use std::fmt;

/// Width of the shared delay/side-set field (opcode bits 12..8).
pub const DELAY_SIDE_SET_FIELD_BITS: u8 = 5;

/// Largest meaningful `PINCTRL_SIDESET_COUNT`.
pub const MAX_SIDE_SET_COUNT: u8 = 5;

/// Primary instruction class selected by opcode bits 15..13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum OpcodeClass {
    /// `000`: conditional jump.
    Jmp = 0,
    /// `001`: stall until a pin or IRQ condition holds.
    Wait = 1,
    /// `010`: shift bits into the ISR.
    In = 2,
    /// `011`: shift bits out of the OSR.
    Out = 3,
    /// `100`: `PUSH` or `PULL`, told apart by bit 7.
    PushPull = 4,
    /// `101`: register copy with optional bit operation.
    Mov = 5,
    /// `110`: raise, clear or wait on an IRQ flag.
    Irq = 6,
    /// `111`: write an immediate.
    Set = 7,
}

impl OpcodeClass {
    /// Classifies an opcode by its top three bits.
    #[must_use]
    pub const fn of(opcode: u16) -> Self {
        match (opcode >> 13) & 0x7 {
            0 => Self::Jmp,
            1 => Self::Wait,
            2 => Self::In,
            3 => Self::Out,
            4 => Self::PushPull,
            5 => Self::Mov,
            6 => Self::Irq,
            _ => Self::Set,
        }
    }
}

/// `JMP` condition field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum JmpCondition {
    /// Unconditional.
    Always,
    /// `!X`: scratch X is zero.
    XZero,
    /// `X--`: X non-zero, post-decrement.
    XPostDecrement,
    /// `!Y`: scratch Y is zero.
    YZero,
    /// `Y--`: Y non-zero, post-decrement.
    YPostDecrement,
    /// `X!=Y`.
    XNotEqualY,
    /// `PIN`: the `EXECCTRL_JMP_PIN` input is high.
    Pin,
    /// `!OSRE`: output shift register not empty.
    OsrNotEmpty,
}

impl JmpCondition {
    const fn from_u3(bits: u16) -> Self {
        match bits & 0x7 {
            0 => Self::Always,
            1 => Self::XZero,
            2 => Self::XPostDecrement,
            3 => Self::YZero,
            4 => Self::YPostDecrement,
            5 => Self::XNotEqualY,
            6 => Self::Pin,
            _ => Self::OsrNotEmpty,
        }
    }
}

/// `WAIT` source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WaitSource {
    /// Absolute GPIO number.
    Gpio,
    /// Input pin relative to `PINCTRL_IN_BASE`.
    Pin,
    /// PIO IRQ flag.
    Irq,
    /// Encoding `11`, reserved on RP2040.
    Reserved,
}

/// `IN` source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InSource {
    /// Input pins from `PINCTRL_IN_BASE`.
    Pins,
    /// Scratch X.
    X,
    /// Scratch Y.
    Y,
    /// Zeroes.
    Null,
    /// Encoding `100`, reserved; reads as zero.
    Reserved4,
    /// Encoding `101`, reserved; reads as zero.
    Reserved5,
    /// The ISR itself.
    Isr,
    /// The OSR.
    Osr,
}

/// `OUT` destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OutDestination {
    /// Output pins from `PINCTRL_OUT_BASE`.
    Pins,
    /// Scratch X.
    X,
    /// Scratch Y.
    Y,
    /// Discard.
    Null,
    /// Pin directions from `PINCTRL_OUT_BASE`.
    PinDirs,
    /// Jump to the shifted-out address.
    Pc,
    /// ISR, also setting the ISR counter.
    Isr,
    /// Execute the shifted-out word as the next instruction.
    Exec,
}

/// `MOV` destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MovDestination {
    /// Output pins from `PINCTRL_OUT_BASE`.
    Pins,
    /// Scratch X.
    X,
    /// Scratch Y.
    Y,
    /// Encoding `011`, reserved; the write is dropped.
    Reserved3,
    /// Execute the value as the next instruction.
    Exec,
    /// Jump to the value.
    Pc,
    /// ISR; clears the ISR counter.
    Isr,
    /// OSR; clears the OSR counter.
    Osr,
}

/// `MOV` bit operation applied to the source value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MovOp {
    /// Copy unchanged.
    None,
    /// `~`: bitwise complement.
    Invert,
    /// `::`: bit reverse.
    BitReverse,
    /// Encoding `11`, reserved; copies unchanged.
    Reserved,
}

/// `MOV` source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MovSource {
    /// Input pins from `PINCTRL_IN_BASE`.
    Pins,
    /// Scratch X.
    X,
    /// Scratch Y.
    Y,
    /// Zero.
    Null,
    /// Encoding `100`, reserved; reads as zero.
    Reserved4,
    /// All-ones or all-zeroes per `EXECCTRL_STATUS_SEL`/`STATUS_N`.
    Status,
    /// ISR.
    Isr,
    /// OSR.
    Osr,
}

/// `SET` destination field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SetDestination {
    /// Pins from `PINCTRL_SET_BASE`.
    Pins,
    /// Scratch X; bits 31..5 are cleared.
    X,
    /// Scratch Y; bits 31..5 are cleared.
    Y,
    /// Encoding `011`, reserved.
    Reserved3,
    /// Pin directions from `PINCTRL_SET_BASE`.
    PinDirs,
    /// Encoding `101`, reserved.
    Reserved5,
    /// Encoding `110`, reserved.
    Reserved6,
    /// Encoding `111`, reserved.
    Reserved7,
}

/// 5-bit IRQ index as encoded in `WAIT IRQ` and `IRQ` instructions.
///
/// Bit 4 selects relative addressing; bits 2..0 select one of eight flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IrqIndex(u8);

impl IrqIndex {
    /// Wraps a raw 5-bit index field.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw & 0x1f)
    }

    /// Raw 5-bit field.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Returns `true` when the `REL` bit is set.
    #[must_use]
    pub const fn is_relative(self) -> bool {
        self.0 & 0x10 != 0
    }

    /// Flag number (0..=7) before relative adjustment.
    #[must_use]
    pub const fn flag(self) -> u8 {
        self.0 & 0x7
    }

    /// Resolves the flag number for state machine `sm`.
    ///
    /// With `REL`, the state machine number is added modulo 4 to the two
    /// least significant bits, leaving bit 2 untouched.
    #[must_use]
    pub const fn resolve(self, sm: u8) -> u8 {
        let flag = self.flag();
        if self.is_relative() {
            (flag & 0x4) | ((flag + sm) & 0x3)
        } else {
            flag
        }
    }
}

/// Class-specific operands of a decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Operation {
    /// `JMP cond, addr`.
    Jmp {
        /// Jump condition.
        condition: JmpCondition,
        /// Absolute target address.
        address: u8,
    },
    /// `WAIT pol source index`.
    Wait {
        /// Level or flag state waited for.
        polarity: bool,
        /// What is waited on.
        source: WaitSource,
        /// Raw 5-bit index.
        index: u8,
    },
    /// `IN source, count`.
    In {
        /// Data source.
        source: InSource,
        /// Bits shifted in, 1..=32.
        bit_count: u8,
    },
    /// `OUT destination, count`.
    Out {
        /// Data destination.
        destination: OutDestination,
        /// Bits shifted out, 1..=32.
        bit_count: u8,
    },
    /// `PUSH (iffull) (block|noblock)`.
    Push {
        /// Only push when the input shift count reached the threshold.
        if_full: bool,
        /// Stall when the RX FIFO is full.
        block: bool,
    },
    /// `PULL (ifempty) (block|noblock)`.
    Pull {
        /// Only pull when the output shift count reached the threshold.
        if_empty: bool,
        /// Stall when the TX FIFO is empty.
        block: bool,
    },
    /// `MOV destination, (op) source`.
    Mov {
        /// Data destination.
        destination: MovDestination,
        /// Bit operation.
        op: MovOp,
        /// Data source.
        source: MovSource,
    },
    /// `IRQ (clear|wait) index`.
    Irq {
        /// Clear instead of set.
        clear: bool,
        /// Stall until the raised flag is cleared again.
        wait: bool,
        /// Flag index.
        index: IrqIndex,
    },
    /// `SET destination, data`.
    Set {
        /// Data destination.
        destination: SetDestination,
        /// 5-bit literal.
        data: u8,
    },
}

/// How the delay/side-set field of one opcode is partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FieldLayout {
    side_set_count: u8,
    side_en: bool,
}

impl FieldLayout {
    /// Builds a layout from `PINCTRL_SIDESET_COUNT` and `EXECCTRL_SIDE_EN`.
    ///
    /// Counts above five are clamped; `side_en` is ignored for a count of 0.
    #[must_use]
    pub const fn new(side_set_count: u8, side_en: bool) -> Self {
        let count = if side_set_count > MAX_SIDE_SET_COUNT {
            MAX_SIDE_SET_COUNT
        } else {
            side_set_count
        };
        Self {
            side_set_count: count,
            side_en: side_en && count > 0,
        }
    }

    /// Bits of the 5-bit field consumed by side-set, including the enable bit.
    #[must_use]
    pub const fn side_set_field_bits(self) -> u8 {
        self.side_set_count
    }

    /// Bits of side-set payload driven onto pins.
    #[must_use]
    pub const fn side_set_data_bits(self) -> u8 {
        self.side_set_count - self.side_en as u8
    }

    /// Bits remaining for the delay count.
    #[must_use]
    pub const fn delay_bits(self) -> u8 {
        DELAY_SIDE_SET_FIELD_BITS - self.side_set_count
    }

    /// Returns `true` when the MSB of the field is a per-instruction enable.
    #[must_use]
    pub const fn side_en(self) -> bool {
        self.side_en
    }
}

/// A decoded opcode under a particular side-set configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    /// Raw 16-bit opcode.
    pub opcode: u16,
    /// Class-specific operands.
    pub operation: Operation,
    /// Side-set payload, when present for this instruction.
    pub side_set: Option<u8>,
    /// Delay cycles inserted after the instruction completes.
    pub delay: u8,
    /// Field partition used to decode this instruction.
    pub layout: FieldLayout,
}

impl Instruction {
    /// Instruction class (top three opcode bits).
    #[must_use]
    pub const fn class(&self) -> OpcodeClass {
        OpcodeClass::of(self.opcode)
    }

    /// Returns `true` for the canonical `nop` encoding (`mov y, y`).
    #[must_use]
    pub const fn is_nop(&self) -> bool {
        matches!(
            self.operation,
            Operation::Mov {
                destination: MovDestination::Y,
                op: MovOp::None,
                source: MovSource::Y,
            }
        )
    }
}

const fn bit_count(field: u16) -> u8 {
    let count = (field & 0x1f) as u8;
    if count == 0 {
        32
    } else {
        count
    }
}

const fn decode_operation(opcode: u16) -> Operation {
    let arg1 = (opcode >> 5) & 0x7;
    let arg2 = opcode & 0x1f;
    match OpcodeClass::of(opcode) {
        OpcodeClass::Jmp => Operation::Jmp {
            condition: JmpCondition::from_u3(arg1),
            address: arg2 as u8,
        },
        OpcodeClass::Wait => Operation::Wait {
            polarity: arg1 & 0x4 != 0,
            source: match arg1 & 0x3 {
                0 => WaitSource::Gpio,
                1 => WaitSource::Pin,
                2 => WaitSource::Irq,
                _ => WaitSource::Reserved,
            },
            index: arg2 as u8,
        },
        OpcodeClass::In => Operation::In {
            source: match arg1 {
                0 => InSource::Pins,
                1 => InSource::X,
                2 => InSource::Y,
                3 => InSource::Null,
                4 => InSource::Reserved4,
                5 => InSource::Reserved5,
                6 => InSource::Isr,
                _ => InSource::Osr,
            },
            bit_count: bit_count(arg2),
        },
        OpcodeClass::Out => Operation::Out {
            destination: match arg1 {
                0 => OutDestination::Pins,
                1 => OutDestination::X,
                2 => OutDestination::Y,
                3 => OutDestination::Null,
                4 => OutDestination::PinDirs,
                5 => OutDestination::Pc,
                6 => OutDestination::Isr,
                _ => OutDestination::Exec,
            },
            bit_count: bit_count(arg2),
        },
        OpcodeClass::PushPull => {
            let conditional = arg1 & 0x2 != 0;
            let block = arg1 & 0x1 != 0;
            if arg1 & 0x4 == 0 {
                Operation::Push {
                    if_full: conditional,
                    block,
                }
            } else {
                Operation::Pull {
                    if_empty: conditional,
                    block,
                }
            }
        }
        OpcodeClass::Mov => Operation::Mov {
            destination: match arg1 {
                0 => MovDestination::Pins,
                1 => MovDestination::X,
                2 => MovDestination::Y,
                3 => MovDestination::Reserved3,
                4 => MovDestination::Exec,
                5 => MovDestination::Pc,
                6 => MovDestination::Isr,
                _ => MovDestination::Osr,
            },
            op: match (arg2 >> 3) & 0x3 {
                0 => MovOp::None,
                1 => MovOp::Invert,
                2 => MovOp::BitReverse,
                _ => MovOp::Reserved,
            },
            source: match arg2 & 0x7 {
                0 => MovSource::Pins,
                1 => MovSource::X,
                2 => MovSource::Y,
                3 => MovSource::Null,
                4 => MovSource::Reserved4,
                5 => MovSource::Status,
                6 => MovSource::Isr,
                _ => MovSource::Osr,
            },
        },
        OpcodeClass::Irq => Operation::Irq {
            clear: arg1 & 0x2 != 0,
            wait: arg1 & 0x1 != 0,
            index: IrqIndex::new(arg2 as u8),
        },
        OpcodeClass::Set => Operation::Set {
            destination: match arg1 {
                0 => SetDestination::Pins,
                1 => SetDestination::X,
                2 => SetDestination::Y,
                3 => SetDestination::Reserved3,
                4 => SetDestination::PinDirs,
                5 => SetDestination::Reserved5,
                6 => SetDestination::Reserved6,
                _ => SetDestination::Reserved7,
            },
            data: arg2 as u8,
        },
    }
}

/// Decodes `opcode` under the given side-set configuration.
///
/// With `side_en`, the most significant bit of the 5-bit field is the
/// per-instruction side-set enable and the payload is one bit narrower.
#[must_use]
pub const fn decode(opcode: u16, side_set_count: u8, side_en: bool) -> Instruction {
    let layout = FieldLayout::new(side_set_count, side_en);
    let field = ((opcode >> 8) & 0x1f) as u8;
    let delay_bits = layout.delay_bits();
    let delay = field & ((1u8 << delay_bits) - 1);

    let data_bits = layout.side_set_data_bits();
    let side_set = if layout.side_set_field_bits() == 0 {
        None
    } else if layout.side_en() && field & 0x10 == 0 {
        None
    } else {
        Some((field >> delay_bits) & ((1u8 << data_bits) - 1))
    };

    Instruction {
        opcode,
        operation: decode_operation(opcode),
        side_set,
        delay,
        layout,
    }
}

impl fmt::Display for JmpCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Always => "",
            Self::XZero => "!x",
            Self::XPostDecrement => "x--",
            Self::YZero => "!y",
            Self::YPostDecrement => "y--",
            Self::XNotEqualY => "x!=y",
            Self::Pin => "pin",
            Self::OsrNotEmpty => "!osre",
        };
        f.write_str(text)
    }
}

impl fmt::Display for Operation {
    #[allow(clippy::too_many_lines)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Jmp { condition, address } => {
                if condition == JmpCondition::Always {
                    write!(f, "jmp {address}")
                } else {
                    write!(f, "jmp {condition}, {address}")
                }
            }
            Self::Wait {
                polarity,
                source,
                index,
            } => {
                let pol = u8::from(polarity);
                match source {
                    WaitSource::Gpio => write!(f, "wait {pol} gpio {index}"),
                    WaitSource::Pin => write!(f, "wait {pol} pin {index}"),
                    WaitSource::Irq => {
                        let irq = IrqIndex::new(index);
                        let rel = if irq.is_relative() { " rel" } else { "" };
                        write!(f, "wait {pol} irq {}{rel}", irq.flag())
                    }
                    WaitSource::Reserved => write!(f, "wait {pol} reserved {index}"),
                }
            }
            Self::In { source, bit_count } => {
                let src = match source {
                    InSource::Pins => "pins",
                    InSource::X => "x",
                    InSource::Y => "y",
                    InSource::Null => "null",
                    InSource::Reserved4 | InSource::Reserved5 => "reserved",
                    InSource::Isr => "isr",
                    InSource::Osr => "osr",
                };
                write!(f, "in {src}, {bit_count}")
            }
            Self::Out {
                destination,
                bit_count,
            } => {
                let dst = match destination {
                    OutDestination::Pins => "pins",
                    OutDestination::X => "x",
                    OutDestination::Y => "y",
                    OutDestination::Null => "null",
                    OutDestination::PinDirs => "pindirs",
                    OutDestination::Pc => "pc",
                    OutDestination::Isr => "isr",
                    OutDestination::Exec => "exec",
                };
                write!(f, "out {dst}, {bit_count}")
            }
            Self::Push { if_full, block } => {
                let cond = if if_full { " iffull" } else { "" };
                let blocking = if block { "block" } else { "noblock" };
                write!(f, "push{cond} {blocking}")
            }
            Self::Pull { if_empty, block } => {
                let cond = if if_empty { " ifempty" } else { "" };
                let blocking = if block { "block" } else { "noblock" };
                write!(f, "pull{cond} {blocking}")
            }
            Self::Mov {
                destination,
                op,
                source,
            } => {
                if destination == MovDestination::Y && op == MovOp::None && source == MovSource::Y
                {
                    return f.write_str("nop");
                }
                let dst = match destination {
                    MovDestination::Pins => "pins",
                    MovDestination::X => "x",
                    MovDestination::Y => "y",
                    MovDestination::Reserved3 => "reserved",
                    MovDestination::Exec => "exec",
                    MovDestination::Pc => "pc",
                    MovDestination::Isr => "isr",
                    MovDestination::Osr => "osr",
                };
                let operator = match op {
                    MovOp::None => "",
                    MovOp::Invert => "~",
                    MovOp::BitReverse => "::",
                    MovOp::Reserved => "?",
                };
                let src = match source {
                    MovSource::Pins => "pins",
                    MovSource::X => "x",
                    MovSource::Y => "y",
                    MovSource::Null => "null",
                    MovSource::Reserved4 => "reserved",
                    MovSource::Status => "status",
                    MovSource::Isr => "isr",
                    MovSource::Osr => "osr",
                };
                write!(f, "mov {dst}, {operator}{src}")
            }
            Self::Irq { clear, wait, index } => {
                let mode = match (clear, wait) {
                    (true, _) => "clear",
                    (false, true) => "wait",
                    (false, false) => "set",
                };
                let rel = if index.is_relative() { " rel" } else { "" };
                write!(f, "irq {mode} {}{rel}", index.flag())
            }
            Self::Set { destination, data } => {
                let dst = match destination {
                    SetDestination::Pins => "pins",
                    SetDestination::X => "x",
                    SetDestination::Y => "y",
                    SetDestination::PinDirs => "pindirs",
                    SetDestination::Reserved3
                    | SetDestination::Reserved5
                    | SetDestination::Reserved6
                    | SetDestination::Reserved7 => "reserved",
                };
                write!(f, "set {dst}, {data}")
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(side) = self.side_set {
            write!(f, " side {side}")?;
        }
        if self.delay > 0 {
            write!(f, " [{}]", self.delay)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x0000, "jmp 0")]
    #[case(0x0043, "jmp x--, 3")]
    #[case(0x00e5, "jmp !osre, 5")]
    #[case(0x20c1, "wait 1 irq 1")]
    #[case(0x2091, "wait 1 gpio 17")]
    #[case(0x4001, "in pins, 1")]
    #[case(0x4060, "in null, 32")]
    #[case(0x6021, "out x, 1")]
    #[case(0x60e0, "out exec, 32")]
    #[case(0x8020, "push block")]
    #[case(0x8040, "push iffull noblock")]
    #[case(0x80a0, "pull block")]
    #[case(0x80e0, "pull ifempty block")]
    #[case(0xa042, "nop")]
    #[case(0xa029, "mov x, ~x")]
    #[case(0xa0d1, "mov isr, ::x")]
    #[case(0xc012, "irq set 2 rel")]
    #[case(0xc023, "irq wait 3")]
    #[case(0xc041, "irq clear 1")]
    #[case(0xe081, "set pindirs, 1")]
    #[case(0xe03f, "set x, 31")]
    fn disassembles_without_side_set(#[case] opcode: u16, #[case] text: &str) {
        assert_eq!(decode(opcode, 0, false).to_string(), text);
    }

    #[test]
    fn delay_uses_all_five_bits_without_side_set() {
        let instr = decode(0xbf42, 0, false);
        assert_eq!(instr.delay, 31);
        assert_eq!(instr.side_set, None);
        assert_eq!(instr.to_string(), "nop [31]");
    }

    #[test]
    fn side_set_takes_most_significant_bits() {
        // 0x7001: out pins, 1 with field 0b10000.
        let instr = decode(0x7001, 1, false);
        assert_eq!(instr.side_set, Some(1));
        assert_eq!(instr.delay, 0);
        assert_eq!(instr.to_string(), "out pins, 1 side 1");

        let instr = decode(0x6a01, 2, false);
        assert_eq!(instr.side_set, Some(1));
        assert_eq!(instr.delay, 2);
    }

    #[test]
    fn optional_side_set_needs_enable_bit() {
        let without = decode(0x0700, 2, true);
        assert_eq!(without.side_set, None);
        assert_eq!(without.delay, 7);

        let with = decode(0x1f00, 2, true);
        assert_eq!(with.side_set, Some(1));
        assert_eq!(with.delay, 7);
    }

    #[test]
    fn side_en_without_count_is_ignored() {
        let instr = decode(0x1f00, 0, true);
        assert_eq!(instr.side_set, None);
        assert_eq!(instr.delay, 31);
        assert!(!instr.layout.side_en());
    }

    #[test]
    fn out_of_range_side_set_count_is_clamped() {
        let instr = decode(0x1f00, 7, false);
        assert_eq!(instr.layout.side_set_field_bits(), 5);
        assert_eq!(instr.side_set, Some(31));
        assert_eq!(instr.delay, 0);
    }

    #[test]
    fn relative_irq_index_rotates_low_bits() {
        let index = IrqIndex::new(0x16);
        assert!(index.is_relative());
        assert_eq!(index.resolve(0), 6);
        assert_eq!(index.resolve(1), 7);
        assert_eq!(index.resolve(2), 4);
        assert_eq!(index.resolve(3), 5);
        assert_eq!(IrqIndex::new(0x03).resolve(3), 3);
    }

    #[test]
    fn every_opcode_decodes_with_consistent_class() {
        for opcode in 0..=u16::MAX {
            let instr = decode(opcode, 0, false);
            let class_matches = matches!(
                (instr.class(), instr.operation),
                (OpcodeClass::Jmp, Operation::Jmp { .. })
                    | (OpcodeClass::Wait, Operation::Wait { .. })
                    | (OpcodeClass::In, Operation::In { .. })
                    | (OpcodeClass::Out, Operation::Out { .. })
                    | (OpcodeClass::PushPull, Operation::Push { .. } | Operation::Pull { .. })
                    | (OpcodeClass::Mov, Operation::Mov { .. })
                    | (OpcodeClass::Irq, Operation::Irq { .. })
                    | (OpcodeClass::Set, Operation::Set { .. })
            );
            assert!(class_matches, "{opcode:#06x} decoded to {:?}", instr.operation);
        }
    }

    proptest! {
        #[test]
        fn field_split_always_covers_five_bits(
            opcode in any::<u16>(),
            count in 0u8..=5,
            side_en in any::<bool>(),
        ) {
            let side_en = side_en && count > 0;
            let instr = decode(opcode, count, side_en);
            let layout = instr.layout;
            prop_assert_eq!(layout.side_set_field_bits() + layout.delay_bits(), 5);
            prop_assert_eq!(layout.side_set_data_bits(), count - u8::from(side_en));
            prop_assert!(u32::from(instr.delay) < (1u32 << layout.delay_bits()));
            if let Some(side) = instr.side_set {
                prop_assert!(u32::from(side) < (1u32 << layout.side_set_data_bits()));
            }
        }

        #[test]
        fn operands_do_not_depend_on_side_set_config(
            opcode in any::<u16>(),
            count in 0u8..=5,
        ) {
            prop_assert_eq!(
                decode(opcode, count, false).operation,
                decode(opcode, 0, false).operation
            );
        }
    }
}
