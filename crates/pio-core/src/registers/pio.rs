//! PIO block register layout and its emulator extension.

#![allow(clippy::cast_possible_truncation)]

use crate::sm::SM_COUNT;

const TXF_BASE: u32 = 0x010;
const RXF_BASE: u32 = 0x020;
const INSTR_MEM_BASE: u32 = 0x048;
const SM_BASE: u32 = 0x0c8;
const SM_STRIDE: u32 = 0x18;
const IRQ_GROUP_BASE: u32 = 0x12c;
const IRQ_GROUP_STRIDE: u32 = 0x0c;

const EMU_SM_STRIDE: u32 = 0x60;
const EMU_FIFO_MEM_BASE: u32 = 0x1c;
const EMU_GPIO_PINS: u32 = 0x180;
const EMU_GPIO_PINDIRS: u32 = 0x184;

/// Per-state-machine silicon register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SmField {
    /// `SMx_CLKDIV`: clock divider.
    Clkdiv,
    /// `SMx_EXECCTRL`: wrap, side-set enable, status and sticky controls.
    Execctrl,
    /// `SMx_SHIFTCTRL`: shift directions, thresholds and FIFO joins.
    Shiftctrl,
    /// `SMx_ADDR`: current program counter (read-only).
    Addr,
    /// `SMx_INSTR`: reads the current opcode; writes force one.
    Instr,
    /// `SMx_PINCTRL`: pin bases and counts.
    Pinctrl,
}

impl SmField {
    const ALL: [Self; 6] = [
        Self::Clkdiv,
        Self::Execctrl,
        Self::Shiftctrl,
        Self::Addr,
        Self::Instr,
        Self::Pinctrl,
    ];

    const fn name(self) -> &'static str {
        match self {
            Self::Clkdiv => "CLKDIV",
            Self::Execctrl => "EXECCTRL",
            Self::Shiftctrl => "SHIFTCTRL",
            Self::Addr => "ADDR",
            Self::Instr => "INSTR",
            Self::Pinctrl => "PINCTRL",
        }
    }

    const fn index(self) -> u32 {
        self as u32
    }
}

/// Silicon PIO register, relative to the block base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PioRegister {
    /// `CTRL`: enables and restart strobes.
    Ctrl,
    /// `FSTAT`: FIFO full/empty flags.
    Fstat,
    /// `FDEBUG`: sticky FIFO debug flags.
    Fdebug,
    /// `FLEVEL`: FIFO levels.
    Flevel,
    /// `TXFn`: TX FIFO write port.
    Txf(usize),
    /// `RXFn`: RX FIFO read port.
    Rxf(usize),
    /// `IRQ`: state machine IRQ flags.
    Irq,
    /// `IRQ_FORCE`.
    IrqForce,
    /// `INPUT_SYNC_BYPASS`.
    InputSyncBypass,
    /// `DBG_PADOUT`.
    DbgPadout,
    /// `DBG_PADOE`.
    DbgPadoe,
    /// `DBG_CFGINFO`.
    DbgCfginfo,
    /// `INSTR_MEMn`.
    InstrMem(usize),
    /// `SMn_*`.
    Sm(usize, SmField),
    /// `INTR`: raw interrupt sources.
    Intr,
    /// `IRQn_INTE`.
    Inte(usize),
    /// `IRQn_INTF`.
    Intf(usize),
    /// `IRQn_INTS`.
    Ints(usize),
}

impl PioRegister {
    /// Decodes a word-aligned offset.
    #[must_use]
    pub const fn from_offset(offset: u32) -> Option<Self> {
        if offset & 0x3 != 0 {
            return None;
        }
        let reg = match offset {
            0x000 => Self::Ctrl,
            0x004 => Self::Fstat,
            0x008 => Self::Fdebug,
            0x00c => Self::Flevel,
            0x010..=0x01c => Self::Txf(((offset - TXF_BASE) / 4) as usize),
            0x020..=0x02c => Self::Rxf(((offset - RXF_BASE) / 4) as usize),
            0x030 => Self::Irq,
            0x034 => Self::IrqForce,
            0x038 => Self::InputSyncBypass,
            0x03c => Self::DbgPadout,
            0x040 => Self::DbgPadoe,
            0x044 => Self::DbgCfginfo,
            0x048..=0x0c4 => Self::InstrMem(((offset - INSTR_MEM_BASE) / 4) as usize),
            0x0c8..=0x124 => {
                let relative = offset - SM_BASE;
                let field = SmField::ALL[((relative % SM_STRIDE) / 4) as usize];
                Self::Sm((relative / SM_STRIDE) as usize, field)
            }
            0x128 => Self::Intr,
            0x12c..=0x140 => {
                let relative = offset - IRQ_GROUP_BASE;
                let group = (relative / IRQ_GROUP_STRIDE) as usize;
                match (relative % IRQ_GROUP_STRIDE) / 4 {
                    0 => Self::Inte(group),
                    1 => Self::Intf(group),
                    _ => Self::Ints(group),
                }
            }
            _ => return None,
        };
        Some(reg)
    }

    /// Offset from the block base.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Ctrl => 0x000,
            Self::Fstat => 0x004,
            Self::Fdebug => 0x008,
            Self::Flevel => 0x00c,
            Self::Txf(sm) => TXF_BASE + 4 * sm as u32,
            Self::Rxf(sm) => RXF_BASE + 4 * sm as u32,
            Self::Irq => 0x030,
            Self::IrqForce => 0x034,
            Self::InputSyncBypass => 0x038,
            Self::DbgPadout => 0x03c,
            Self::DbgPadoe => 0x040,
            Self::DbgCfginfo => 0x044,
            Self::InstrMem(index) => INSTR_MEM_BASE + 4 * index as u32,
            Self::Sm(sm, field) => SM_BASE + SM_STRIDE * sm as u32 + 4 * field.index(),
            Self::Intr => 0x128,
            Self::Inte(group) => IRQ_GROUP_BASE + IRQ_GROUP_STRIDE * group as u32,
            Self::Intf(group) => IRQ_GROUP_BASE + IRQ_GROUP_STRIDE * group as u32 + 4,
            Self::Ints(group) => IRQ_GROUP_BASE + IRQ_GROUP_STRIDE * group as u32 + 8,
        }
    }

    /// Register name without the block prefix.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Ctrl => "CTRL".into(),
            Self::Fstat => "FSTAT".into(),
            Self::Fdebug => "FDEBUG".into(),
            Self::Flevel => "FLEVEL".into(),
            Self::Txf(sm) => format!("TXF{sm}"),
            Self::Rxf(sm) => format!("RXF{sm}"),
            Self::Irq => "IRQ".into(),
            Self::IrqForce => "IRQ_FORCE".into(),
            Self::InputSyncBypass => "INPUT_SYNC_BYPASS".into(),
            Self::DbgPadout => "DBG_PADOUT".into(),
            Self::DbgPadoe => "DBG_PADOE".into(),
            Self::DbgCfginfo => "DBG_CFGINFO".into(),
            Self::InstrMem(index) => format!("INSTR_MEM{index}"),
            Self::Sm(sm, field) => format!("SM{sm}_{}", field.name()),
            Self::Intr => "INTR".into(),
            Self::Inte(group) => format!("IRQ{group}_INTE"),
            Self::Intf(group) => format!("IRQ{group}_INTF"),
            Self::Ints(group) => format!("IRQ{group}_INTS"),
        }
    }

    /// Writes are actions, not stores; unmasked bits of a masked write
    /// must not be replayed.
    #[must_use]
    pub const fn is_action(self) -> bool {
        matches!(
            self,
            Self::Txf(_)
                | Self::Rxf(_)
                | Self::Fdebug
                | Self::Irq
                | Self::IrqForce
                | Self::Sm(_, SmField::Instr)
        )
    }
}

/// Per-state-machine emulator extension register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum SmEmuField {
    /// Scratch register X.
    RegX,
    /// Scratch register Y.
    RegY,
    /// Program counter.
    Pc,
    /// Input shift register.
    Isr,
    /// Input shift counter.
    IsrShiftCount,
    /// Output shift register.
    Osr,
    /// Output shift counter.
    OsrShiftCount,
    /// Raw FIFO storage slot.
    FifoMem(usize),
    /// Clock enable of the last cycle (read-only).
    ClkEnable,
    /// Remaining delay cycles.
    Delay,
    /// Last cycle was a delay cycle (read-only).
    DelayCycle,
    /// Origin of the last instruction (read-only).
    InstrOrigin,
    /// Forced instruction slot.
    ForcedInstr,
    /// Breakpoint address mask.
    Breakpoints,
}

impl SmEmuField {
    const fn from_offset(offset: u32) -> Option<Self> {
        let field = match offset {
            0x00 => Self::RegX,
            0x04 => Self::RegY,
            0x08 => Self::Pc,
            0x0c => Self::Isr,
            0x10 => Self::IsrShiftCount,
            0x14 => Self::Osr,
            0x18 => Self::OsrShiftCount,
            0x1c..=0x38 => Self::FifoMem(((offset - EMU_FIFO_MEM_BASE) / 4) as usize),
            0x3c => Self::ClkEnable,
            0x40 => Self::Delay,
            0x44 => Self::DelayCycle,
            0x48 => Self::InstrOrigin,
            0x4c => Self::ForcedInstr,
            0x50 => Self::Breakpoints,
            _ => return None,
        };
        Some(field)
    }

    const fn offset(self) -> u32 {
        match self {
            Self::RegX => 0x00,
            Self::RegY => 0x04,
            Self::Pc => 0x08,
            Self::Isr => 0x0c,
            Self::IsrShiftCount => 0x10,
            Self::Osr => 0x14,
            Self::OsrShiftCount => 0x18,
            Self::FifoMem(slot) => EMU_FIFO_MEM_BASE + 4 * slot as u32,
            Self::ClkEnable => 0x3c,
            Self::Delay => 0x40,
            Self::DelayCycle => 0x44,
            Self::InstrOrigin => 0x48,
            Self::ForcedInstr => 0x4c,
            Self::Breakpoints => 0x50,
        }
    }

    fn name(self) -> String {
        match self {
            Self::RegX => "REGX".into(),
            Self::RegY => "REGY".into(),
            Self::Pc => "PC".into(),
            Self::Isr => "ISR".into(),
            Self::IsrShiftCount => "ISR_SHIFT_COUNT".into(),
            Self::Osr => "OSR".into(),
            Self::OsrShiftCount => "OSR_SHIFT_COUNT".into(),
            Self::FifoMem(slot) => format!("FIFO_MEM{slot}"),
            Self::ClkEnable => "CLK_ENABLE".into(),
            Self::Delay => "DELAY".into(),
            Self::DelayCycle => "DELAY_CYCLE".into(),
            Self::InstrOrigin => "INSTR_ORIGIN".into(),
            Self::ForcedInstr => "FORCED_INSTR".into(),
            Self::Breakpoints => "BREAKPOINTS".into(),
        }
    }
}

/// Emulator-only PIO register, relative to the extension base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PioEmuRegister {
    /// Per-state-machine register.
    Sm(usize, SmEmuField),
    /// Block output level latch.
    GpioPins,
    /// Block output direction latch.
    GpioPinDirs,
}

impl PioEmuRegister {
    /// Decodes a word-aligned offset.
    #[must_use]
    pub const fn from_offset(offset: u32) -> Option<Self> {
        if offset & 0x3 != 0 {
            return None;
        }
        match offset {
            EMU_GPIO_PINS => Some(Self::GpioPins),
            EMU_GPIO_PINDIRS => Some(Self::GpioPinDirs),
            _ if offset < EMU_SM_STRIDE * SM_COUNT as u32 => {
                match SmEmuField::from_offset(offset % EMU_SM_STRIDE) {
                    Some(field) => Some(Self::Sm((offset / EMU_SM_STRIDE) as usize, field)),
                    None => None,
                }
            }
            _ => None,
        }
    }

    /// Offset from the extension base.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Sm(sm, field) => EMU_SM_STRIDE * sm as u32 + field.offset(),
            Self::GpioPins => EMU_GPIO_PINS,
            Self::GpioPinDirs => EMU_GPIO_PINDIRS,
        }
    }

    /// Register name without the block prefix.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Sm(sm, field) => format!("SM{sm}_{}", field.name()),
            Self::GpioPins => "GPIO_PINS".into(),
            Self::GpioPinDirs => "GPIO_PINDIRS".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pio_offset_round_trips() {
        for offset in (0..0x200).step_by(4) {
            if let Some(reg) = PioRegister::from_offset(offset) {
                assert_eq!(reg.offset(), offset, "{reg:?}");
            }
        }
    }

    #[test]
    fn every_emu_offset_round_trips() {
        let mut known = 0;
        for offset in (0..0x200).step_by(4) {
            if let Some(reg) = PioEmuRegister::from_offset(offset) {
                assert_eq!(reg.offset(), offset, "{reg:?}");
                known += 1;
            }
        }
        assert_eq!(known, 4 * 21 + 2);
    }

    #[test]
    fn state_machine_blocks_are_strided() {
        assert_eq!(
            PioRegister::from_offset(0x0c8 + 0x18 * 2 + 0x10),
            Some(PioRegister::Sm(2, SmField::Instr))
        );
        assert_eq!(
            PioEmuRegister::from_offset(0x60 * 3 + 0x38),
            Some(PioEmuRegister::Sm(3, SmEmuField::FifoMem(7)))
        );
    }
}
