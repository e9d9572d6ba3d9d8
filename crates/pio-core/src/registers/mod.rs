//! Memory-mapped register address space.
//!
//! Every address decodes into one [`Register`] variant or is rejected. The
//! two PIO blocks share one parameterized layout and differ only in their
//! base address; their emulator extensions follow the same rule.

mod pio;
mod system;

pub use pio::{PioEmuRegister, PioRegister, SmEmuField, SmField};
pub use system::{IoBank0Register, PadsBank0Register, PicoEmuRegister};

use crate::error::PioResult;

/// Base address of PIO0.
pub const PIO0_BASE: u32 = 0x5020_0000;
/// Base address of PIO1.
pub const PIO1_BASE: u32 = 0x5030_0000;
/// Offset of a PIO block's emulator extension from the block base.
pub const PIO_EMU_OFFSET: u32 = 0x4000;
/// Base address of `IO_BANK0`.
pub const IO_BANK0_BASE: u32 = 0x4001_4000;
/// Base address of `PADS_BANK0`.
pub const PADS_BANK0_BASE: u32 = 0x4001_c000;
/// Base address of the global emulator registers.
pub const PICO_EMU_BASE: u32 = 0x5800_0000;

const ALIAS_MASK: u32 = 0x3000;
const BLOCK_SPAN: u32 = 0x1000;

/// Base address of PIO block `pio`.
#[must_use]
pub const fn pio_base(pio: usize) -> u32 {
    if pio == 0 {
        PIO0_BASE
    } else {
        PIO1_BASE
    }
}

/// RP2040 atomic register alias selected by address bits 13..12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Alias {
    /// Plain access (`+0x0000`).
    Normal,
    /// Bitwise XOR on write (`+0x1000`).
    Xor,
    /// Bitwise set on write (`+0x2000`).
    Set,
    /// Bitwise clear on write (`+0x3000`).
    Clear,
}

impl Alias {
    const fn from_offset(offset: u32) -> Self {
        match (offset & ALIAS_MASK) >> 12 {
            0 => Self::Normal,
            1 => Self::Xor,
            2 => Self::Set,
            _ => Self::Clear,
        }
    }

    /// Address offset of this alias.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Normal => 0,
            Self::Xor => 0x1000,
            Self::Set => 0x2000,
            Self::Clear => 0x3000,
        }
    }

    /// `(value, mask)` pair for the masked write this alias performs, given
    /// the written data and the register's current value.
    #[must_use]
    pub const fn masked_write(self, data: u32, current: u32) -> (u32, u32) {
        match self {
            Self::Normal => (data, u32::MAX),
            Self::Xor => (current ^ data, data),
            Self::Set => (u32::MAX, data),
            Self::Clear => (0, data),
        }
    }
}

/// A decoded register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Register {
    /// Silicon PIO register.
    Pio {
        /// Block index.
        pio: usize,
        /// Atomic alias.
        alias: Alias,
        /// Register.
        reg: PioRegister,
    },
    /// Emulator-only PIO extension register.
    PioEmu {
        /// Block index.
        pio: usize,
        /// Register.
        reg: PioEmuRegister,
    },
    /// Global emulator register.
    PicoEmu(PicoEmuRegister),
    /// `IO_BANK0` register.
    IoBank0 {
        /// Atomic alias.
        alias: Alias,
        /// Register.
        reg: IoBank0Register,
    },
    /// `PADS_BANK0` register.
    PadsBank0 {
        /// Atomic alias.
        alias: Alias,
        /// Register.
        reg: PadsBank0Register,
    },
}

impl Register {
    /// Decodes `address`, or returns `None` when no register lives there.
    #[must_use]
    pub fn decode(address: u32) -> Option<Self> {
        if address & 0x3 != 0 {
            return None;
        }
        for pio in 0..2 {
            let base = pio_base(pio);
            if (base..base + PIO_EMU_OFFSET).contains(&address) {
                let offset = address - base;
                return PioRegister::from_offset(offset & !ALIAS_MASK).map(|reg| Self::Pio {
                    pio,
                    alias: Alias::from_offset(offset),
                    reg,
                });
            }
            let emu_base = base + PIO_EMU_OFFSET;
            if (emu_base..emu_base + BLOCK_SPAN).contains(&address) {
                return PioEmuRegister::from_offset(address - emu_base)
                    .map(|reg| Self::PioEmu { pio, reg });
            }
        }
        if (PICO_EMU_BASE..PICO_EMU_BASE + BLOCK_SPAN).contains(&address) {
            return PicoEmuRegister::from_offset(address - PICO_EMU_BASE).map(Self::PicoEmu);
        }
        if (IO_BANK0_BASE..IO_BANK0_BASE + 4 * BLOCK_SPAN).contains(&address) {
            let offset = address - IO_BANK0_BASE;
            return IoBank0Register::from_offset(offset & !ALIAS_MASK).map(|reg| Self::IoBank0 {
                alias: Alias::from_offset(offset),
                reg,
            });
        }
        if (PADS_BANK0_BASE..PADS_BANK0_BASE + 4 * BLOCK_SPAN).contains(&address) {
            let offset = address - PADS_BANK0_BASE;
            return PadsBank0Register::from_offset(offset & !ALIAS_MASK).map(|reg| {
                Self::PadsBank0 {
                    alias: Alias::from_offset(offset),
                    reg,
                }
            });
        }
        None
    }

    /// Address of this register (including its alias offset).
    #[must_use]
    pub const fn address(self) -> u32 {
        match self {
            Self::Pio { pio, alias, reg } => pio_base(pio) + alias.offset() + reg.offset(),
            Self::PioEmu { pio, reg } => pio_base(pio) + PIO_EMU_OFFSET + reg.offset(),
            Self::PicoEmu(reg) => PICO_EMU_BASE + reg.offset(),
            Self::IoBank0 { alias, reg } => IO_BANK0_BASE + alias.offset() + reg.offset(),
            Self::PadsBank0 { alias, reg } => PADS_BANK0_BASE + alias.offset() + reg.offset(),
        }
    }

    /// Atomic alias of the access.
    #[must_use]
    pub const fn alias(self) -> Alias {
        match self {
            Self::Pio { alias, .. } | Self::IoBank0 { alias, .. } | Self::PadsBank0 { alias, .. } => {
                alias
            }
            Self::PioEmu { .. } | Self::PicoEmu(_) => Alias::Normal,
        }
    }

    /// Same register accessed without an alias.
    #[must_use]
    pub const fn canonical(self) -> Self {
        match self {
            Self::Pio { pio, reg, .. } => Self::Pio {
                pio,
                alias: Alias::Normal,
                reg,
            },
            Self::IoBank0 { reg, .. } => Self::IoBank0 {
                alias: Alias::Normal,
                reg,
            },
            Self::PadsBank0 { reg, .. } => Self::PadsBank0 {
                alias: Alias::Normal,
                reg,
            },
            other => other,
        }
    }

    /// Human-readable register name, with an alias suffix when aliased.
    #[must_use]
    pub fn label(self) -> String {
        let name = match self {
            Self::Pio { pio, reg, .. } => format!("PIO{pio}_{}", reg.name()),
            Self::PioEmu { pio, reg } => format!("PIO{pio}_{}", reg.name()),
            Self::PicoEmu(reg) => format!("PICOEMU_{}", reg.name()),
            Self::IoBank0 { reg, .. } => format!("IO_BANK0_{}", reg.name()),
            Self::PadsBank0 { reg, .. } => format!("PADS_BANK0_{}", reg.name()),
        };
        match self.alias() {
            Alias::Normal => name,
            Alias::Xor => format!("{name}_XOR"),
            Alias::Set => format!("{name}_SET"),
            Alias::Clear => format!("{name}_CLR"),
        }
    }
}

/// Register-level access to emulated state.
///
/// Reads take `&mut self` because some registers (RX FIFO ports) have read
/// side effects; [`AddressSpace::peek`] is the side-effect-free variant.
pub trait AddressSpace {
    /// Reads the register at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PioError::InvalidAddress`] for unknown addresses.
    fn read(&mut self, address: u32) -> PioResult<u32>;

    /// Reads the register at `address` without side effects.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PioError::InvalidAddress`] for unknown addresses.
    fn peek(&self, address: u32) -> PioResult<u32>;

    /// Writes the register at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PioError::InvalidAddress`] for unknown addresses and
    /// [`crate::PioError::InvalidConfig`] for rejected configuration values.
    fn write(&mut self, address: u32, value: u32) -> PioResult<()>;

    /// Value that bits outside the mask keep during a masked write.
    ///
    /// Registers whose writes are actions rather than stores (FIFO ports,
    /// write-1-to-clear flags, strobes) report 0 so unmasked bits have no
    /// effect.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PioError::InvalidAddress`] for unknown addresses.
    fn masked_write_base(&self, address: u32) -> PioResult<u32>;

    /// Returns `true` when `address` decodes to a register.
    fn provides_address(&self, address: u32) -> bool;

    /// Register name for `address`, or its hex form when unknown.
    fn label_for_address(&self, address: u32) -> String;

    /// Writes only the bits selected by `mask`.
    ///
    /// # Errors
    ///
    /// Same as [`AddressSpace::write`].
    fn write_masked(&mut self, address: u32, value: u32, mask: u32) -> PioResult<()> {
        let base = self.masked_write_base(address)?;
        self.write(address, (base & !mask) | (value & mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x5020_0000, "PIO0_CTRL")]
    #[case(0x5030_0014, "PIO1_TXF1")]
    #[case(0x5020_0048, "PIO0_INSTR_MEM0")]
    #[case(0x5020_00c4, "PIO0_INSTR_MEM31")]
    #[case(0x5020_00e0, "PIO0_SM1_CLKDIV")]
    #[case(0x5030_0124, "PIO1_SM3_PINCTRL")]
    #[case(0x5020_0140, "PIO0_IRQ1_INTS")]
    #[case(0x5020_2000, "PIO0_CTRL_SET")]
    #[case(0x5020_3030, "PIO0_IRQ_CLR")]
    #[case(0x5020_4060, "PIO0_SM1_REGX")]
    #[case(0x5030_4180, "PIO1_GPIO_PINS")]
    #[case(0x5800_001c, "PICOEMU_RESET")]
    #[case(0x4001_4024, "IO_BANK0_GPIO4_CTRL")]
    #[case(0x4001_c080, "PADS_BANK0_SWD")]
    fn decodes_and_labels(#[case] address: u32, #[case] label: &str) {
        let reg = Register::decode(address).expect("known register");
        assert_eq!(reg.label(), label);
        assert_eq!(reg.address(), address);
    }

    #[rstest]
    #[case(0x5020_0001)]
    #[case(0x5020_0144)]
    #[case(0x5020_4188)]
    #[case(0x5020_8000)]
    #[case(0x4001_40f0)]
    #[case(0x4001_c084)]
    #[case(0x5800_0020)]
    #[case(0x0000_0000)]
    fn rejects_unmapped_addresses(#[case] address: u32) {
        assert_eq!(Register::decode(address), None);
    }

    #[test]
    fn pio_blocks_share_one_layout() {
        for offset in (0..0x144).step_by(4) {
            let pio0 = Register::decode(PIO0_BASE + offset);
            let pio1 = Register::decode(PIO1_BASE + offset);
            match (pio0, pio1) {
                (
                    Some(Register::Pio { reg: reg0, .. }),
                    Some(Register::Pio { reg: reg1, pio: 1, .. }),
                ) => assert_eq!(reg0, reg1),
                other => panic!("offset {offset:#x} decoded to {other:?}"),
            }
        }
    }

    #[rstest]
    #[case(Alias::Normal, 0xf0, 0x0f, (0xf0, u32::MAX))]
    #[case(Alias::Set, 0xf0, 0x0f, (u32::MAX, 0xf0))]
    #[case(Alias::Clear, 0xf0, 0x0f, (0, 0xf0))]
    #[case(Alias::Xor, 0xff, 0x0f, (0xf0, 0xff))]
    fn alias_write_maps_to_masked_write(
        #[case] alias: Alias,
        #[case] data: u32,
        #[case] current: u32,
        #[case] expected: (u32, u32),
    ) {
        assert_eq!(alias.masked_write(data, current), expected);
    }
}
