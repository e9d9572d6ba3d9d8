//! GPIO bank, pad and global emulator register layouts.

#![allow(clippy::cast_possible_truncation)]

use crate::gpio::GPIO_COUNT;

/// Global emulator register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PicoEmuRegister {
    /// Low word of the emulated cycle counter (read-only).
    WallclockLsb,
    /// High word of the emulated cycle counter (read-only).
    WallclockMsb,
    /// Nominal master clock frequency in Hz (read-only).
    MasterclkFreq,
    /// Write: run phase 0. Read: phase-0 trigger count.
    MasterclkTriggerPhase0,
    /// Write: run phase 1. Read: phase-1 trigger count.
    MasterclkTriggerPhase1,
    /// Levels driven onto GPIO pads by the host.
    GpioExtLevels,
    /// Pads whose level is driven by the host.
    GpioExtDriven,
    /// Write: full emulator reset.
    Reset,
}

impl PicoEmuRegister {
    const ALL: [Self; 8] = [
        Self::WallclockLsb,
        Self::WallclockMsb,
        Self::MasterclkFreq,
        Self::MasterclkTriggerPhase0,
        Self::MasterclkTriggerPhase1,
        Self::GpioExtLevels,
        Self::GpioExtDriven,
        Self::Reset,
    ];

    /// Decodes a word-aligned offset.
    #[must_use]
    pub const fn from_offset(offset: u32) -> Option<Self> {
        if offset & 0x3 != 0 || offset >= 4 * Self::ALL.len() as u32 {
            return None;
        }
        Some(Self::ALL[(offset / 4) as usize])
    }

    /// Offset from the block base.
    #[must_use]
    pub const fn offset(self) -> u32 {
        4 * self as u32
    }

    /// Register name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WallclockLsb => "WALLCLOCK_LSB",
            Self::WallclockMsb => "WALLCLOCK_MSB",
            Self::MasterclkFreq => "MASTERCLK_FREQ",
            Self::MasterclkTriggerPhase0 => "MASTERCLK_TRIGGER_PHASE0",
            Self::MasterclkTriggerPhase1 => "MASTERCLK_TRIGGER_PHASE1",
            Self::GpioExtLevels => "GPIO_EXT_LEVELS",
            Self::GpioExtDriven => "GPIO_EXT_DRIVEN",
            Self::Reset => "RESET",
        }
    }
}

/// `IO_BANK0` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IoBank0Register {
    /// `GPIOn_STATUS` (read-only).
    Status(usize),
    /// `GPIOn_CTRL`.
    Ctrl(usize),
}

impl IoBank0Register {
    /// Decodes a word-aligned offset.
    #[must_use]
    pub const fn from_offset(offset: u32) -> Option<Self> {
        let pin = (offset / 8) as usize;
        if offset & 0x3 != 0 || pin >= GPIO_COUNT {
            return None;
        }
        if offset % 8 == 0 {
            Some(Self::Status(pin))
        } else {
            Some(Self::Ctrl(pin))
        }
    }

    /// Offset from the bank base.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::Status(pin) => 8 * pin as u32,
            Self::Ctrl(pin) => 8 * pin as u32 + 4,
        }
    }

    /// Register name.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::Status(pin) => format!("GPIO{pin}_STATUS"),
            Self::Ctrl(pin) => format!("GPIO{pin}_CTRL"),
        }
    }
}

/// `PADS_BANK0` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum PadsBank0Register {
    /// `VOLTAGE_SELECT`.
    VoltageSelect,
    /// `GPIOn` pad control.
    Gpio(usize),
    /// `SWCLK` pad control.
    Swclk,
    /// `SWD` pad control.
    Swd,
}

const PADS_GPIO_BASE: u32 = 0x04;
const PADS_SWCLK: u32 = PADS_GPIO_BASE + 4 * GPIO_COUNT as u32;
const PADS_SWD: u32 = PADS_SWCLK + 4;

impl PadsBank0Register {
    /// Decodes a word-aligned offset.
    #[must_use]
    pub const fn from_offset(offset: u32) -> Option<Self> {
        if offset & 0x3 != 0 {
            return None;
        }
        match offset {
            0 => Some(Self::VoltageSelect),
            PADS_SWCLK => Some(Self::Swclk),
            PADS_SWD => Some(Self::Swd),
            _ if offset < PADS_SWCLK => Some(Self::Gpio(((offset - PADS_GPIO_BASE) / 4) as usize)),
            _ => None,
        }
    }

    /// Offset from the bank base.
    #[must_use]
    pub const fn offset(self) -> u32 {
        match self {
            Self::VoltageSelect => 0,
            Self::Gpio(pin) => PADS_GPIO_BASE + 4 * pin as u32,
            Self::Swclk => PADS_SWCLK,
            Self::Swd => PADS_SWD,
        }
    }

    /// Register name.
    #[must_use]
    pub fn name(self) -> String {
        match self {
            Self::VoltageSelect => "VOLTAGE_SELECT".into(),
            Self::Gpio(pin) => format!("GPIO{pin}"),
            Self::Swclk => "SWCLK".into(),
            Self::Swd => "SWD".into(),
        }
    }
}
