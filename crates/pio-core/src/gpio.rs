//! User GPIO bank: function select, overrides, pads and external drive.
//!
//! Each PIO block drives its own output/direction latches; a pin only
//! carries a block's signals when its `FUNCSEL` selects that block. Pad
//! inputs reach every block regardless of `FUNCSEL`.

use crate::registers::{IoBank0Register, PadsBank0Register};

/// Number of user GPIOs in bank 0.
pub const GPIO_COUNT: usize = 30;

/// `FUNCSEL` routing a pin to PIO0.
pub const FUNCSEL_PIO0: u8 = 6;
/// `FUNCSEL` routing a pin to PIO1.
pub const FUNCSEL_PIO1: u8 = 7;
/// `FUNCSEL` reset value (no function).
pub const FUNCSEL_NULL: u8 = 0x1f;

/// `GPIOn` pad reset value: IE, 4 mA drive, pull-down, Schmitt trigger.
pub const PAD_RESET: u32 = 0x56;
/// `SWD` pad reset value.
pub const PAD_SWD_RESET: u32 = 0xda;
/// `SWCLK` pad reset value.
pub const PAD_SWCLK_RESET: u32 = 0xda;

const PAD_OD: u32 = 1 << 7;
const PAD_IE: u32 = 1 << 6;
const PAD_PUE: u32 = 1 << 3;
const PAD_PDE: u32 = 1 << 2;
const PAD_WRITABLE: u32 = 0xff;

/// Four-state override policy for one signal of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Override {
    /// Signal passes unchanged.
    #[default]
    Pass,
    /// Signal is inverted.
    Invert,
    /// Signal is forced low.
    Low,
    /// Signal is forced high.
    High,
}

impl Override {
    const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Pass,
            1 => Self::Invert,
            2 => Self::Low,
            _ => Self::High,
        }
    }

    const fn bits(self) -> u32 {
        match self {
            Self::Pass => 0,
            Self::Invert => 1,
            Self::Low => 2,
            Self::High => 3,
        }
    }

    /// Applies the policy to `signal`.
    #[must_use]
    pub const fn apply(self, signal: bool) -> bool {
        match self {
            Self::Pass => signal,
            Self::Invert => !signal,
            Self::Low => false,
            Self::High => true,
        }
    }
}

/// Decoded `GPIOn_CTRL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct GpioControl {
    /// Peripheral function routed to the pin.
    pub funcsel: u8,
    /// Output level override.
    pub outover: Override,
    /// Output enable override.
    pub oeover: Override,
    /// Input override.
    pub inover: Override,
    /// Interrupt override.
    pub irqover: Override,
}

impl Default for GpioControl {
    fn default() -> Self {
        Self {
            funcsel: FUNCSEL_NULL,
            outover: Override::Pass,
            oeover: Override::Pass,
            inover: Override::Pass,
            irqover: Override::Pass,
        }
    }
}

impl GpioControl {
    /// Decodes a register value.
    #[must_use]
    pub const fn from_register(value: u32) -> Self {
        Self {
            funcsel: (value & 0x1f) as u8,
            outover: Override::from_bits(value >> 8),
            oeover: Override::from_bits(value >> 12),
            inover: Override::from_bits(value >> 16),
            irqover: Override::from_bits(value >> 28),
        }
    }

    /// Encodes all fields.
    #[must_use]
    pub const fn to_register(self) -> u32 {
        self.funcsel as u32 & 0x1f
            | self.outover.bits() << 8
            | self.oeover.bits() << 12
            | self.inover.bits() << 16
            | self.irqover.bits() << 28
    }
}

/// Output level and enable latches of one PIO block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PioOutputs {
    /// Output levels.
    pub pins: u32,
    /// Output enables.
    pub pindirs: u32,
}

/// Signals of one pin along the output and input paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PinSignals {
    /// Output level from the selected peripheral.
    pub out_from_peri: bool,
    /// Output level after the override.
    pub out_to_pad: bool,
    /// Output enable from the selected peripheral.
    pub oe_from_peri: bool,
    /// Output enable after the override and pad `OD`.
    pub oe_to_pad: bool,
    /// Level on the pad.
    pub level: bool,
    /// Input from the pad, gated by `IE`.
    pub in_from_pad: bool,
    /// Input after the override.
    pub in_to_peri: bool,
    /// Interrupt signal after the override.
    pub irq_to_proc: bool,
}

impl PinSignals {
    /// `GPIOn_STATUS` encoding.
    #[must_use]
    pub const fn status_register(self) -> u32 {
        (self.out_from_peri as u32) << 8
            | (self.out_to_pad as u32) << 9
            | (self.oe_from_peri as u32) << 12
            | (self.oe_to_pad as u32) << 13
            | (self.in_from_pad as u32) << 17
            | (self.in_to_peri as u32) << 19
            | (self.in_from_pad as u32) << 24
            | (self.irq_to_proc as u32) << 26
    }
}

/// IO bank, pad bank and host-driven pad inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct GpioBank {
    ctrl: [GpioControl; GPIO_COUNT],
    pads: [u32; GPIO_COUNT],
    voltage_select: u32,
    swclk: u32,
    swd: u32,
    ext_levels: u32,
    ext_driven: u32,
}

impl Default for GpioBank {
    fn default() -> Self {
        Self {
            ctrl: [GpioControl::default(); GPIO_COUNT],
            pads: [PAD_RESET; GPIO_COUNT],
            voltage_select: 0,
            swclk: PAD_SWCLK_RESET,
            swd: PAD_SWD_RESET,
            ext_levels: 0,
            ext_driven: 0,
        }
    }
}

impl GpioBank {
    /// Decoded `GPIOn_CTRL`.
    #[must_use]
    pub fn control(&self, pin: usize) -> Option<GpioControl> {
        self.ctrl.get(pin).copied()
    }

    /// Levels driven by the host onto its driven pads.
    #[must_use]
    pub const fn ext_levels(&self) -> u32 {
        self.ext_levels
    }

    /// Pads driven by the host.
    #[must_use]
    pub const fn ext_driven(&self) -> u32 {
        self.ext_driven
    }

    /// Sets the host-driven pad levels.
    pub fn set_ext_levels(&mut self, levels: u32) {
        self.ext_levels = levels & pin_mask();
    }

    /// Selects which pads the host drives.
    pub fn set_ext_driven(&mut self, driven: u32) {
        self.ext_driven = driven & pin_mask();
    }

    /// Routes `pin` to `funcsel` without touching its overrides.
    pub fn set_function(&mut self, pin: usize, funcsel: u8) {
        if let Some(ctrl) = self.ctrl.get_mut(pin) {
            ctrl.funcsel = funcsel & 0x1f;
        }
    }

    /// Resolves all signals of `pin` given both blocks' output latches.
    #[must_use]
    pub fn signals(&self, pin: usize, outputs: &[PioOutputs; 2]) -> PinSignals {
        let (Some(ctrl), Some(&pad)) = (self.ctrl.get(pin), self.pads.get(pin)) else {
            return PinSignals::default();
        };
        let bit = 1u32 << pin;
        let (out_from_peri, oe_from_peri) = match ctrl.funcsel {
            FUNCSEL_PIO0 => (outputs[0].pins & bit != 0, outputs[0].pindirs & bit != 0),
            FUNCSEL_PIO1 => (outputs[1].pins & bit != 0, outputs[1].pindirs & bit != 0),
            _ => (false, false),
        };
        let out_to_pad = ctrl.outover.apply(out_from_peri);
        let oe_to_pad = ctrl.oeover.apply(oe_from_peri) && pad & PAD_OD == 0;
        let level = if oe_to_pad {
            out_to_pad
        } else if self.ext_driven & bit != 0 {
            self.ext_levels & bit != 0
        } else {
            pad & PAD_PUE != 0 && pad & PAD_PDE == 0
        };
        let in_from_pad = level && pad & PAD_IE != 0;
        PinSignals {
            out_from_peri,
            out_to_pad,
            oe_from_peri,
            oe_to_pad,
            level,
            in_from_pad,
            in_to_peri: ctrl.inover.apply(in_from_pad),
            irq_to_proc: ctrl.irqover.apply(in_from_pad),
        }
    }

    /// Input word seen by the PIO blocks; bits 30 and 31 read 0.
    #[must_use]
    pub fn pio_inputs(&self, outputs: &[PioOutputs; 2]) -> u32 {
        (0..GPIO_COUNT)
            .filter(|&pin| self.signals(pin, outputs).in_to_peri)
            .fold(0, |word, pin| word | 1 << pin)
    }

    /// Reads an `IO_BANK0` register.
    #[must_use]
    pub fn read_io(&self, reg: IoBank0Register, outputs: &[PioOutputs; 2]) -> u32 {
        match reg {
            IoBank0Register::Status(pin) => self.signals(pin, outputs).status_register(),
            IoBank0Register::Ctrl(pin) => self.ctrl.get(pin).map_or(0, |ctrl| ctrl.to_register()),
        }
    }

    /// Writes an `IO_BANK0` register; `STATUS` is read-only.
    pub fn write_io(&mut self, reg: IoBank0Register, value: u32) {
        if let IoBank0Register::Ctrl(pin) = reg {
            if let Some(ctrl) = self.ctrl.get_mut(pin) {
                *ctrl = GpioControl::from_register(value);
            }
        }
    }

    /// Reads a `PADS_BANK0` register.
    #[must_use]
    pub fn read_pad(&self, reg: PadsBank0Register) -> u32 {
        match reg {
            PadsBank0Register::VoltageSelect => self.voltage_select,
            PadsBank0Register::Gpio(pin) => self.pads.get(pin).copied().unwrap_or(0),
            PadsBank0Register::Swclk => self.swclk,
            PadsBank0Register::Swd => self.swd,
        }
    }

    /// Writes a `PADS_BANK0` register.
    pub fn write_pad(&mut self, reg: PadsBank0Register, value: u32) {
        match reg {
            PadsBank0Register::VoltageSelect => self.voltage_select = value & 0x1,
            PadsBank0Register::Gpio(pin) => {
                if let Some(pad) = self.pads.get_mut(pin) {
                    *pad = value & PAD_WRITABLE;
                }
            }
            PadsBank0Register::Swclk => self.swclk = value & PAD_WRITABLE,
            PadsBank0Register::Swd => self.swd = value & PAD_WRITABLE,
        }
    }
}

const fn pin_mask() -> u32 {
    (1 << GPIO_COUNT) - 1
}
