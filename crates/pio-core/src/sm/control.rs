//! `SMx_EXECCTRL` and `SMx_PINCTRL` field codecs.

/// `SMx_EXECCTRL` reset value (`WRAP_TOP = 31`).
pub const EXECCTRL_RESET: u32 = 0x0001_f000;

/// `SMx_PINCTRL` reset value (`SET_COUNT = 5`).
pub const PINCTRL_RESET: u32 = 0x1400_0000;

const fn field(value: u32, lsb: u32, bits: u32) -> u8 {
    ((value >> lsb) & ((1 << bits) - 1)) as u8
}

const fn bit(value: u32, lsb: u32) -> bool {
    value & (1 << lsb) != 0
}

/// Decoded `SMx_EXECCTRL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct ExecControl {
    /// MSB of the delay/side-set field is a side-set enable.
    pub side_en: bool,
    /// Side-set drives pin directions instead of levels.
    pub side_pindir: bool,
    /// GPIO tested by `JMP PIN`.
    pub jmp_pin: u8,
    /// Data bit used as write enable when `inline_out_en` is set.
    pub out_en_sel: u8,
    /// `OUT` pin writes are gated by data bit `out_en_sel`.
    pub inline_out_en: bool,
    /// Continuously re-assert the most recent `OUT`/`SET` pin write.
    pub out_sticky: bool,
    /// Address after which execution wraps (`WRAP_TOP`).
    pub wrap_top: u8,
    /// Address wrapped to (`WRAP_BOTTOM`).
    pub wrap_bottom: u8,
    /// `MOV x, STATUS` compares the RX level instead of TX.
    pub status_sel: bool,
    /// Level threshold for `MOV x, STATUS`.
    pub status_n: u8,
}

impl Default for ExecControl {
    fn default() -> Self {
        Self::from_register(EXECCTRL_RESET)
    }
}

impl ExecControl {
    /// Decodes a register value; `EXEC_STALLED` (bit 31) is ignored.
    #[must_use]
    pub const fn from_register(value: u32) -> Self {
        Self {
            side_en: bit(value, 30),
            side_pindir: bit(value, 29),
            jmp_pin: field(value, 24, 5),
            out_en_sel: field(value, 19, 5),
            inline_out_en: bit(value, 18),
            out_sticky: bit(value, 17),
            wrap_top: field(value, 12, 5),
            wrap_bottom: field(value, 7, 5),
            status_sel: bit(value, 4),
            status_n: field(value, 0, 4),
        }
    }

    /// Encodes the writable fields.
    #[must_use]
    pub const fn to_register(self) -> u32 {
        (self.side_en as u32) << 30
            | (self.side_pindir as u32) << 29
            | (self.jmp_pin as u32 & 0x1f) << 24
            | (self.out_en_sel as u32 & 0x1f) << 19
            | (self.inline_out_en as u32) << 18
            | (self.out_sticky as u32) << 17
            | (self.wrap_top as u32 & 0x1f) << 12
            | (self.wrap_bottom as u32 & 0x1f) << 7
            | (self.status_sel as u32) << 4
            | (self.status_n as u32 & 0xf)
    }
}

/// Decoded `SMx_PINCTRL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PinControl {
    /// Side-set field width, enable bit included (0..=5).
    pub sideset_count: u8,
    /// Pins written by `SET` (0..=5).
    pub set_count: u8,
    /// Pins written by `OUT` (0..=32).
    pub out_count: u8,
    /// First pin read by `IN`, `WAIT PIN` and `MOV x, PINS`.
    pub in_base: u8,
    /// First side-set pin.
    pub sideset_base: u8,
    /// First `SET` pin.
    pub set_base: u8,
    /// First `OUT` pin.
    pub out_base: u8,
}

impl Default for PinControl {
    fn default() -> Self {
        Self::from_register(PINCTRL_RESET)
    }
}

impl PinControl {
    /// Decodes a register value.
    #[must_use]
    pub const fn from_register(value: u32) -> Self {
        Self {
            sideset_count: field(value, 29, 3),
            set_count: field(value, 26, 3),
            out_count: field(value, 20, 6),
            in_base: field(value, 15, 5),
            sideset_base: field(value, 10, 5),
            set_base: field(value, 5, 5),
            out_base: field(value, 0, 5),
        }
    }

    /// Encodes all fields.
    #[must_use]
    pub const fn to_register(self) -> u32 {
        (self.sideset_count as u32 & 0x7) << 29
            | (self.set_count as u32 & 0x7) << 26
            | (self.out_count as u32 & 0x3f) << 20
            | (self.in_base as u32 & 0x1f) << 15
            | (self.sideset_base as u32 & 0x1f) << 10
            | (self.set_base as u32 & 0x1f) << 5
            | (self.out_base as u32 & 0x1f)
    }
}

/// Where the most recently executed instruction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum InstructionOrigin {
    /// Fetched from instruction memory at PC.
    #[default]
    Memory,
    /// Produced by `OUT EXEC` or `MOV EXEC`.
    Exec,
    /// Injected through `SMx_INSTR` or `FORCED_INSTR`.
    Forced,
}

impl InstructionOrigin {
    /// Encoding used by the `INSTR_ORIGIN` emulator register.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Memory => 0,
            Self::Exec => 1,
            Self::Forced => 2,
        }
    }
}

/// Write of `count` consecutive pins starting at `base`, wrapping at 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PinWrite {
    /// First pin.
    pub base: u8,
    /// Number of pins (0..=32).
    pub count: u8,
    /// Values, LSB goes to `base`.
    pub value: u32,
}

impl PinWrite {
    /// Pin mask covered by this write.
    #[must_use]
    pub const fn mask(self) -> u32 {
        let span = if self.count >= 32 {
            u32::MAX
        } else {
            (1u32 << self.count) - 1
        };
        span.rotate_left(self.base as u32 & 0x1f)
    }

    /// Applies the write to a 32-bit pin latch.
    #[must_use]
    pub const fn apply(self, latch: u32) -> u32 {
        let mask = self.mask();
        let value = self.value.rotate_left(self.base as u32 & 0x1f);
        (latch & !mask) | (value & mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_values_decode_to_documented_defaults() {
        let exec = ExecControl::default();
        assert_eq!(exec.wrap_top, 31);
        assert_eq!(exec.wrap_bottom, 0);
        assert!(!exec.side_en);
        assert_eq!(exec.to_register(), EXECCTRL_RESET);

        let pins = PinControl::default();
        assert_eq!(pins.set_count, 5);
        assert_eq!(pins.out_count, 0);
        assert_eq!(pins.to_register(), PINCTRL_RESET);
    }

    #[test]
    fn exec_stalled_bit_is_not_stored() {
        let exec = ExecControl::from_register(0x8000_0000 | EXECCTRL_RESET);
        assert_eq!(exec.to_register(), EXECCTRL_RESET);
    }

    #[test]
    fn all_writable_fields_survive_encoding() {
        let exec_value = 0x7fff_ff9f;
        assert_eq!(ExecControl::from_register(exec_value).to_register(), exec_value);
        let pin_value = u32::MAX;
        assert_eq!(PinControl::from_register(pin_value).to_register(), pin_value);
    }

    #[test]
    fn pin_write_wraps_through_pin_31() {
        let write = PinWrite {
            base: 30,
            count: 4,
            value: 0b1011,
        };
        assert_eq!(write.mask(), 0xc000_0003);
        assert_eq!(write.apply(0), 0xc000_0002);
        assert_eq!(write.apply(u32::MAX), 0xffff_fffe);
    }

    #[test]
    fn full_width_pin_write_replaces_latch() {
        let write = PinWrite {
            base: 4,
            count: 32,
            value: 0x1234_5678,
        };
        assert_eq!(write.apply(0xffff_ffff), 0x2345_6781);
    }
}
