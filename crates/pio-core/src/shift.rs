//! Input/output shift registers and their `SHIFTCTRL` configuration.

/// `SMx_SHIFTCTRL` reset value: both shift directions right, thresholds 32.
pub const SHIFTCTRL_RESET: u32 = 0x000c_0000;

const AUTOPUSH_BIT: u32 = 16;
const AUTOPULL_BIT: u32 = 17;
const IN_SHIFTDIR_BIT: u32 = 18;
const OUT_SHIFTDIR_BIT: u32 = 19;
const PUSH_THRESH_LSB: u32 = 20;
const PULL_THRESH_LSB: u32 = 25;
/// `FJOIN_TX` bit of `SMx_SHIFTCTRL`.
pub const FJOIN_TX_BIT: u32 = 30;
/// `FJOIN_RX` bit of `SMx_SHIFTCTRL`.
pub const FJOIN_RX_BIT: u32 = 31;

/// Shift configuration fields of `SMx_SHIFTCTRL` (join bits live with the
/// FIFOs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ShiftControl {
    /// Push automatically once the input shift count reaches the threshold.
    pub autopush: bool,
    /// Pull automatically once the output shift count reaches the threshold.
    pub autopull: bool,
    /// `IN` shifts towards the LSB (data enters at the MSB).
    pub in_shift_right: bool,
    /// `OUT` shifts towards the LSB (data leaves from the LSB).
    pub out_shift_right: bool,
    /// Raw 5-bit push threshold (0 means 32).
    pub push_threshold: u8,
    /// Raw 5-bit pull threshold (0 means 32).
    pub pull_threshold: u8,
}

impl Default for ShiftControl {
    fn default() -> Self {
        Self::from_register(SHIFTCTRL_RESET)
    }
}

impl ShiftControl {
    /// Decodes the shift fields of a `SHIFTCTRL` value.
    #[must_use]
    pub const fn from_register(value: u32) -> Self {
        Self {
            autopush: value & (1 << AUTOPUSH_BIT) != 0,
            autopull: value & (1 << AUTOPULL_BIT) != 0,
            in_shift_right: value & (1 << IN_SHIFTDIR_BIT) != 0,
            out_shift_right: value & (1 << OUT_SHIFTDIR_BIT) != 0,
            push_threshold: ((value >> PUSH_THRESH_LSB) & 0x1f) as u8,
            pull_threshold: ((value >> PULL_THRESH_LSB) & 0x1f) as u8,
        }
    }

    /// Encodes the shift fields (join bits clear).
    #[must_use]
    pub const fn to_register(self) -> u32 {
        (self.autopush as u32) << AUTOPUSH_BIT
            | (self.autopull as u32) << AUTOPULL_BIT
            | (self.in_shift_right as u32) << IN_SHIFTDIR_BIT
            | (self.out_shift_right as u32) << OUT_SHIFTDIR_BIT
            | (self.push_threshold as u32 & 0x1f) << PUSH_THRESH_LSB
            | (self.pull_threshold as u32 & 0x1f) << PULL_THRESH_LSB
    }

    /// Effective push threshold in bits (1..=32).
    #[must_use]
    pub const fn push_bits(self) -> u8 {
        threshold_bits(self.push_threshold)
    }

    /// Effective pull threshold in bits (1..=32).
    #[must_use]
    pub const fn pull_bits(self) -> u8 {
        threshold_bits(self.pull_threshold)
    }
}

const fn threshold_bits(raw: u8) -> u8 {
    if raw & 0x1f == 0 {
        32
    } else {
        raw & 0x1f
    }
}

const fn low_mask(bits: u8) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// ISR/OSR pair with their shift counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ShiftRegisters {
    /// Input shift register.
    pub isr: u32,
    /// Bits shifted into the ISR since the last push (0..=32).
    pub isr_count: u8,
    /// Output shift register.
    pub osr: u32,
    /// Bits shifted out of the OSR since the last pull (0..=32).
    pub osr_count: u8,
}

impl Default for ShiftRegisters {
    fn default() -> Self {
        // The OSR starts out "empty" so the first autopull fires immediately.
        Self {
            isr: 0,
            isr_count: 0,
            osr: 0,
            osr_count: 32,
        }
    }
}

impl ShiftRegisters {
    /// Shifts `bit_count` low bits of `data` into the ISR.
    pub fn shift_in(&mut self, data: u32, bit_count: u8, shift_right: bool) {
        let bits = bit_count.min(32);
        let data = data & low_mask(bits);
        self.isr = if bits == 32 {
            data
        } else if shift_right {
            (self.isr >> bits) | (data << (32 - u32::from(bits)))
        } else {
            (self.isr << bits) | data
        };
        self.isr_count = self.isr_count.saturating_add(bits).min(32);
    }

    /// Shifts `bit_count` bits out of the OSR and returns them right-aligned.
    pub fn shift_out(&mut self, bit_count: u8, shift_right: bool) -> u32 {
        let bits = bit_count.min(32);
        let data;
        if bits == 32 {
            data = self.osr;
            self.osr = 0;
        } else if shift_right {
            data = self.osr & low_mask(bits);
            self.osr >>= bits;
        } else {
            data = self.osr >> (32 - u32::from(bits));
            self.osr <<= bits;
        }
        self.osr_count = self.osr_count.saturating_add(bits).min(32);
        data
    }

    /// Returns `true` when the ISR reached the push threshold.
    #[must_use]
    pub const fn isr_full(&self, control: ShiftControl) -> bool {
        self.isr_count >= control.push_bits()
    }

    /// Returns `true` when the OSR reached the pull threshold.
    #[must_use]
    pub const fn osr_empty(&self, control: ShiftControl) -> bool {
        self.osr_count >= control.pull_bits()
    }

    /// Takes the ISR contents for a push, clearing it.
    pub fn take_isr(&mut self) -> u32 {
        let value = self.isr;
        self.isr = 0;
        self.isr_count = 0;
        value
    }

    /// Loads the OSR from a pull.
    pub fn load_osr(&mut self, value: u32) {
        self.osr = value;
        self.osr_count = 0;
    }

    /// Clears both shift counters and the ISR, keeping the OSR contents.
    pub fn restart(&mut self) {
        self.isr = 0;
        self.isr_count = 0;
        self.osr_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::{ShiftControl, ShiftRegisters, SHIFTCTRL_RESET};
    use rstest::rstest;

    #[test]
    fn reset_control_matches_silicon() {
        let control = ShiftControl::default();
        assert!(control.in_shift_right);
        assert!(control.out_shift_right);
        assert!(!control.autopush);
        assert!(!control.autopull);
        assert_eq!(control.push_bits(), 32);
        assert_eq!(control.pull_bits(), 32);
        assert_eq!(control.to_register(), SHIFTCTRL_RESET);
    }

    #[test]
    fn control_fields_round_trip_through_register() {
        let value = 0x3ff_0000 | 1 << 16 | 1 << 17;
        let control = ShiftControl::from_register(value);
        assert_eq!(control.push_threshold, 0x1f);
        assert_eq!(control.pull_threshold, 0x1f);
        assert_eq!(control.to_register(), value);
    }

    #[test]
    fn shift_in_right_enters_at_msb() {
        let mut regs = ShiftRegisters::default();
        regs.shift_in(0b1, 1, true);
        regs.shift_in(0b0, 1, true);
        regs.shift_in(0b11, 2, true);
        assert_eq!(regs.isr, 0xd000_0000);
        assert_eq!(regs.isr_count, 4);
    }

    #[test]
    fn shift_in_left_enters_at_lsb() {
        let mut regs = ShiftRegisters::default();
        regs.shift_in(0b1, 1, false);
        regs.shift_in(0xff, 2, false);
        assert_eq!(regs.isr, 0b111);
        assert_eq!(regs.isr_count, 3);
    }

    #[rstest]
    #[case(true, 4, 0x8, 0x1234_5678 >> 4)]
    #[case(false, 4, 0x1, 0x2345_6780)]
    #[case(true, 32, 0x1234_5678, 0)]
    fn shift_out_by_direction(
        #[case] shift_right: bool,
        #[case] bits: u8,
        #[case] expected_data: u32,
        #[case] expected_osr: u32,
    ) {
        let mut regs = ShiftRegisters::default();
        regs.load_osr(0x1234_5678);
        assert_eq!(regs.shift_out(bits, shift_right), expected_data);
        assert_eq!(regs.osr, expected_osr);
        assert_eq!(regs.osr_count, bits);
    }

    #[test]
    fn counters_saturate_at_32() {
        let mut regs = ShiftRegisters::default();
        regs.shift_in(0, 32, true);
        regs.shift_in(0, 8, true);
        assert_eq!(regs.isr_count, 32);
        assert_eq!(regs.shift_out(8, true), 0);
        assert_eq!(regs.osr_count, 32);
    }

    #[test]
    fn thresholds_drive_full_and_empty() {
        let control = ShiftControl {
            push_threshold: 8,
            pull_threshold: 8,
            ..ShiftControl::default()
        };
        let mut regs = ShiftRegisters::default();
        assert!(regs.osr_empty(control));
        regs.load_osr(0xff);
        assert!(!regs.osr_empty(control));
        regs.shift_out(8, true);
        assert!(regs.osr_empty(control));

        regs.shift_in(0xff, 7, true);
        assert!(!regs.isr_full(control));
        regs.shift_in(1, 1, true);
        assert!(regs.isr_full(control));
        assert_eq!(regs.take_isr(), 0xff00_0000);
        assert_eq!(regs.isr_count, 0);
    }
}
