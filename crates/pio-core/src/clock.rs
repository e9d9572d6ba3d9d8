//! Fractional 16.8 clock divider driving a state machine's clock enable.

use crate::error::{PioError, PioResult};

/// `SMx_CLKDIV` reset value (`INT = 1`, `FRAC = 0`).
pub const CLKDIV_RESET: u32 = 0x0001_0000;

const CLKDIV_INT_LSB: u32 = 16;
const CLKDIV_FRAC_LSB: u32 = 8;
const ACCUMULATOR_STEP: u32 = 256;

/// Per-state-machine fractional clock divider.
///
/// Each system cycle the accumulator grows by one whole unit (256 in 16.8
/// fixed point); the clock enable fires when it reaches the configured
/// divisor, which is then subtracted so fractional remainders carry over.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ClockDivider {
    int: u16,
    frac: u8,
    accumulator: u32,
}

impl Default for ClockDivider {
    fn default() -> Self {
        Self {
            int: 1,
            frac: 0,
            accumulator: 0,
        }
    }
}

impl ClockDivider {
    /// Integer part as written (`0` encodes 65536).
    #[must_use]
    pub const fn int(&self) -> u16 {
        self.int
    }

    /// Fractional part in 1/256ths.
    #[must_use]
    pub const fn frac(&self) -> u8 {
        self.frac
    }

    /// Effective divisor in 16.8 fixed point.
    #[must_use]
    pub const fn divisor(&self) -> u32 {
        let int = if self.int == 0 {
            65_536
        } else {
            self.int as u32
        };
        (int << 8) | self.frac as u32
    }

    /// Register encoding of the divider (`SMx_CLKDIV`).
    #[must_use]
    pub const fn to_register(&self) -> u32 {
        ((self.int as u32) << CLKDIV_INT_LSB) | ((self.frac as u32) << CLKDIV_FRAC_LSB)
    }

    /// Applies a `SMx_CLKDIV` register value.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::InvalidConfig`] when `INT` is 0 (65536) and `FRAC`
    /// is non-zero; the divider is left unchanged.
    pub fn set_register(&mut self, label: &str, value: u32) -> PioResult<()> {
        let int = (value >> CLKDIV_INT_LSB) as u16;
        let frac = (value >> CLKDIV_FRAC_LSB) as u8;
        self.configure(label, int, frac)
    }

    /// Sets both divider parts.
    ///
    /// # Errors
    ///
    /// See [`ClockDivider::set_register`].
    pub fn configure(&mut self, label: &str, int: u16, frac: u8) -> PioResult<()> {
        if int == 0 && frac != 0 {
            log::warn!("{label}: rejected FRAC={frac} with INT=0");
            return Err(PioError::InvalidConfig {
                register: label.to_string(),
                reason: "FRAC must be 0 when INT is 0 (65536)",
            });
        }
        self.int = int;
        self.frac = frac;
        Ok(())
    }

    /// Resets the accumulator phase without touching the divisor.
    pub fn restart(&mut self) {
        self.accumulator = 0;
    }

    /// Advances one system cycle and reports whether the clock enable fires.
    pub fn tick(&mut self) -> bool {
        self.accumulator += ACCUMULATOR_STEP;
        let divisor = self.divisor();
        if self.accumulator >= divisor {
            self.accumulator -= divisor;
            true
        } else {
            false
        }
    }

    /// Reports whether the next [`ClockDivider::tick`] would fire, without
    /// advancing.
    #[must_use]
    pub const fn peek(&self) -> bool {
        self.accumulator + ACCUMULATOR_STEP >= self.divisor()
    }
}

#[cfg(test)]
mod tests {
    use super::{ClockDivider, CLKDIV_RESET};
    use proptest::prelude::*;
    use rstest::rstest;

    fn enables(divider: &mut ClockDivider, cycles: u32) -> u32 {
        (0..cycles).map(|_| u32::from(divider.tick())).sum()
    }

    #[test]
    fn reset_divider_enables_every_cycle() {
        let mut divider = ClockDivider::default();
        assert_eq!(divider.to_register(), CLKDIV_RESET);
        assert_eq!(enables(&mut divider, 100), 100);
    }

    #[test]
    fn zero_int_means_65536() {
        let mut divider = ClockDivider::default();
        divider.set_register("clkdiv", 0).expect("int 0 frac 0 is legal");
        assert_eq!(divider.divisor(), 65_536 << 8);
        let fired: Vec<u32> = (1..=131_072)
            .filter(|_| divider.tick())
            .collect();
        assert_eq!(fired, vec![65_536, 131_072]);
    }

    #[test]
    fn nonzero_frac_with_zero_int_is_rejected_and_unchanged() {
        let mut divider = ClockDivider::default();
        divider.configure("clkdiv", 3, 0x80).expect("legal");
        let err = divider
            .set_register("PIO0_SM0_CLKDIV", 0x0000_0100)
            .expect_err("must be rejected");
        assert!(err.to_string().contains("PIO0_SM0_CLKDIV"));
        assert_eq!(divider.int(), 3);
        assert_eq!(divider.frac(), 0x80);
    }

    #[rstest]
    #[case(2, 0, 50)]
    #[case(4, 0, 25)]
    #[case(1, 128, 66)]
    #[case(2, 128, 40)]
    fn fractional_rates_average_out(#[case] int: u16, #[case] frac: u8, #[case] expected: u32) {
        let mut divider = ClockDivider::default();
        divider.configure("clkdiv", int, frac).expect("legal");
        assert_eq!(enables(&mut divider, 100), expected);
    }

    #[test]
    fn restart_realigns_phase() {
        let mut divider = ClockDivider::default();
        divider.configure("clkdiv", 3, 0).expect("legal");
        assert!(!divider.tick());
        divider.restart();
        assert!(!divider.tick());
        assert!(!divider.tick());
        assert!(divider.peek());
        assert!(divider.tick());
    }

    proptest! {
        #[test]
        fn long_run_rate_matches_divisor(int in 1u16..=16, frac in any::<u8>()) {
            let mut divider = ClockDivider::default();
            divider.configure("clkdiv", int, frac).expect("legal");
            let cycles = 4096u32;
            let fired = enables(&mut divider, cycles);
            let exact = u64::from(cycles) * 256 / u64::from(divider.divisor());
            prop_assert!(u64::from(fired) == exact || u64::from(fired) + 1 == exact);
        }
    }
}
