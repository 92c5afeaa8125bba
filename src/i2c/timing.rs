// Licensed under the Apache-2.0 license

//! SCL timing register computation.

use super::common::{ConfigurationError, FastModeDuty, I2cConfig};
use super::registers::{ccr, cr2, trise};

/// Upper bound of standard mode.
pub const STANDARD_MODE_MAX_HZ: u32 = 100_000;

/// Register values derived from the peripheral clock and bus speed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingRegisters {
    /// Full CCR register value: clock divider plus F/S and DUTY bits.
    pub ccr: u32,
    pub trise: u32,
    /// CR2.FREQ: peripheral clock in MHz.
    pub freq: u32,
}

impl TimingRegisters {
    /// The 12-bit clock divider field of [`Self::ccr`].
    #[must_use]
    pub fn divider(&self) -> u32 {
        self.ccr & ccr::CCR_MASK
    }

    #[must_use]
    pub fn is_fast_mode(&self) -> bool {
        self.ccr & ccr::FS != 0
    }
}

/// Compute CCR, TRISE and CR2.FREQ for `config` at `pclk_hz`.
///
/// Divisions truncate. A zero peripheral clock is accepted and yields
/// zero fields (see `ClockSource::pll_output_hz`).
pub fn compute(pclk_hz: u32, config: &I2cConfig) -> Result<TimingRegisters, ConfigurationError> {
    let speed = config.scl_speed.raw();
    if speed == 0 {
        return Err(ConfigurationError::InvalidSpeed);
    }

    let pclk = u64::from(pclk_hz);
    let speed = u64::from(speed);

    let (divider, mode_bits, rise) = if speed <= u64::from(STANDARD_MODE_MAX_HZ) {
        (pclk / (2 * speed), 0, pclk / 1_000_000 + 1)
    } else {
        let (divider, duty_bit) = match config.duty {
            FastModeDuty::Ratio2 => (pclk / (3 * speed), 0),
            FastModeDuty::Ratio16To9 => (pclk / (25 * speed), ccr::DUTY),
        };
        (divider, ccr::FS | duty_bit, pclk * 300 / 1_000_000_000 + 1)
    };

    // Masking keeps every value below 2^12, so the narrowing is lossless.
    Ok(TimingRegisters {
        ccr: mode_bits | (divider & u64::from(ccr::CCR_MASK)) as u32,
        trise: (rise & u64::from(trise::TRISE_MASK)) as u32,
        freq: (pclk_hz / 1_000_000) & cr2::FREQ_MASK,
    })
}
