// Licensed under the Apache-2.0 license

//! Reset and clock control helpers.
//!
//! The I2C driver only needs two things from the clock tree: the APB1
//! peripheral clock frequency (to program FREQ/CCR/TRISE) and a way to gate
//! the peripheral clock of an instance. Both are exposed as traits so the
//! driver can be exercised on the host with mocks.

use crate::i2c::hardware_instantiation::I2cInstance;
use stm32f4::stm32f401::RCC;

/// HSI oscillator frequency.
pub const HSI_HZ: u32 = 16_000_000;
/// HSE crystal frequency fitted on the reference board.
pub const HSE_HZ: u32 = 8_000_000;

/// Source of the clock frequencies consumed by peripheral drivers.
pub trait ClockSource {
    /// Frequency of the APB1 bus clock (PCLK1) in Hz.
    fn pclk1_hz(&self) -> u32;

    /// Frequency of the main PLL output in Hz.
    ///
    /// PLL frequency derivation is not implemented; implementations in this
    /// crate return 0. A system running from the PLL therefore reports a
    /// zero peripheral clock.
    fn pll_output_hz(&self) -> u32 {
        0
    }
}

/// Peripheral clock gating for I2C instances.
pub trait PeripheralClockControl {
    fn enable_clock(&mut self, instance: I2cInstance);
    fn disable_clock(&mut self, instance: I2cInstance);

    /// Pulse the APB1 reset line of the instance, returning every register
    /// to its reset value.
    fn reset(&mut self, instance: I2cInstance);
}

/// System clock switch status (CFGR.SWS).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SystemClockSource {
    Hsi,
    Hse,
    Pll,
}

/// Clock frequencies decoded from a snapshot of RCC_CFGR.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RccClocks {
    pub sysclk_source: SystemClockSource,
    pub sysclk_hz: u32,
    pub hclk_hz: u32,
    pub pclk1_hz: u32,
    pub pclk2_hz: u32,
}

impl RccClocks {
    /// Decode the bus clocks from a raw CFGR value.
    #[must_use]
    pub fn from_cfgr(cfgr: u32) -> Self {
        // HPRE: 0xxx = /1, 1000..1111 = /2,/4,/8,/16,/64,/128,/256,/512
        const AHB_PRESCALER: [u32; 8] = [2, 4, 8, 16, 64, 128, 256, 512];
        // PPREx: 0xx = /1, 100..111 = /2,/4,/8,/16
        const APB_PRESCALER: [u32; 4] = [2, 4, 8, 16];

        let (sysclk_source, sysclk_hz) = match (cfgr >> 2) & 0x3 {
            0 => (SystemClockSource::Hsi, HSI_HZ),
            1 => (SystemClockSource::Hse, HSE_HZ),
            _ => (SystemClockSource::Pll, pll_output_hz()),
        };

        let hpre = ((cfgr >> 4) & 0xF) as usize;
        let ahb_div = hpre
            .checked_sub(8)
            .and_then(|i| AHB_PRESCALER.get(i).copied())
            .unwrap_or(1);

        let apb_div = |ppre: u32| {
            (ppre as usize)
                .checked_sub(4)
                .and_then(|i| APB_PRESCALER.get(i).copied())
                .unwrap_or(1)
        };

        let hclk_hz = sysclk_hz / ahb_div;
        Self {
            sysclk_source,
            sysclk_hz,
            hclk_hz,
            pclk1_hz: hclk_hz / apb_div((cfgr >> 10) & 0x7),
            pclk2_hz: hclk_hz / apb_div((cfgr >> 13) & 0x7),
        }
    }
}

impl ClockSource for RccClocks {
    fn pclk1_hz(&self) -> u32 {
        self.pclk1_hz
    }
}

fn pll_output_hz() -> u32 {
    0
}

/// RCC block driven through the PAC.
pub struct Rcc {
    rcc: RCC,
}

impl Rcc {
    #[must_use]
    pub fn new(rcc: RCC) -> Self {
        Self { rcc }
    }

    /// Give back the RCC peripheral.
    #[must_use]
    pub fn free(self) -> RCC {
        self.rcc
    }

    /// Decode the current clock configuration.
    #[must_use]
    pub fn clocks(&self) -> RccClocks {
        RccClocks::from_cfgr(self.rcc.cfgr().read().bits())
    }

    fn set_clock_gate(&mut self, instance: I2cInstance, on: bool) {
        self.rcc.apb1enr().modify(|_, w| match instance {
            I2cInstance::I2c1 => w.i2c1en().bit(on),
            I2cInstance::I2c2 => w.i2c2en().bit(on),
            I2cInstance::I2c3 => w.i2c3en().bit(on),
        });
    }

    fn set_reset_line(&mut self, instance: I2cInstance, asserted: bool) {
        self.rcc.apb1rstr().modify(|_, w| match instance {
            I2cInstance::I2c1 => w.i2c1rst().bit(asserted),
            I2cInstance::I2c2 => w.i2c2rst().bit(asserted),
            I2cInstance::I2c3 => w.i2c3rst().bit(asserted),
        });
    }
}

impl ClockSource for Rcc {
    fn pclk1_hz(&self) -> u32 {
        self.clocks().pclk1_hz
    }
}

impl PeripheralClockControl for Rcc {
    fn enable_clock(&mut self, instance: I2cInstance) {
        self.set_clock_gate(instance, true);
    }

    fn disable_clock(&mut self, instance: I2cInstance) {
        self.set_clock_gate(instance, false);
    }

    fn reset(&mut self, instance: I2cInstance) {
        self.set_reset_line(instance, true);
        self.set_reset_line(instance, false);
    }
}
