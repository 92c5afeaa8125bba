// Licensed under the Apache-2.0 license

//! # I2C Instances of the STM32F401
//!
//! The device has three identical I2C blocks. They differ only in register
//! block, interrupt lines and RCC enable bit, so every instance maps onto
//! the same driver type and the instances can live in one array:
//!
//! ```rust,ignore
//! use stm32f401_ddk::i2c::hardware_instantiation::instantiate_hardware;
//! use stm32f401_ddk::i2c::I2cMaster;
//!
//! let mut buses = unsafe { instantiate_hardware([I2cConfig::default(); 3]) };
//! for bus in buses.iter_mut() {
//!     bus.init(pclk1_hz)?;
//! }
//! buses[0].write(0x50, &[0x01, 0x02])?;
//! ```

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::I2cConfig;
use crate::i2c::registers::Mmio;
use crate::i2c::stm32f401_i2c::Stm32f401I2c;
use crate::irq::Interrupt;
use stm32f4::stm32f401::{i2c1::RegisterBlock, I2C1, I2C2, I2C3};

/// One of the I2C peripherals of the device.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cInstance {
    I2c1,
    I2c2,
    I2c3,
}

impl I2cInstance {
    pub const ALL: [I2cInstance; 3] = [I2cInstance::I2c1, I2cInstance::I2c2, I2cInstance::I2c3];

    /// PAC register block of the instance.
    #[must_use]
    pub const fn register_block(self) -> *const RegisterBlock {
        match self {
            I2cInstance::I2c1 => I2C1::ptr(),
            I2cInstance::I2c2 => I2C2::ptr(),
            I2cInstance::I2c3 => I2C3::ptr(),
        }
    }

    #[must_use]
    pub const fn event_irq(self) -> Interrupt {
        match self {
            I2cInstance::I2c1 => Interrupt::I2C1_EV,
            I2cInstance::I2c2 => Interrupt::I2C2_EV,
            I2cInstance::I2c3 => Interrupt::I2C3_EV,
        }
    }

    #[must_use]
    pub const fn error_irq(self) -> Interrupt {
        match self {
            I2cInstance::I2c1 => Interrupt::I2C1_ER,
            I2cInstance::I2c2 => Interrupt::I2C2_ER,
            I2cInstance::I2c3 => Interrupt::I2C3_ER,
        }
    }

    /// Instance owning the given interrupt line, if any.
    #[must_use]
    pub fn from_irq(irq: Interrupt) -> Option<Self> {
        match irq {
            Interrupt::I2C1_EV | Interrupt::I2C1_ER => Some(I2cInstance::I2c1),
            Interrupt::I2C2_EV | Interrupt::I2C2_ER => Some(I2cInstance::I2c2),
            Interrupt::I2C3_EV | Interrupt::I2C3_ER => Some(I2cInstance::I2c3),
            _ => None,
        }
    }
}

/// Driver bound to a memory-mapped instance.
pub type I2cDriver<'a, L = NoOpLogger> = Stm32f401I2c<'a, Mmio, L>;

/// Create the driver for `instance`.
///
/// # Safety
///
/// The caller must guarantee exclusive ownership of the instance's register
/// block for the lifetime of the returned driver.
#[must_use]
pub unsafe fn instantiate<'a, L: Logger>(
    instance: I2cInstance,
    config: I2cConfig,
    logger: L,
) -> I2cDriver<'a, L> {
    Stm32f401I2c::with_logger(Mmio::new(instance.register_block()), config, logger)
}

/// Create drivers for all three instances, indexed like [`I2cInstance::ALL`].
///
/// # Safety
///
/// Same as [`instantiate`], for every instance.
#[must_use]
pub unsafe fn instantiate_hardware<'a>(configs: [I2cConfig; 3]) -> [I2cDriver<'a>; 3] {
    let [c1, c2, c3] = configs;
    [
        instantiate(I2cInstance::I2c1, c1, NoOpLogger),
        instantiate(I2cInstance::I2c2, c2, NoOpLogger),
        instantiate(I2cInstance::I2c3, c3, NoOpLogger),
    ]
}
