// Licensed under the Apache-2.0 license

//! STM32F401 I2C driver module.
//!
//! Bare-metal `no_std` driver for the I2C1..I2C3 peripherals: timing
//! configuration, blocking and interrupt-driven master transfers, slave
//! byte I/O and error classification, plus an embedded-hal front end.

pub mod common;
pub mod hardware_instantiation;
pub mod i2c_controller;
pub mod registers;
pub mod stm32f401_i2c;
pub mod system_setup;
pub mod timing;
pub mod traits;

#[cfg(test)]
pub(crate) mod sim;

pub use common::{
    AckControl, ConfigurationError, ErrorCondition, FastModeDuty, I2cConfig, I2cConfigBuilder,
    I2cError, I2cEvent, I2cSpeed, TransferState,
};
pub use hardware_instantiation::{I2cDriver, I2cInstance};
pub use i2c_controller::I2cController;
pub use registers::{cr1, cr2, sr1, sr2, Mmio, Register, RegisterAccess};
pub use stm32f401_i2c::{read_address_byte, write_address_byte, Stm32f401I2c};
pub use system_setup::I2cSystemSetup;
pub use timing::TimingRegisters;
pub use traits::{EventSink, I2cHardwareCore, I2cMaster, I2cSlaveByte};
