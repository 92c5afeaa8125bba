// Licensed under the Apache-2.0 license

//! # I2C Hardware Abstraction Traits
//!
//! Small traits that split the driver surface by responsibility:
//!
//! ```text
//! I2cHardwareCore (timing, enable, acknowledge, interrupt sources)
//!     ├── I2cMaster (blocking master transfers)
//!     └── I2cSlaveByte (single-byte slave data I/O)
//! EventSink (application side of the interrupt handlers)
//! ```

use crate::common::Logger;
use crate::i2c::common::I2cEvent;
use crate::i2c::registers::RegisterAccess;
use crate::i2c::stm32f401_i2c::Stm32f401I2c;
use crate::i2c::timing::TimingRegisters;
use embedded_hal::i2c::{AddressMode, Operation, SevenBitAddress};

/// Core I2C hardware interface.
///
/// # Examples
///
/// ```rust,no_run
/// use stm32f401_ddk::i2c::{I2cHardwareCore, cr2};
///
/// fn bring_up<T: I2cHardwareCore>(i2c: &mut T, pclk_hz: u32) -> Result<(), T::Error> {
///     i2c.init(pclk_hz)?;
///     i2c.set_enabled(true);
///     i2c.enable_interrupts(cr2::ITEVTEN | cr2::ITERREN);
///     Ok(())
/// }
/// ```
pub trait I2cHardwareCore {
    /// Hardware-specific error type that implements embedded-hal error traits
    type Error: embedded_hal::i2c::Error + core::fmt::Debug;

    /// Program timing, acknowledge default and own address for a peripheral
    /// clock of `pclk_hz`. The peripheral is left disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured speed or own address is invalid.
    fn init(&mut self, pclk_hz: u32) -> Result<TimingRegisters, Self::Error>;

    /// Set or clear the peripheral enable bit.
    fn set_enabled(&mut self, enabled: bool);

    /// Acknowledge received bytes (`true`) or NACK them (`false`).
    fn set_acking(&mut self, enabled: bool);

    /// Enable interrupt sources given as CR2 bits.
    fn enable_interrupts(&mut self, mask: u32);

    /// Disable interrupt sources given as CR2 bits.
    fn disable_interrupts(&mut self, mask: u32);
}

/// Blocking I2C master operations.
///
/// # Examples
///
/// ```rust,no_run
/// use stm32f401_ddk::i2c::I2cMaster;
///
/// fn read_sensor<T: I2cMaster>(mut i2c: T) -> Result<u16, T::Error> {
///     let mut data = [0u8; 2];
///     i2c.read(0x48u8, &mut data)?;
///     Ok(u16::from_be_bytes(data))
/// }
/// ```
pub trait I2cMaster<A: AddressMode = SevenBitAddress>: I2cHardwareCore {
    /// Write `bytes` to the device at `addr` and release the bus.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range address or while a non-blocking
    /// transfer owns the handle.
    fn write(&mut self, addr: A, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fill `buffer` from the device at `addr` and release the bus.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range address, an empty buffer, or
    /// while a non-blocking transfer owns the handle.
    fn read(&mut self, addr: A, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Write then read with a repeated START in between.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::write`] and [`Self::read`].
    fn write_read(&mut self, addr: A, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Execute `ops_slice` as one transaction. Adjacent operations of the
    /// same kind share one address phase; a direction change issues a
    /// repeated START; the bus is released once at the end.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range address, an empty read, or
    /// while a non-blocking transfer owns the handle.
    fn transaction_slice(
        &mut self,
        addr: A,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), Self::Error>;
}

/// Slave-mode data register access, one byte at a time.
pub trait I2cSlaveByte: I2cHardwareCore {
    /// Place the next byte to transmit to the master.
    fn slave_write_byte(&mut self, value: u8);

    /// Take the byte last received from the master.
    fn slave_read_byte(&mut self) -> u8;
}

/// Receives notifications from the interrupt handlers.
///
/// The handler passes itself back so a sink can respond in place, for
/// example by answering [`I2cEvent::DataRequest`] with
/// [`I2cSlaveByte::slave_write_byte`] or collecting the buffer on
/// [`I2cEvent::RxComplete`].
pub trait EventSink<R: RegisterAccess, L: Logger> {
    fn on_event(&mut self, i2c: &mut Stm32f401I2c<'_, R, L>, event: I2cEvent);
}

/// Discards every notification.
impl<R: RegisterAccess, L: Logger> EventSink<R, L> for () {
    fn on_event(&mut self, _i2c: &mut Stm32f401I2c<'_, R, L>, _event: I2cEvent) {}
}
