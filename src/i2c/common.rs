// Licensed under the Apache-2.0 license

//! Common types and constants for the STM32F401 I2C driver modules.
//!
//! This module provides shared definitions for bus configuration, transfer
//! state, notification events and error handling used across the I2C
//! driver implementation.

use fugit::HertzU32;

/// Bus speed presets supported by the peripheral.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn hz(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// Fast-mode SCL duty cycle (tlow/thigh).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FastModeDuty {
    /// tlow/thigh = 2 (CCR = PCLK / (3 * speed))
    Ratio2,
    /// tlow/thigh = 16/9 (CCR = PCLK / (25 * speed))
    Ratio16To9,
}

/// Whether received bytes are acknowledged by default.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckControl {
    Enabled,
    Disabled,
}

/// Bus configuration applied by `init`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct I2cConfig {
    pub scl_speed: HertzU32,
    /// 7-bit own address used in slave mode.
    pub own_address: u8,
    pub ack: AckControl,
    pub duty: FastModeDuty,
}

impl I2cConfig {
    #[must_use]
    pub fn ack_enabled(&self) -> bool {
        self.ack == AckControl::Enabled
    }
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}

pub struct I2cConfigBuilder {
    scl_speed: HertzU32,
    own_address: u8,
    ack: AckControl,
    duty: FastModeDuty,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scl_speed: I2cSpeed::Standard.hz(),
            own_address: 0,
            ack: AckControl::Enabled,
            duty: FastModeDuty::Ratio2,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.scl_speed = speed.hz();
        self
    }
    /// Arbitrary SCL frequency; anything above 100 kHz selects fast mode.
    #[must_use]
    pub fn scl_speed(mut self, speed: HertzU32) -> Self {
        self.scl_speed = speed;
        self
    }
    #[must_use]
    pub fn own_address(mut self, address: u8) -> Self {
        self.own_address = address;
        self
    }
    #[must_use]
    pub fn ack(mut self, ack: AckControl) -> Self {
        self.ack = ack;
        self
    }
    #[must_use]
    pub fn duty(mut self, duty: FastModeDuty) -> Self {
        self.duty = duty;
        self
    }
    #[must_use]
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            scl_speed: self.scl_speed,
            own_address: self.own_address,
            ack: self.ack,
            duty: self.duty,
        }
    }
}

/// Direction state of the transfer handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferState {
    Ready,
    BusyReceiving,
    BusySending,
}

impl TransferState {
    #[must_use]
    pub fn is_busy(self) -> bool {
        self != TransferState::Ready
    }
}

/// Error conditions reported by the error interrupt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCondition {
    BusError,
    ArbitrationLost,
    AcknowledgeFailure,
    /// Overrun in receive or underrun in transmit.
    Overrun,
    Timeout,
}

/// Notifications delivered to the application from interrupt context.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cEvent {
    /// Non-blocking master send finished.
    TxComplete,
    /// Non-blocking master receive finished; fetch the data with
    /// `take_received`.
    RxComplete,
    /// STOP condition detected on the bus.
    StopDetected,
    /// Slave transmitter: the master wants a byte.
    DataRequest,
    /// Slave receiver: a byte is waiting in the data register.
    DataReceived,
    Error(ErrorCondition),
}

/// Invalid bus configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// Requested SCL speed of 0 Hz.
    InvalidSpeed,
    /// Own address does not fit in 7 bits.
    InvalidOwnAddress,
}

/// Errors of the driver API.
///
/// The bus-condition variants are never returned by the blocking engine,
/// which does not poll error flags. They are what an [`I2cEvent::Error`]
/// converts into, so an event sink can surface a failed interrupt-driven
/// transfer through the same type (and its embedded-hal error kind).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cError {
    Bus,
    ArbitrationLost,
    AcknowledgeFailure,
    Overrun,
    Timeout,
    /// Target address does not fit in 7 bits.
    InvalidAddress,
    /// Zero-length buffer.
    InvalidLength,
    /// A non-blocking transfer is in flight on this handle.
    Busy,
    Configuration(ConfigurationError),
}

/// Used by event sinks to turn a reported [`I2cEvent::Error`] into a result.
impl From<ErrorCondition> for I2cError {
    fn from(condition: ErrorCondition) -> Self {
        match condition {
            ErrorCondition::BusError => I2cError::Bus,
            ErrorCondition::ArbitrationLost => I2cError::ArbitrationLost,
            ErrorCondition::AcknowledgeFailure => I2cError::AcknowledgeFailure,
            ErrorCondition::Overrun => I2cError::Overrun,
            ErrorCondition::Timeout => I2cError::Timeout,
        }
    }
}

impl From<ConfigurationError> for I2cError {
    fn from(e: ConfigurationError) -> Self {
        I2cError::Configuration(e)
    }
}

impl embedded_hal::i2c::Error for I2cError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
        match self {
            I2cError::Bus => ErrorKind::Bus,
            I2cError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            I2cError::AcknowledgeFailure => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            I2cError::Overrun => ErrorKind::Overrun,
            _ => ErrorKind::Other,
        }
    }
}
