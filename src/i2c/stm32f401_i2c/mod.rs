// Licensed under the Apache-2.0 license

//! STM32F401 I2C peripheral driver.
//!
//! One [`Stm32f401I2c`] owns the registers of one instance plus the state of
//! at most one non-blocking master transfer. Transfers come in two flavours:
//!
//! - blocking ([`Stm32f401I2c::send`], [`Stm32f401I2c::receive`] and the
//!   [`I2cMaster`](super::traits::I2cMaster) impl), which busy-wait on status
//!   flags;
//! - interrupt driven ([`Stm32f401I2c::arm_send`],
//!   [`Stm32f401I2c::arm_receive`]), which return immediately and are
//!   advanced by [`Stm32f401I2c::handle_event_interrupt`] and
//!   [`Stm32f401I2c::handle_error_interrupt`] called from the instance's
//!   event and error vectors.
//!
//! The handle must be reachable from both thread code and the interrupt
//! vectors; the firmware provides that sharing (for example a
//! `cortex_m::interrupt::Mutex<RefCell<_>>`). Arming and handling are never
//! re-entered on the same handle.

mod blocking;
mod interrupt;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::{ConfigurationError, I2cConfig, I2cError, TransferState};
use crate::i2c::registers::{cr1, cr2, oar1, Register, RegisterAccess};
use crate::i2c::timing::{self, TimingRegisters};
use crate::i2c::traits::{I2cHardwareCore, I2cSlaveByte};
use crate::rcc::ClockSource;

/// Largest 7-bit address.
pub const MAX_ADDRESS: u8 = 0x7F;

/// First address-phase byte for a write to `address`.
#[must_use]
pub const fn write_address_byte(address: u8) -> u8 {
    (address << 1) & !1
}

/// First address-phase byte for a read from `address`.
#[must_use]
pub const fn read_address_byte(address: u8) -> u8 {
    (address << 1) | 1
}

/// Driver for one I2C instance.
///
/// `'a` is the lifetime of buffers lent to non-blocking transfers.
pub struct Stm32f401I2c<'a, R: RegisterAccess, L: Logger = NoOpLogger> {
    regs: R,
    config: I2cConfig,
    logger: L,
    state: TransferState,
    tx_buf: Option<&'a [u8]>,
    tx_pos: usize,
    rx_buf: Option<&'a mut [u8]>,
    rx_pos: usize,
    rx_size: usize,
    device_address: u8,
    hold_bus: bool,
    received: Option<&'a mut [u8]>,
}

impl<'a, R: RegisterAccess> Stm32f401I2c<'a, R, NoOpLogger> {
    pub fn new(regs: R, config: I2cConfig) -> Self {
        Self::with_logger(regs, config, NoOpLogger)
    }
}

impl<'a, R: RegisterAccess, L: Logger> Stm32f401I2c<'a, R, L> {
    pub fn with_logger(regs: R, config: I2cConfig, logger: L) -> Self {
        Self {
            regs,
            config,
            logger,
            state: TransferState::Ready,
            tx_buf: None,
            tx_pos: 0,
            rx_buf: None,
            rx_pos: 0,
            rx_size: 0,
            device_address: 0,
            hold_bus: false,
            received: None,
        }
    }

    /// Release the register block.
    pub fn free(self) -> R {
        self.regs
    }

    pub fn config(&self) -> &I2cConfig {
        &self.config
    }

    /// Replace the stored configuration. Takes effect on the next `init`.
    pub fn set_config(&mut self, config: I2cConfig) {
        self.config = config;
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    /// Target of the current or last non-blocking transfer.
    pub fn device_address(&self) -> u8 {
        self.device_address
    }

    /// Bytes still to be written by the armed send.
    pub fn tx_remaining(&self) -> usize {
        self.tx_buf
            .map_or(0, |buf| buf.len().saturating_sub(self.tx_pos))
    }

    /// Bytes still to be read by the armed receive.
    pub fn rx_remaining(&self) -> usize {
        self.rx_size.saturating_sub(self.rx_pos)
    }

    /// Buffer of the last completed non-blocking receive, once.
    pub fn take_received(&mut self) -> Option<&'a mut [u8]> {
        self.received.take()
    }

    /// [`I2cHardwareCore::init`] using the APB1 clock of `clocks`.
    ///
    /// # Errors
    ///
    /// See [`I2cHardwareCore::init`].
    pub fn init_from(&mut self, clocks: &impl ClockSource) -> Result<TimingRegisters, I2cError> {
        self.init(clocks.pclk1_hz())
    }

    /// True when any bit of `mask` is set in SR1.
    pub fn flag_status(&mut self, mask: u32) -> bool {
        self.regs.is_set(Register::Sr1, mask)
    }

    pub fn generate_start(&mut self) {
        self.regs.set_bits(Register::Cr1, cr1::START);
    }

    pub fn generate_stop(&mut self) {
        self.regs.set_bits(Register::Cr1, cr1::STOP);
    }

    fn send_address(&mut self, address: u8, read: bool) {
        let byte = if read {
            read_address_byte(address)
        } else {
            write_address_byte(address)
        };
        self.regs.write(Register::Dr, u32::from(byte));
    }

    /// Clear ADDR by reading SR1 then SR2.
    ///
    /// A single-byte non-blocking receive must NACK its only byte, so ACK
    /// is dropped before the clear releases SCL.
    pub fn clear_address_flag(&mut self) {
        if self.state == TransferState::BusyReceiving && self.rx_size == 1 {
            self.set_acking(false);
        }
        let _ = self.regs.read(Register::Sr1);
        let _ = self.regs.read(Register::Sr2);
    }

    fn read_data(&mut self) -> u8 {
        (self.regs.read(Register::Dr) & 0xFF) as u8
    }

    fn restore_acking(&mut self) {
        if self.config.ack_enabled() {
            self.set_acking(true);
        }
    }

    fn check_target(address: u8) -> Result<(), I2cError> {
        if address > MAX_ADDRESS {
            return Err(I2cError::InvalidAddress);
        }
        Ok(())
    }
}

impl<R: RegisterAccess, L: Logger> I2cHardwareCore for Stm32f401I2c<'_, R, L> {
    type Error = I2cError;

    /// Program CR1, CR2.FREQ, OAR1, CCR and TRISE.
    ///
    /// CR1 is overwritten with the acknowledge default (PE ends up clear).
    /// FREQ and the own address are OR-ed into CR2 and OAR1 without clearing
    /// them first, so re-initialising with different values accumulates
    /// bits; reset the instance through the RCC beforehand when changing
    /// either.
    fn init(&mut self, pclk_hz: u32) -> Result<TimingRegisters, I2cError> {
        if self.config.own_address > MAX_ADDRESS {
            self.logger.error("i2c: own address exceeds 7 bits");
            return Err(ConfigurationError::InvalidOwnAddress.into());
        }
        let timing = timing::compute(pclk_hz, &self.config)?;
        if pclk_hz == 0 {
            self.logger
                .error("i2c: peripheral clock reads 0 Hz, timing registers zeroed");
        }

        let ack = if self.config.ack_enabled() { cr1::ACK } else { 0 };
        self.regs.write(Register::Cr1, ack);
        self.regs.modify(Register::Cr2, |v| v | timing.freq);
        let own = u32::from(self.config.own_address) << oar1::ADD_SHIFT;
        self.regs
            .modify(Register::Oar1, |v| v | own | oar1::RESERVED_14);
        self.regs.write(Register::Ccr, timing.ccr);
        self.regs.write(Register::Trise, timing.trise);

        self.logger.debug("i2c: initialized");
        Ok(timing)
    }

    /// PE gates ACK in hardware, so enabling re-applies the configured
    /// acknowledge default.
    fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            let ack = if self.config.ack_enabled() { cr1::ACK } else { 0 };
            self.regs.set_bits(Register::Cr1, cr1::PE | ack);
        } else {
            self.regs.clear_bits(Register::Cr1, cr1::PE);
        }
    }

    fn set_acking(&mut self, enabled: bool) {
        if enabled {
            self.regs.set_bits(Register::Cr1, cr1::ACK);
        } else {
            self.regs.clear_bits(Register::Cr1, cr1::ACK);
        }
    }

    fn enable_interrupts(&mut self, mask: u32) {
        self.regs.set_bits(Register::Cr2, mask & cr2::IT_ALL);
    }

    fn disable_interrupts(&mut self, mask: u32) {
        self.regs.clear_bits(Register::Cr2, mask & cr2::IT_ALL);
    }
}

impl<R: RegisterAccess, L: Logger> I2cSlaveByte for Stm32f401I2c<'_, R, L> {
    fn slave_write_byte(&mut self, value: u8) {
        self.regs.write(Register::Dr, u32::from(value));
    }

    fn slave_read_byte(&mut self) -> u8 {
        self.read_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::{AckControl, I2cConfigBuilder};
    use crate::i2c::registers::ccr;
    use crate::i2c::sim::{BusOp, SimRegisters};

    struct FixedClock(u32);

    impl ClockSource for FixedClock {
        fn pclk1_hz(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_address_bytes() {
        assert_eq!(write_address_byte(0x50), 0xA0);
        assert_eq!(read_address_byte(0x50), 0xA1);
        assert_eq!(write_address_byte(0x7F), 0xFE);
        assert_eq!(read_address_byte(0x00), 0x01);

        for address in 0..=MAX_ADDRESS {
            assert_eq!(write_address_byte(address) & 1, 0);
            assert_eq!(read_address_byte(address) & 1, 1);
            assert_eq!(write_address_byte(address) >> 1, address);
        }
    }

    #[test]
    fn test_init_programs_timing() {
        let sim = SimRegisters::new();
        let config = I2cConfigBuilder::new().own_address(0x10).build();
        let mut i2c = Stm32f401I2c::new(sim.clone(), config);

        let timing = i2c.init_from(&FixedClock(16_000_000)).unwrap();
        assert_eq!(timing.ccr, 80);

        let s = sim.state();
        assert_eq!(s.ccr, 80);
        assert_eq!(s.trise, 17);
        assert_eq!(s.cr2 & cr2::FREQ_MASK, 16);
        assert_eq!(s.oar1, (0x10 << 1) | oar1::RESERVED_14);
        assert_eq!(s.cr1, cr1::ACK);
    }

    #[test]
    fn test_init_fast_mode_sets_fs() {
        let sim = SimRegisters::new();
        let config = I2cConfigBuilder::new()
            .speed(crate::i2c::common::I2cSpeed::Fast)
            .build();
        let mut i2c = Stm32f401I2c::new(sim.clone(), config);
        i2c.init(42_000_000).unwrap();
        assert_eq!(sim.state().ccr & ccr::FS, ccr::FS);
    }

    #[test]
    fn test_init_ack_disabled_clears_cr1() {
        let sim = SimRegisters::new();
        sim.state().cr1 = cr1::PE | cr1::ACK;
        let config = I2cConfigBuilder::new().ack(AckControl::Disabled).build();
        let mut i2c = Stm32f401I2c::new(sim.clone(), config);
        i2c.init(16_000_000).unwrap();
        assert_eq!(sim.cr1(), 0);
    }

    #[test]
    fn test_reinit_accumulates_own_address() {
        let sim = SimRegisters::new();
        let config = I2cConfigBuilder::new().own_address(0x10).build();
        let mut i2c = Stm32f401I2c::new(sim.clone(), config);
        i2c.init(16_000_000).unwrap();
        i2c.set_config(I2cConfigBuilder::new().own_address(0x21).build());
        i2c.init(16_000_000).unwrap();
        assert_eq!(
            sim.state().oar1,
            ((0x10 | 0x21) << 1) | oar1::RESERVED_14
        );
    }

    #[test]
    fn test_init_rejects_wide_own_address() {
        let sim = SimRegisters::new();
        let config = I2cConfigBuilder::new().own_address(0x80).build();
        let mut i2c = Stm32f401I2c::new(sim.clone(), config);
        assert_eq!(
            i2c.init(16_000_000),
            Err(I2cError::Configuration(ConfigurationError::InvalidOwnAddress))
        );
        assert_eq!(sim.state().ccr, 0);
    }

    #[test]
    fn test_init_zero_clock_is_logged() {
        struct Recorder(usize);
        impl Logger for Recorder {
            fn debug(&mut self, _msg: &str) {}
            fn error(&mut self, _msg: &str) {
                self.0 += 1;
            }
        }

        let sim = SimRegisters::new();
        let mut i2c = Stm32f401I2c::with_logger(sim, I2cConfig::default(), Recorder(0));
        let timing = i2c.init(0).unwrap();
        assert_eq!(timing.divider(), 0);
        assert_eq!(i2c.logger.0, 1);
    }

    #[test]
    fn test_enable_reapplies_ack() {
        let sim = SimRegisters::new();
        let mut i2c = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        i2c.set_enabled(true);
        assert_eq!(sim.cr1(), cr1::PE | cr1::ACK);
        i2c.set_enabled(false);
        assert_eq!(sim.cr1(), cr1::ACK);
    }

    #[test]
    fn test_set_acking_toggles_only_ack() {
        let sim = SimRegisters::new();
        sim.state().cr1 = cr1::PE;
        let mut i2c = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        i2c.set_acking(true);
        assert_eq!(sim.cr1(), cr1::PE | cr1::ACK);
        i2c.set_acking(false);
        assert_eq!(sim.cr1(), cr1::PE);
        assert_eq!(sim.log(), vec![BusOp::AckEnabled, BusOp::AckDisabled]);
    }

    #[test]
    fn test_interrupt_mask_limited_to_sources() {
        let sim = SimRegisters::new();
        sim.state().cr2 = 16;
        let mut i2c = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        i2c.enable_interrupts(0xFFFF_FFFF);
        assert_eq!(sim.cr2(), 16 | cr2::IT_ALL);
        i2c.disable_interrupts(cr2::ITBUFEN);
        assert_eq!(sim.cr2(), 16 | cr2::ITEVTEN | cr2::ITERREN);
    }

    #[test]
    fn test_flag_status() {
        let sim = SimRegisters::new();
        let mut i2c = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        assert!(!i2c.flag_status(crate::i2c::registers::sr1::SB));
        i2c.generate_start();
        assert!(i2c.flag_status(crate::i2c::registers::sr1::SB));
    }

    #[test]
    fn test_clear_address_flag_reads_sr1_then_sr2() {
        let sim = SimRegisters::new();
        let mut i2c = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        i2c.generate_start();
        i2c.send_address(0x50, false);
        i2c.clear_address_flag();
        assert_eq!(
            sim.log(),
            vec![BusOp::Start, BusOp::Address(0xA0), BusOp::AddrCleared]
        );
    }

    #[test]
    fn test_slave_byte_io() {
        let sim = SimRegisters::new();
        sim.enter_slave_mode(true);
        let mut i2c = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        i2c.slave_write_byte(0x3C);
        assert_eq!(sim.state().dr, 0x3C);

        sim.state().dr = 0x5A;
        assert_eq!(i2c.slave_read_byte(), 0x5A);
        assert_eq!(sim.log(), vec![BusOp::Write(0x3C), BusOp::Read(0x5A)]);
    }
}
