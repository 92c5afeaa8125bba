// Licensed under the Apache-2.0 license

//! embedded-hal front end for the blocking master engine.
//!
//! Wraps any [`I2cMaster`] so that generic device drivers written against
//! `embedded_hal::i2c::I2c` can run on top of it. Failures are reported
//! through the controller's logger before being returned.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::traits::I2cMaster;
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct I2cController<H: I2cMaster, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub logger: L,
}

impl<H: I2cMaster> I2cController<H, NoOpLogger> {
    pub fn new(hardware: H) -> Self {
        Self {
            hardware,
            logger: NoOpLogger,
        }
    }
}

impl<H: I2cMaster, L: Logger> I2cController<H, L> {
    pub fn with_logger(hardware: H, logger: L) -> Self {
        Self { hardware, logger }
    }

    pub fn into_inner(self) -> H {
        self.hardware
    }

    fn logged<T>(&mut self, what: &str, result: Result<T, H::Error>) -> Result<T, H::Error> {
        if result.is_err() {
            self.logger.error(what);
        }
        result
    }
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::ErrorType for I2cController<H, L> {
    type Error = H::Error;
}

impl<H: I2cMaster, L: Logger> embedded_hal::i2c::I2c for I2cController<H, L> {
    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let result = self.hardware.read(addr, buffer);
        self.logged("i2c: read failed", result)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        let result = self.hardware.write(addr, bytes);
        self.logged("i2c: write failed", result)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        let result = self.hardware.write_read(addr, bytes, buffer);
        self.logged("i2c: write_read failed", result)
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.hardware.transaction_slice(addr, operations);
        self.logged("i2c: transaction failed", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::{I2cConfig, I2cError};
    use crate::i2c::sim::{BusOp, SimRegisters};
    use crate::i2c::stm32f401_i2c::Stm32f401I2c;
    use crate::i2c::traits::I2cHardwareCore;
    use embedded_hal::i2c::I2c;

    struct CountingLogger {
        errors: usize,
    }

    impl Logger for CountingLogger {
        fn debug(&mut self, _msg: &str) {}
        fn error(&mut self, _msg: &str) {
            self.errors += 1;
        }
    }

    fn controller(
        sim: &SimRegisters,
    ) -> I2cController<Stm32f401I2c<'static, SimRegisters>, CountingLogger> {
        let mut hw = Stm32f401I2c::new(sim.clone(), I2cConfig::default());
        hw.init(16_000_000).unwrap();
        hw.set_enabled(true);
        sim.clear_log();
        I2cController::with_logger(hw, CountingLogger { errors: 0 })
    }

    // Generic driver code only sees the embedded-hal trait.
    fn read_register<I: I2c>(bus: &mut I, addr: u8, reg: u8) -> Result<u8, I::Error> {
        let mut value = [0u8; 1];
        bus.write_read(addr, &[reg], &mut value)?;
        Ok(value[0])
    }

    #[test]
    fn test_write_read_through_embedded_hal() {
        let sim = SimRegisters::with_slave_data(&[0x5A]);
        let mut bus = controller(&sim);
        assert_eq!(read_register(&mut bus, 0x1D, 0x0F), Ok(0x5A));

        let log = sim.log();
        assert_eq!(log.iter().filter(|&&o| o == BusOp::Start).count(), 2);
        assert_eq!(log.iter().filter(|&&o| o == BusOp::Stop).count(), 1);
        assert!(log.contains(&BusOp::Write(0x0F)));
        assert_eq!(bus.logger.errors, 0);
    }

    #[test]
    fn test_errors_are_logged() {
        let sim = SimRegisters::new();
        let mut bus = controller(&sim);
        let mut empty: [u8; 0] = [];
        assert_eq!(bus.read(0x20, &mut empty), Err(I2cError::InvalidLength));
        assert_eq!(bus.write(0xFF, &[1]), Err(I2cError::InvalidAddress));
        assert_eq!(bus.logger.errors, 2);
        assert!(sim.log().is_empty());
    }

    #[test]
    fn test_transaction_and_into_inner() {
        let sim = SimRegisters::new();
        let mut bus = controller(&sim);
        bus.transaction(0x30, &mut [Operation::Write(&[1, 2])])
            .unwrap();
        assert_eq!(
            sim.log(),
            vec![
                BusOp::Start,
                BusOp::Address(0x60),
                BusOp::AddrCleared,
                BusOp::Write(1),
                BusOp::Write(2),
                BusOp::Stop,
            ]
        );
        let hw = bus.into_inner();
        assert_eq!(hw.state(), crate::i2c::common::TransferState::Ready);
    }
}
