// Licensed under the Apache-2.0 license

//! Blocking master transfers.
//!
//! Every wait spins on an SR1 flag with no timeout. A missing or stuck
//! target (NACK, held SCL) blocks the caller indefinitely; error flags are
//! not polled here and only surface through the error interrupt when it is
//! enabled.

use embedded_hal::i2c::{Operation, SevenBitAddress};

use super::Stm32f401I2c;
use crate::common::Logger;
use crate::i2c::common::I2cError;
use crate::i2c::registers::{sr1, Register, RegisterAccess};
use crate::i2c::traits::{I2cHardwareCore, I2cMaster};

impl<R: RegisterAccess, L: Logger> Stm32f401I2c<'_, R, L> {
    /// Write `buffer` to `address`.
    ///
    /// With `hold_bus` the STOP is withheld so the next transfer starts
    /// with a repeated START.
    ///
    /// # Errors
    ///
    /// [`I2cError::Busy`] while a non-blocking transfer is armed,
    /// [`I2cError::InvalidAddress`] above 0x7F and
    /// [`I2cError::InvalidLength`] for an empty buffer. Nothing touches the
    /// bus in those cases.
    pub fn send(&mut self, buffer: &[u8], address: u8, hold_bus: bool) -> Result<(), I2cError> {
        self.check_blocking(address)?;
        if buffer.is_empty() {
            return Err(I2cError::InvalidLength);
        }
        self.begin_write(address);
        self.write_bytes(buffer);
        self.end_write(true, hold_bus);
        Ok(())
    }

    /// Fill `buffer` from `address`.
    ///
    /// The last byte is NACKed. ACK is restored afterwards when the
    /// configuration enables it.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::send`].
    pub fn receive(
        &mut self,
        buffer: &mut [u8],
        address: u8,
        hold_bus: bool,
    ) -> Result<(), I2cError> {
        self.check_blocking(address)?;
        if buffer.is_empty() {
            return Err(I2cError::InvalidLength);
        }
        let total = buffer.len();
        self.read_into(address, total, buffer.iter_mut(), hold_bus);
        Ok(())
    }

    fn check_blocking(&mut self, address: u8) -> Result<(), I2cError> {
        if self.state.is_busy() {
            self.logger.debug("i2c: blocking transfer refused, handle busy");
            return Err(I2cError::Busy);
        }
        Self::check_target(address)
    }

    fn wait_for(&mut self, flag: u32) {
        while !self.regs.is_set(Register::Sr1, flag) {
            core::hint::spin_loop();
        }
    }

    fn address_phase(&mut self, address: u8, read: bool) {
        self.generate_start();
        self.wait_for(sr1::SB);
        self.send_address(address, read);
        self.wait_for(sr1::ADDR);
    }

    fn begin_write(&mut self, address: u8) {
        self.address_phase(address, false);
        self.clear_address_flag();
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.wait_for(sr1::TXE);
            self.regs.write(Register::Dr, u32::from(byte));
        }
    }

    fn end_write(&mut self, wrote_data: bool, hold_bus: bool) {
        if wrote_data {
            self.wait_for(sr1::TXE);
            self.wait_for(sr1::BTF);
        }
        if !hold_bus {
            self.generate_stop();
        }
    }

    /// Read `total` bytes into `slots`, which may span several buffers.
    fn read_into<'b>(
        &mut self,
        address: u8,
        total: usize,
        slots: impl Iterator<Item = &'b mut u8>,
        hold_bus: bool,
    ) {
        self.address_phase(address, true);

        if total == 1 {
            self.set_acking(false);
            self.clear_address_flag();
            self.wait_for(sr1::RXNE);
            if !hold_bus {
                self.generate_stop();
            }
            for slot in slots.take(1) {
                *slot = self.read_data();
            }
        } else {
            self.clear_address_flag();
            for (index, slot) in slots.take(total).enumerate() {
                self.wait_for(sr1::RXNE);
                if total - index == 2 {
                    self.set_acking(false);
                    if !hold_bus {
                        self.generate_stop();
                    }
                }
                *slot = self.read_data();
            }
        }

        self.restore_acking();
    }
}

fn is_same_kind(a: &Operation<'_>, b: &Operation<'_>) -> bool {
    matches!(
        (a, b),
        (Operation::Read(_), Operation::Read(_)) | (Operation::Write(_), Operation::Write(_))
    )
}

impl<R: RegisterAccess, L: Logger> I2cMaster<SevenBitAddress> for Stm32f401I2c<'_, R, L> {
    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), I2cError> {
        self.transaction_slice(addr, &mut [Operation::Write(bytes)])
    }

    fn read(&mut self, addr: SevenBitAddress, buffer: &mut [u8]) -> Result<(), I2cError> {
        self.receive(buffer, addr, false)
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), I2cError> {
        self.transaction_slice(addr, &mut [Operation::Write(bytes), Operation::Read(buffer)])
    }

    fn transaction_slice(
        &mut self,
        addr: SevenBitAddress,
        ops_slice: &mut [Operation<'_>],
    ) -> Result<(), I2cError> {
        self.check_blocking(addr)?;
        let empty_read = ops_slice
            .iter()
            .any(|op| matches!(op, Operation::Read(buf) if buf.is_empty()));
        if empty_read {
            return Err(I2cError::InvalidLength);
        }

        let mut groups = ops_slice.chunk_by_mut(is_same_kind).peekable();
        while let Some(group) = groups.next() {
            let hold_bus = groups.peek().is_some();
            if matches!(group.first(), Some(Operation::Write(_))) {
                self.begin_write(addr);
                let mut wrote_data = false;
                for op in group.iter() {
                    if let Operation::Write(bytes) = op {
                        self.write_bytes(bytes);
                        wrote_data |= !bytes.is_empty();
                    }
                }
                self.end_write(wrote_data, hold_bus);
            } else {
                let total: usize = group
                    .iter()
                    .map(|op| match op {
                        Operation::Read(buf) => buf.len(),
                        Operation::Write(_) => 0,
                    })
                    .sum();
                let slots = group
                    .iter_mut()
                    .filter_map(|op| match op {
                        Operation::Read(buf) => Some(buf.iter_mut()),
                        Operation::Write(_) => None,
                    })
                    .flatten();
                self.read_into(addr, total, slots, hold_bus);
            }
        }
        Ok(())
    }
}
