// Licensed under the Apache-2.0 license

//! STM32F401 I2C register map and access seam.
//!
//! Bit positions follow RM0368. Porting the driver to another silicon
//! revision of the same peripheral only requires remapping this module.
//!
//! All register traffic goes through [`RegisterAccess`]. Reads take
//! `&mut self` because several reads have side effects on this peripheral:
//! reading SR1 followed by SR2 clears ADDR, and reading DR clears RXNE.
//! On hardware the seam is backed by the `stm32f4` PAC register block.

use stm32f4::stm32f401::i2c1::RegisterBlock;

/// Registers of one I2C instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    Cr1,
    Cr2,
    Oar1,
    Oar2,
    Dr,
    Sr1,
    Sr2,
    Ccr,
    Trise,
}

pub mod cr1 {
    pub const PE: u32 = 1 << 0;
    pub const START: u32 = 1 << 8;
    pub const STOP: u32 = 1 << 9;
    pub const ACK: u32 = 1 << 10;
}

pub mod cr2 {
    pub const FREQ_MASK: u32 = 0x3F;
    pub const ITERREN: u32 = 1 << 8;
    pub const ITEVTEN: u32 = 1 << 9;
    pub const ITBUFEN: u32 = 1 << 10;
    /// Every interrupt source used by a non-blocking transfer.
    pub const IT_ALL: u32 = ITERREN | ITEVTEN | ITBUFEN;
}

pub mod oar1 {
    pub const ADD_SHIFT: u32 = 1;
    /// Must be kept at 1 by software.
    pub const RESERVED_14: u32 = 1 << 14;
}

pub mod sr1 {
    pub const SB: u32 = 1 << 0;
    pub const ADDR: u32 = 1 << 1;
    pub const BTF: u32 = 1 << 2;
    pub const STOPF: u32 = 1 << 4;
    pub const RXNE: u32 = 1 << 6;
    pub const TXE: u32 = 1 << 7;
    pub const BERR: u32 = 1 << 8;
    pub const ARLO: u32 = 1 << 9;
    pub const AF: u32 = 1 << 10;
    pub const OVR: u32 = 1 << 11;
    pub const PECERR: u32 = 1 << 12;
    pub const TIMEOUT: u32 = 1 << 14;
}

pub mod sr2 {
    pub const MSL: u32 = 1 << 0;
    pub const BUSY: u32 = 1 << 1;
    pub const TRA: u32 = 1 << 2;
}

pub mod ccr {
    pub const CCR_MASK: u32 = 0xFFF;
    pub const DUTY: u32 = 1 << 14;
    pub const FS: u32 = 1 << 15;
}

pub mod trise {
    pub const TRISE_MASK: u32 = 0x3F;
}

/// Read/write access to the registers of one I2C instance.
pub trait RegisterAccess {
    fn read(&mut self, reg: Register) -> u32;
    fn write(&mut self, reg: Register, value: u32);

    /// Read-modify-write.
    fn modify<F: FnOnce(u32) -> u32>(&mut self, reg: Register, f: F) {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    fn set_bits(&mut self, reg: Register, mask: u32) {
        self.modify(reg, |v| v | mask);
    }

    fn clear_bits(&mut self, reg: Register, mask: u32) {
        self.modify(reg, |v| v & !mask);
    }

    /// True when any bit of `mask` is set.
    fn is_set(&mut self, reg: Register, mask: u32) -> bool {
        self.read(reg) & mask != 0
    }
}

/// Access to a hardware instance through its PAC register block.
pub struct Mmio {
    regs: *const RegisterBlock,
}

// SAFETY: the handle is the single owner of its register block.
unsafe impl Send for Mmio {}

impl Mmio {
    /// # Safety
    ///
    /// `regs` must point at an I2C register block (`I2C1::ptr()` and
    /// friends) and the returned value must be its only owner.
    #[must_use]
    pub unsafe fn new(regs: *const RegisterBlock) -> Self {
        Self { regs }
    }

    fn block(&self) -> &RegisterBlock {
        // SAFETY: `new` requires `regs` to be a live, exclusively owned block.
        unsafe { &*self.regs }
    }

    #[must_use]
    pub fn register_block(&self) -> *const RegisterBlock {
        self.regs
    }
}

impl RegisterAccess for Mmio {
    fn read(&mut self, reg: Register) -> u32 {
        let regs = self.block();
        match reg {
            Register::Cr1 => u32::from(regs.cr1().read().bits()),
            Register::Cr2 => u32::from(regs.cr2().read().bits()),
            Register::Oar1 => u32::from(regs.oar1().read().bits()),
            Register::Oar2 => u32::from(regs.oar2().read().bits()),
            Register::Dr => u32::from(regs.dr().read().bits()),
            Register::Sr1 => u32::from(regs.sr1().read().bits()),
            Register::Sr2 => u32::from(regs.sr2().read().bits()),
            Register::Ccr => u32::from(regs.ccr().read().bits()),
            Register::Trise => u32::from(regs.trise().read().bits()),
        }
    }

    // Upper halves are reserved on every register, so narrowing is lossless.
    #[allow(clippy::cast_possible_truncation)]
    fn write(&mut self, reg: Register, value: u32) {
        let regs = self.block();
        // SAFETY: every bit pattern the driver composes is valid for the
        // target register.
        unsafe {
            match reg {
                Register::Cr1 => {
                    regs.cr1().write(|w| w.bits(value as _));
                }
                Register::Cr2 => {
                    regs.cr2().write(|w| w.bits(value as _));
                }
                Register::Oar1 => {
                    regs.oar1().write(|w| w.bits(value as _));
                }
                Register::Oar2 => {
                    regs.oar2().write(|w| w.bits(value as _));
                }
                Register::Dr => {
                    regs.dr().write(|w| w.bits(value as _));
                }
                Register::Sr1 => {
                    regs.sr1().write(|w| w.bits(value as _));
                }
                Register::Sr2 => {
                    // SR2 is read-only in the PAC; hardware ignores writes.
                }
                Register::Ccr => {
                    regs.ccr().write(|w| w.bits(value as _));
                }
                Register::Trise => {
                    regs.trise().write(|w| w.bits(value as _));
                }
            }
        }
    }
}
