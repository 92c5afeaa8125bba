// Licensed under the Apache-2.0 license

//! Simulated I2C register file for host tests.
//!
//! Models the master-mode side effects the driver depends on, with an
//! instantly responding slave:
//! - CR1.START sets SB, MSL and BUSY; START/STOP self-clear.
//! - A DR write while SB is set is the address byte: SB clears, ADDR sets
//!   and TRA follows the R/W bit.
//! - Reading SR1 and then SR2 while ADDR is set clears ADDR. A transmitter
//!   then sees TXE; a receiver gets the first slave byte in DR with RXNE.
//! - DR writes in transmitter mode complete immediately (TXE and BTF set).
//! - DR reads clear RXNE. The next slave byte is loaded while ACK is set;
//!   with ACK cleared exactly one more byte arrives (the NACKed one).
//! - A STOP requested during reception takes effect after the final byte.
//! - SR1 error bits are rc_w0; other SR1 bits ignore writes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use super::registers::{cr1, sr1, sr2, Register, RegisterAccess};

const SR1_RC_W0: u32 =
    sr1::BERR | sr1::ARLO | sr1::AF | sr1::OVR | sr1::PECERR | sr1::TIMEOUT | (1 << 15);

/// Externally visible bus activity, in order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusOp {
    Start,
    Stop,
    Address(u8),
    Write(u8),
    Read(u8),
    AckEnabled,
    AckDisabled,
    AddrCleared,
    StopfCleared,
}

#[derive(Default)]
pub struct SimState {
    pub cr1: u32,
    pub cr2: u32,
    pub oar1: u32,
    pub oar2: u32,
    pub dr: u32,
    pub sr1: u32,
    pub sr2: u32,
    pub ccr: u32,
    pub trise: u32,
    pub log: Vec<BusOp>,
    /// Bytes the addressed slave will return.
    pub slave_data: VecDeque<u8>,
    sr1_read_with_addr: bool,
    sr1_read_with_stopf: bool,
    receiving: bool,
    nacked: bool,
    stop_pending: bool,
}

impl SimState {
    fn load_next(&mut self) {
        if let Some(byte) = self.slave_data.pop_front() {
            self.dr = u32::from(byte);
            self.sr1 |= sr1::RXNE;
        }
    }

    fn release_bus(&mut self) {
        self.sr2 &= !(sr2::MSL | sr2::BUSY | sr2::TRA);
    }

    fn address_cleared(&mut self) {
        self.log.push(BusOp::AddrCleared);
        if self.sr2 & sr2::MSL == 0 {
            return;
        }
        if self.sr2 & sr2::TRA != 0 {
            self.sr1 |= sr1::TXE;
        } else {
            if self.cr1 & cr1::ACK == 0 {
                self.nacked = true;
            }
            self.load_next();
        }
    }

    fn read_dr(&mut self) -> u32 {
        let value = self.dr;
        self.log.push(BusOp::Read(value as u8));
        self.sr1 &= !sr1::RXNE;
        if self.receiving {
            if self.cr1 & cr1::ACK != 0 {
                self.load_next();
            } else if !self.nacked {
                self.nacked = true;
                self.load_next();
            } else {
                self.receiving = false;
                if self.stop_pending {
                    self.stop_pending = false;
                    self.release_bus();
                }
            }
        }
        value
    }

    fn write_cr1(&mut self, value: u32) {
        let old = self.cr1;
        if old & cr1::ACK == 0 && value & cr1::ACK != 0 {
            self.log.push(BusOp::AckEnabled);
        }
        if old & cr1::ACK != 0 && value & cr1::ACK == 0 {
            self.log.push(BusOp::AckDisabled);
        }
        if self.sr1_read_with_stopf && self.sr1 & sr1::STOPF != 0 {
            self.sr1 &= !sr1::STOPF;
            self.sr1_read_with_stopf = false;
            self.log.push(BusOp::StopfCleared);
        }
        if value & cr1::START != 0 {
            self.log.push(BusOp::Start);
            self.sr1 |= sr1::SB;
            self.sr2 |= sr2::MSL | sr2::BUSY;
            self.receiving = false;
            self.nacked = false;
            self.stop_pending = false;
        }
        if value & cr1::STOP != 0 {
            self.log.push(BusOp::Stop);
            if self.receiving {
                self.stop_pending = true;
            } else {
                self.release_bus();
            }
        }
        self.cr1 = value & !(cr1::START | cr1::STOP);
    }

    fn write_dr(&mut self, value: u32) {
        let byte = (value & 0xFF) as u8;
        self.dr = u32::from(byte);
        if self.sr1 & sr1::SB != 0 {
            self.sr1 &= !sr1::SB;
            self.sr1 |= sr1::ADDR;
            self.log.push(BusOp::Address(byte));
            if byte & 1 == 0 {
                self.sr2 |= sr2::TRA;
            } else {
                self.sr2 &= !sr2::TRA;
                self.receiving = true;
            }
        } else {
            self.log.push(BusOp::Write(byte));
            if self.sr2 & (sr2::MSL | sr2::TRA) == sr2::MSL | sr2::TRA {
                self.sr1 |= sr1::TXE | sr1::BTF;
            }
        }
    }
}

/// Cloneable handle to a shared [`SimState`]; the driver owns one clone and
/// the test keeps another to inspect and drive the bus.
#[derive(Clone, Default)]
pub struct SimRegisters {
    state: Rc<RefCell<SimState>>,
}

impl SimRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated slave that answers reads with `data`.
    pub fn with_slave_data(data: &[u8]) -> Self {
        let sim = Self::new();
        sim.state().slave_data.extend(data.iter().copied());
        sim
    }

    pub fn state(&self) -> std::cell::RefMut<'_, SimState> {
        self.state.borrow_mut()
    }

    pub fn log(&self) -> Vec<BusOp> {
        self.state.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Assert SR1 bits as if raised by hardware.
    pub fn raise(&self, bits: u32) {
        self.state.borrow_mut().sr1 |= bits;
    }

    pub fn sr1(&self) -> u32 {
        self.state.borrow().sr1
    }

    pub fn cr1(&self) -> u32 {
        self.state.borrow().cr1
    }

    pub fn cr2(&self) -> u32 {
        self.state.borrow().cr2
    }

    /// Put the peripheral into slave role.
    pub fn enter_slave_mode(&self, transmitter: bool) {
        let mut s = self.state.borrow_mut();
        s.sr2 = if transmitter { sr2::BUSY | sr2::TRA } else { sr2::BUSY };
    }
}

impl RegisterAccess for SimRegisters {
    fn read(&mut self, reg: Register) -> u32 {
        let mut s = self.state.borrow_mut();
        match reg {
            Register::Cr1 => s.cr1,
            Register::Cr2 => s.cr2,
            Register::Oar1 => s.oar1,
            Register::Oar2 => s.oar2,
            Register::Dr => s.read_dr(),
            Register::Sr1 => {
                if s.sr1 & sr1::ADDR != 0 {
                    s.sr1_read_with_addr = true;
                }
                if s.sr1 & sr1::STOPF != 0 {
                    s.sr1_read_with_stopf = true;
                }
                s.sr1
            }
            Register::Sr2 => {
                let value = s.sr2;
                if s.sr1_read_with_addr && s.sr1 & sr1::ADDR != 0 {
                    s.sr1_read_with_addr = false;
                    s.sr1 &= !sr1::ADDR;
                    s.address_cleared();
                }
                value
            }
            Register::Ccr => s.ccr,
            Register::Trise => s.trise,
        }
    }

    fn write(&mut self, reg: Register, value: u32) {
        let mut s = self.state.borrow_mut();
        match reg {
            Register::Cr1 => s.write_cr1(value),
            Register::Cr2 => s.cr2 = value,
            Register::Oar1 => s.oar1 = value,
            Register::Oar2 => s.oar2 = value,
            Register::Dr => s.write_dr(value),
            Register::Sr1 => {
                let cleared = SR1_RC_W0 & !value;
                s.sr1 &= !cleared;
            }
            Register::Sr2 => {}
            Register::Ccr => s.ccr = value,
            Register::Trise => s.trise = value,
        }
    }
}
