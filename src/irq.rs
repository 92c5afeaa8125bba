// Licensed under the Apache-2.0 license

//! Interrupt controller seam.
//!
//! The I2C driver never touches the NVIC directly; bring-up code configures
//! the event and error lines through [`IrqController`], and the firmware's
//! vector table forwards those interrupts to the driver handlers.

use cortex_m::peripheral::NVIC;

pub use stm32f4::stm32f401::{Interrupt, NVIC_PRIO_BITS};

/// Enable, disable and prioritise interrupt lines.
pub trait IrqController {
    fn enable(&mut self, irq: Interrupt);
    fn disable(&mut self, irq: Interrupt);

    /// Set the logical priority (0 = most urgent) of a line.
    fn set_priority(&mut self, irq: Interrupt, priority: u8);
}

/// [`IrqController`] backed by the Cortex-M NVIC.
pub struct NvicController {
    nvic: NVIC,
}

impl NvicController {
    #[must_use]
    pub fn new(nvic: NVIC) -> Self {
        Self { nvic }
    }

    /// Give back the NVIC peripheral.
    #[must_use]
    pub fn free(self) -> NVIC {
        self.nvic
    }
}

/// Map a logical priority onto the implemented upper bits of the NVIC
/// priority byte.
#[must_use]
pub const fn hw_priority(priority: u8) -> u8 {
    let max = (1 << NVIC_PRIO_BITS) - 1;
    let p = if priority > max { max } else { priority };
    p << (8 - NVIC_PRIO_BITS)
}

impl IrqController for NvicController {
    fn enable(&mut self, irq: Interrupt) {
        // SAFETY: the I2C handlers do not rely on interrupt masking for
        // memory safety; the driver state is reached through `&mut`.
        unsafe { NVIC::unmask(irq) };
    }

    fn disable(&mut self, irq: Interrupt) {
        NVIC::mask(irq);
    }

    fn set_priority(&mut self, irq: Interrupt, priority: u8) {
        // SAFETY: changing priorities can break priority-based critical
        // sections; this crate does not use any.
        unsafe { self.nvic.set_priority(irq, hw_priority(priority)) };
    }
}
