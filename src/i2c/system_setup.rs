// Licensed under the Apache-2.0 license

//! I2C System Setup Helper
//!
//! System-level bring-up of an I2C instance: RCC clock gating and reset,
//! NVIC configuration of the event and error lines, and the driver `init`
//! with the live APB1 frequency. Kept apart from the driver so that the
//! register engine stays independent of the clock tree and interrupt
//! controller.

use crate::common::Logger;
use crate::i2c::common::I2cError;
use crate::i2c::hardware_instantiation::I2cInstance;
use crate::i2c::registers::RegisterAccess;
use crate::i2c::stm32f401_i2c::Stm32f401I2c;
use crate::i2c::timing::TimingRegisters;
use crate::i2c::traits::I2cHardwareCore;
use crate::irq::IrqController;
use crate::rcc::{ClockSource, PeripheralClockControl};

/// Stateless helper grouping the bring-up steps.
pub struct I2cSystemSetup;

impl I2cSystemSetup {
    /// Ungate the peripheral clock and pulse the reset line, leaving every
    /// register of the instance at its reset value.
    pub fn initialize_i2c_system<C: PeripheralClockControl>(
        clock_control: &mut C,
        instance: I2cInstance,
    ) {
        clock_control.enable_clock(instance);
        clock_control.reset(instance);
    }

    /// Reset the instance without touching its clock gate.
    pub fn reset_i2c_peripheral<C: PeripheralClockControl>(
        clock_control: &mut C,
        instance: I2cInstance,
    ) {
        clock_control.reset(instance);
    }

    /// Put the instance back into reset and gate its clock.
    pub fn shutdown_i2c_system<C: PeripheralClockControl, I: IrqController>(
        clock_control: &mut C,
        irq: &mut I,
        instance: I2cInstance,
    ) {
        Self::disable_interrupt_lines(irq, instance);
        clock_control.reset(instance);
        clock_control.disable_clock(instance);
    }

    /// Prioritise and unmask both interrupt lines of the instance.
    pub fn configure_interrupt_lines<I: IrqController>(
        irq: &mut I,
        instance: I2cInstance,
        priority: u8,
    ) {
        for line in [instance.event_irq(), instance.error_irq()] {
            irq.set_priority(line, priority);
            irq.enable(line);
        }
    }

    pub fn disable_interrupt_lines<I: IrqController>(irq: &mut I, instance: I2cInstance) {
        irq.disable(instance.event_irq());
        irq.disable(instance.error_irq());
    }

    /// Full bring-up: clocks, reset, driver `init` at the current PCLK1,
    /// peripheral enable, interrupt lines.
    ///
    /// # Errors
    ///
    /// Returns the driver's configuration error; the interrupt lines are
    /// left masked in that case.
    pub fn bring_up<C, K, I, R, L>(
        clock_control: &mut C,
        clocks: &K,
        irq: &mut I,
        i2c: &mut Stm32f401I2c<'_, R, L>,
        instance: I2cInstance,
        priority: u8,
    ) -> Result<TimingRegisters, I2cError>
    where
        C: PeripheralClockControl,
        K: ClockSource,
        I: IrqController,
        R: RegisterAccess,
        L: Logger,
    {
        Self::initialize_i2c_system(clock_control, instance);
        let timing = i2c.init(clocks.pclk1_hz())?;
        i2c.set_enabled(true);
        Self::configure_interrupt_lines(irq, instance, priority);
        Ok(timing)
    }
}
