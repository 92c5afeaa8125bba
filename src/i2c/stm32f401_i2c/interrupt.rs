// Licensed under the Apache-2.0 license

//! Interrupt-driven master transfers and the event/error handlers.
//!
//! `arm_*` stores the buffer, issues START and enables the buffer, event
//! and error interrupt sources. From then on every SB, ADDR, TXE, RXNE and
//! BTF condition raises the event vector, whose handler advances the
//! transfer by one step and notifies the [`EventSink`] on completion.

use super::Stm32f401I2c;
use crate::common::Logger;
use crate::i2c::common::{ErrorCondition, I2cError, I2cEvent, TransferState};
use crate::i2c::registers::{cr1, cr2, sr1, sr2, Register, RegisterAccess};
use crate::i2c::traits::{EventSink, I2cHardwareCore};

/// SR1 error flags in the order they are reported.
const ERROR_FLAGS: [(u32, ErrorCondition); 5] = [
    (sr1::BERR, ErrorCondition::BusError),
    (sr1::ARLO, ErrorCondition::ArbitrationLost),
    (sr1::AF, ErrorCondition::AcknowledgeFailure),
    (sr1::OVR, ErrorCondition::Overrun),
    (sr1::TIMEOUT, ErrorCondition::Timeout),
];

fn error_message(condition: ErrorCondition) -> &'static str {
    match condition {
        ErrorCondition::BusError => "i2c: bus error",
        ErrorCondition::ArbitrationLost => "i2c: arbitration lost",
        ErrorCondition::AcknowledgeFailure => "i2c: acknowledge failure",
        ErrorCondition::Overrun => "i2c: overrun/underrun",
        ErrorCondition::Timeout => "i2c: timeout",
    }
}

impl<'a, R: RegisterAccess, L: Logger> Stm32f401I2c<'a, R, L> {
    /// Start sending `buffer` to `address` and return at once.
    ///
    /// Returns the state the handle was in. Anything other than
    /// [`TransferState::Ready`] means a transfer is already in flight and
    /// this call changed nothing.
    ///
    /// # Errors
    ///
    /// [`I2cError::InvalidAddress`] above 0x7F and
    /// [`I2cError::InvalidLength`] for an empty buffer.
    pub fn arm_send(
        &mut self,
        buffer: &'a [u8],
        address: u8,
        hold_bus: bool,
    ) -> Result<TransferState, I2cError> {
        let previous = self.state;
        if previous.is_busy() {
            self.logger.debug("i2c: send not armed, transfer in flight");
            return Ok(previous);
        }
        Self::check_target(address)?;
        if buffer.is_empty() {
            return Err(I2cError::InvalidLength);
        }

        self.tx_buf = Some(buffer);
        self.tx_pos = 0;
        self.device_address = address;
        self.hold_bus = hold_bus;
        self.state = TransferState::BusySending;

        self.generate_start();
        self.enable_interrupts(cr2::IT_ALL);
        Ok(previous)
    }

    /// Start filling `buffer` from `address` and return at once.
    ///
    /// The filled buffer is handed back by [`Self::take_received`] once
    /// [`I2cEvent::RxComplete`] has been delivered.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::arm_send`].
    pub fn arm_receive(
        &mut self,
        buffer: &'a mut [u8],
        address: u8,
        hold_bus: bool,
    ) -> Result<TransferState, I2cError> {
        let previous = self.state;
        if previous.is_busy() {
            self.logger.debug("i2c: receive not armed, transfer in flight");
            return Ok(previous);
        }
        Self::check_target(address)?;
        if buffer.is_empty() {
            return Err(I2cError::InvalidLength);
        }

        self.rx_size = buffer.len();
        self.rx_pos = 0;
        self.rx_buf = Some(buffer);
        self.device_address = address;
        self.hold_bus = hold_bus;
        self.state = TransferState::BusyReceiving;

        self.generate_start();
        self.enable_interrupts(cr2::IT_ALL);
        Ok(previous)
    }

    /// End the send: mask buffer and event interrupts and return to Ready.
    /// The error interrupt stays enabled.
    pub fn close_send(&mut self) {
        self.disable_interrupts(cr2::ITBUFEN | cr2::ITEVTEN);
        self.state = TransferState::Ready;
        self.tx_buf = None;
        self.tx_pos = 0;
    }

    /// End the receive, restore the configured ACK and give back the
    /// buffer. When closed early, slots not yet received keep their old
    /// contents.
    pub fn close_receive(&mut self) -> Option<&'a mut [u8]> {
        self.disable_interrupts(cr2::ITBUFEN | cr2::ITEVTEN);
        self.state = TransferState::Ready;
        self.rx_pos = 0;
        self.rx_size = 0;
        self.restore_acking();
        self.rx_buf.take()
    }

    fn event_source_enabled(&mut self) -> bool {
        self.regs.is_set(Register::Cr2, cr2::ITEVTEN)
    }

    fn buffer_source_enabled(&mut self) -> bool {
        self.regs.read(Register::Cr2) & (cr2::ITEVTEN | cr2::ITBUFEN)
            == cr2::ITEVTEN | cr2::ITBUFEN
    }

    /// Event vector body.
    ///
    /// Conditions are tested in the order SB, ADDR, BTF, STOPF, TXE, RXNE
    /// and CR2 is re-read before each, so a step that closes the transfer
    /// silences the remaining ones.
    pub fn handle_event_interrupt<S: EventSink<R, L>>(&mut self, sink: &mut S) {
        if !self.event_source_enabled() {
            return;
        }

        if self.regs.is_set(Register::Sr1, sr1::SB) {
            match self.state {
                TransferState::BusySending => self.send_address(self.device_address, false),
                TransferState::BusyReceiving => self.send_address(self.device_address, true),
                TransferState::Ready => {}
            }
        }

        if self.event_source_enabled() && self.regs.is_set(Register::Sr1, sr1::ADDR) {
            self.clear_address_flag();
        }

        if self.event_source_enabled()
            && self.state == TransferState::BusySending
            && self.regs.is_set(Register::Sr1, sr1::BTF)
            && self.regs.is_set(Register::Sr1, sr1::TXE)
            && self.tx_remaining() == 0
        {
            if !self.hold_bus {
                self.generate_stop();
            }
            self.close_send();
            sink.on_event(self, I2cEvent::TxComplete);
        }

        if self.event_source_enabled() && self.regs.is_set(Register::Sr1, sr1::STOPF) {
            // SR1 was just read; a CR1 write completes the STOPF clear.
            // START/STOP are masked so a pending request is not re-issued.
            let control = self.regs.read(Register::Cr1);
            self.regs.write(Register::Cr1, control & !(cr1::START | cr1::STOP));
            sink.on_event(self, I2cEvent::StopDetected);
        }

        if self.buffer_source_enabled() && self.regs.is_set(Register::Sr1, sr1::TXE) {
            if self.regs.is_set(Register::Sr2, sr2::MSL) {
                if self.state == TransferState::BusySending {
                    self.transmit_next();
                }
            } else if self.regs.is_set(Register::Sr2, sr2::TRA) {
                sink.on_event(self, I2cEvent::DataRequest);
            }
        }

        if self.buffer_source_enabled() && self.regs.is_set(Register::Sr1, sr1::RXNE) {
            if self.regs.is_set(Register::Sr2, sr2::MSL) {
                if self.state == TransferState::BusyReceiving {
                    self.receive_next(sink);
                }
            } else {
                sink.on_event(self, I2cEvent::DataReceived);
            }
        }
    }

    fn transmit_next(&mut self) {
        let next = self.tx_buf.and_then(|buf| buf.get(self.tx_pos)).copied();
        if let Some(byte) = next {
            self.regs.write(Register::Dr, u32::from(byte));
            self.tx_pos += 1;
        }
    }

    fn receive_next<S: EventSink<R, L>>(&mut self, sink: &mut S) {
        if self.rx_size == 1 {
            if !self.hold_bus {
                self.generate_stop();
            }
        } else if self.rx_remaining() == 2 {
            self.set_acking(false);
            if !self.hold_bus {
                self.generate_stop();
            }
        }

        let byte = self.read_data();
        let pos = self.rx_pos;
        if let Some(slot) = self.rx_buf.as_deref_mut().and_then(|buf| buf.get_mut(pos)) {
            *slot = byte;
        }
        self.rx_pos += 1;

        if self.rx_remaining() == 0 {
            self.received = self.close_receive();
            sink.on_event(self, I2cEvent::RxComplete);
        }
    }

    /// Error vector body.
    ///
    /// Each pending error flag is cleared on its own and reported once. No
    /// recovery is attempted: the application decides whether to close
    /// the transfer or issue a STOP.
    pub fn handle_error_interrupt<S: EventSink<R, L>>(&mut self, sink: &mut S) {
        if !self.regs.is_set(Register::Cr2, cr2::ITERREN) {
            return;
        }

        for (flag, condition) in ERROR_FLAGS {
            if self.regs.is_set(Register::Sr1, flag) {
                self.regs.clear_bits(Register::Sr1, flag);
                self.logger.error(error_message(condition));
                sink.on_event(self, I2cEvent::Error(condition));
            }
        }
    }
}
