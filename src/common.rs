// Licensed under the Apache-2.0 license

//! Shared driver infrastructure.
//!
//! Drivers in this crate take a [`Logger`] as a generic parameter so that
//! diagnostics can be routed to a UART during bring-up and compiled out
//! entirely in production builds via [`NoOpLogger`].

/// Minimal logging sink used by the peripheral drivers.
///
/// Messages are static strings so that logging never needs formatting
/// machinery or allocation, and is safe to call from interrupt context.
pub trait Logger {
    /// Record a diagnostic message.
    fn debug(&mut self, msg: &str);

    /// Record an error condition.
    fn error(&mut self, msg: &str);
}

/// Logger that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Logger writing one line per message to an `embedded_io` sink.
///
/// Write failures are dropped: a logger must never turn a diagnostic into
/// a driver failure.
pub struct IoLogger<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> IoLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Give back the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn line(&mut self, level: &str, msg: &str) {
        let _ = self.writer.write_all(level.as_bytes());
        let _ = self.writer.write_all(msg.as_bytes());
        let _ = self.writer.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for IoLogger<W> {
    fn debug(&mut self, msg: &str) {
        self.line("[D] ", msg);
    }

    fn error(&mut self, msg: &str) {
        self.line("[E] ", msg);
    }
}
