//! Transport abstraction
//!
//! The device polls any byte-oriented channel that can report how many
//! bytes are pending; the serial implementation wraps a `serialport`
//! handle. Alternate channels (and test doubles) implement the same trait.

use serialport::SerialPort;
use std::io::{self, Read, Write};

/// A byte-oriented channel with no message boundaries of its own
pub trait Transport: Read + Write + Send {
    /// Number of bytes available to read without blocking
    fn bytes_to_read(&mut self) -> io::Result<u32>;

    /// Discard any unread input
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Discard any unsent output
    fn clear_output_buffer(&mut self) -> io::Result<()>;
}

/// Serial port wrapper implementing [`Transport`]
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an open serial port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialChannel {
    fn bytes_to_read(&mut self) -> io::Result<u32> {
        self.port
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_output_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Output)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
