//! Poll-driven device lifecycle
//!
//! [`SerialEventDevice`] owns the transport handle and all parser state.
//! An external scheduler calls [`poll`](SerialEventDevice::poll) on a
//! fixed cadence; each call reads whatever bytes are currently available,
//! stamps the read, runs the configured framing engine and emits any
//! completed event to the sink. Failures inside a poll are logged and
//! contained so the polling loop keeps running across transient I/O
//! hiccups.

use std::io::{Read, Write};

use super::byte_diff::ByteDiffTracker;
use super::clock::{Clock, MonotonicClock};
use super::config::{DeviceOptions, ParserConfig};
use super::error::DeviceError;
use super::event::{
    next_event_id, EventSink, SerialByteChangeEvent, SerialEvent, SerialInputEvent,
};
use super::parser::FrameParser;
use super::serial::{configure_port, open_port, resolve_port};
use super::transport::{SerialChannel, Transport};
use super::MAX_EVENT_DATA;

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The transport was read and any completed events were emitted
    Polled,
    /// Reporting disabled, transport closed, or a contained failure
    Idle,
}

/// Framing engine selected by the parser configuration
enum Framing {
    ByteDiff(ByteDiffTracker),
    Frames(FrameParser),
}

/// A polled serial input device
///
/// Owns the transport connection, the framing state and the leftover byte
/// buffer. Single-threaded: the caller drives it synchronously and no
/// internal locking or threading exists.
pub struct SerialEventDevice {
    /// Resolved port name (after "auto" expansion)
    port: String,
    baud: u32,
    channel: Option<Box<dyn Transport>>,
    framing: Framing,
    /// Unconsumed bytes from the previous poll (framing modes only)
    rx_buffer: Vec<u8>,
    reporting: bool,
    event_count: u64,
    last_poll_time: f64,
    clock: Box<dyn Clock>,
    sink: Box<dyn EventSink>,
}

impl SerialEventDevice {
    /// Create a device and open its serial port immediately.
    ///
    /// Configuration and connection problems both surface here rather than
    /// at the first poll.
    pub fn open(options: &DeviceOptions, sink: Box<dyn EventSink>) -> Result<Self, DeviceError> {
        let mut device = Self::build(options, None, Box::new(MonotonicClock::new()), sink)?;
        device.connect()?;
        Ok(device)
    }

    /// Create a device over an already-open channel, with an injected
    /// clock. The channel seam accepts any [`Transport`] implementation.
    pub fn with_channel(
        options: &DeviceOptions,
        channel: Box<dyn Transport>,
        clock: Box<dyn Clock>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, DeviceError> {
        Self::build(options, Some(channel), clock, sink)
    }

    fn build(
        options: &DeviceOptions,
        channel: Option<Box<dyn Transport>>,
        clock: Box<dyn Clock>,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, DeviceError> {
        let parser_config = ParserConfig::from_options(&options.event_parser)?;
        let framing = match parser_config {
            ParserConfig::ByteDiff => Framing::ByteDiff(ByteDiffTracker::new()),
            ParserConfig::Framed {
                prefix,
                delimiter,
                fixed_length,
            } => Framing::Frames(FrameParser::new(prefix, delimiter, fixed_length)),
        };

        // Port discovery only runs when this device will open the port
        // itself; an injected channel keeps the configured name as a label.
        let port = if channel.is_some() {
            options.port.clone()
        } else {
            resolve_port(&options.port)?
        };

        let last_poll_time = clock.now();
        Ok(Self {
            port,
            baud: options.baud,
            channel,
            framing,
            rx_buffer: Vec::new(),
            reporting: false,
            event_count: 0,
            last_poll_time,
            clock,
            sink,
        })
    }

    /// Resolved port name
    pub fn port(&self) -> &str {
        &self.port
    }

    /// Configured baud rate
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Whether the transport is currently open
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Whether events are being reported to the sink
    pub fn is_reporting(&self) -> bool {
        self.reporting
    }

    /// Events emitted since reporting was last enabled
    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    /// Open the serial port, drain any stale input and reset parse state.
    /// No-op when a channel is already attached.
    pub fn connect(&mut self) -> Result<(), DeviceError> {
        if self.channel.is_some() {
            return Ok(());
        }

        let mut port = open_port(&self.port, self.baud)?;
        configure_port(port.as_mut())?;

        let mut channel = SerialChannel::new(port);
        channel
            .clear_input_buffer()
            .map_err(|e| DeviceError::Connect(e.to_string()))?;
        drain_pending(&mut channel).map_err(|e| DeviceError::Connect(e.to_string()))?;

        self.channel = Some(Box::new(channel));
        self.reset_parse_state();
        tracing::debug!(port = %self.port, baud = self.baud, "serial channel opened");
        Ok(())
    }

    /// Close the transport. Best-effort: flush failures are logged and
    /// swallowed so shutdown always completes.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.as_mut() {
            if let Err(err) = channel.clear_input_buffer() {
                tracing::debug!(port = %self.port, error = %err, "input flush on close failed");
            }
        }
        self.channel = None;
        tracing::debug!(port = %self.port, "serial channel closed");
    }

    /// Start or stop reporting events to the sink.
    ///
    /// Every call clears the leftover buffer, the framing state and the
    /// running event counter. Enabling also connects the transport if
    /// needed and flushes stale input before polling resumes. Returns the
    /// current reporting state.
    pub fn enable_reporting(&mut self, enabled: bool) -> Result<bool, DeviceError> {
        if enabled && !self.reporting {
            if !self.is_connected() {
                self.connect()?;
            }
            self.flush_input()?;
        }
        self.reset_parse_state();
        self.event_count = 0;
        self.reporting = enabled;
        Ok(self.reporting)
    }

    /// Run one poll cycle.
    ///
    /// Reads all currently available bytes, feeds them through the
    /// configured framing engine and emits any completed event with its
    /// timing metadata. Any failure while reading or parsing is logged
    /// with its context and converted into an idle cycle; it never
    /// propagates to the caller.
    pub fn poll(&mut self) -> PollStatus {
        let logged_time = self.clock.now();

        if !self.reporting || !self.is_connected() {
            self.last_poll_time = logged_time;
            return PollStatus::Idle;
        }

        match self.poll_connected(logged_time) {
            Ok(()) => PollStatus::Polled,
            Err(err) => {
                tracing::error!(
                    port = %self.port,
                    error = %err,
                    "poll failed; treating cycle as idle"
                );
                PollStatus::Idle
            }
        }
    }

    fn poll_connected(&mut self, logged_time: f64) -> Result<(), DeviceError> {
        let incoming = self.read_available()?;
        let read_time = self.clock.now();
        let confidence_interval = read_time - self.last_poll_time;

        match &mut self.framing {
            Framing::ByteDiff(tracker) => {
                for change in tracker.feed(&incoming) {
                    self.event_count += 1;
                    self.sink.emit(SerialEvent::ByteChange(SerialByteChangeEvent {
                        id: next_event_id(),
                        port: self.port.clone(),
                        read_time,
                        logged_time,
                        confidence_interval,
                        prev_byte: change.prev,
                        current_byte: change.current,
                    }));
                }
            }
            Framing::Frames(parser) => {
                let leftover = std::mem::take(&mut self.rx_buffer);
                let outcome = parser.feed(leftover, &incoming);
                self.rx_buffer = outcome.leftover;
                if let Some(mut data) = outcome.frame {
                    if data.len() > MAX_EVENT_DATA {
                        tracing::warn!(
                            port = %self.port,
                            len = data.len(),
                            "frame exceeds event capacity; truncating"
                        );
                        data.truncate(MAX_EVENT_DATA);
                    }
                    self.event_count += 1;
                    self.sink.emit(SerialEvent::Input(SerialInputEvent {
                        id: next_event_id(),
                        port: self.port.clone(),
                        read_time,
                        logged_time,
                        confidence_interval,
                        data,
                    }));
                }
            }
        }

        self.last_poll_time = read_time;
        Ok(())
    }

    /// Read and return all currently available bytes, bypassing the parser
    pub fn read(&mut self) -> Result<Vec<u8>, DeviceError> {
        self.read_available()
    }

    /// Write bytes to the device and flush the output, returning the
    /// number of bytes written
    pub fn write(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        let channel = self.channel.as_mut().ok_or(DeviceError::NotConnected)?;
        let written = channel.write(data)?;
        channel.flush()?;
        Ok(written)
    }

    /// Discard any unread input pending in the transport
    pub fn flush_input(&mut self) -> Result<(), DeviceError> {
        let channel = self.channel.as_mut().ok_or(DeviceError::NotConnected)?;
        channel.clear_input_buffer()?;
        Ok(())
    }

    /// Discard any unsent output pending in the transport
    pub fn flush_output(&mut self) -> Result<(), DeviceError> {
        let channel = self.channel.as_mut().ok_or(DeviceError::NotConnected)?;
        channel.clear_output_buffer()?;
        Ok(())
    }

    fn reset_parse_state(&mut self) {
        self.rx_buffer.clear();
        match &mut self.framing {
            Framing::ByteDiff(tracker) => tracker.reset(),
            Framing::Frames(parser) => parser.reset(),
        }
    }

    /// Drain everything the transport currently has without blocking.
    /// Reads are bounded by the reported available count, so an idle
    /// device yields an empty read rather than a stall.
    fn read_available(&mut self) -> Result<Vec<u8>, DeviceError> {
        let channel = self.channel.as_mut().ok_or(DeviceError::NotConnected)?;
        let mut received = Vec::new();
        loop {
            let available = channel
                .bytes_to_read()
                .map_err(|e| DeviceError::Read(e.to_string()))? as usize;
            if available == 0 {
                break;
            }
            let start = received.len();
            received.resize(start + available, 0);
            let n = channel
                .read(&mut received[start..])
                .map_err(|e| DeviceError::Read(e.to_string()))?;
            received.truncate(start + n);
            if n == 0 {
                break;
            }
        }
        Ok(received)
    }
}

/// Read and discard whatever arrived on the channel before it was cleared
fn drain_pending(channel: &mut SerialChannel) -> std::io::Result<()> {
    let pending = channel.bytes_to_read()? as usize;
    if pending > 0 {
        let mut discard = vec![0u8; pending];
        let _ = channel.read(&mut discard)?;
    }
    Ok(())
}
