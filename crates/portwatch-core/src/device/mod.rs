//! Serial Input Event Capture
//!
//! Polls a serial connection on an external cadence and applies the
//! configured framing rules (prefix, delimiter, fixed length, or
//! byte-change detection) to emit discrete timestamped events.

pub mod byte_diff;
mod clock;
pub mod config;
mod error;
pub mod event;
mod parser;
mod poll;
pub mod serial;
mod transport;

pub use byte_diff::{ByteChange, ByteDiffTracker};
pub use clock::{Clock, MonotonicClock};
pub use config::{DeviceOptions, ParserConfig, ParserOptions};
pub use error::DeviceError;
pub use event::{
    next_event_id, EventSink, SerialByteChangeEvent, SerialEvent, SerialInputEvent,
    SharedEventBuffer,
};
pub use parser::{FrameParser, ParseOutcome};
pub use poll::{PollStatus, SerialEventDevice};
pub use serial::{list_ports, open_port, resolve_port, PortInfo};
pub use transport::{SerialChannel, Transport};

/// Default baud rate when the configuration does not supply one
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Read timeout for the underlying serial port in milliseconds. Reads are
/// bounded by the reported available count, so this only caps pathological
/// driver stalls.
pub const READ_TIMEOUT_MS: u64 = 100;

/// Maximum event payload size; longer frames are truncated
pub const MAX_EVENT_DATA: usize = 256;
