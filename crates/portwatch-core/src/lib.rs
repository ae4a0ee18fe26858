//! # portwatch Core Library
//!
//! Core functionality for the portwatch serial event capture tooling.

#![warn(missing_docs)]

//!
//! This library provides:
//! - Polled serial input capture with per-event timing metadata
//! - Configurable byte-stream framing (prefix, delimiter, fixed length)
//! - Byte-change detection for level-style signals
//! - Port enumeration and "auto" port resolution
//!
//! ## Example
//!
//! ```rust,ignore
//! use portwatch_core::device::{DeviceOptions, SerialEventDevice, SharedEventBuffer};
//!
//! let options = DeviceOptions::from_json_str(
//!     r#"{"port": "auto", "baud": 9600, "event_parser": {"delimiter": "\\n"}}"#,
//! )?;
//!
//! let buffer = SharedEventBuffer::new();
//! let mut device = SerialEventDevice::open(&options, Box::new(buffer.clone()))?;
//! device.enable_reporting(true)?;
//!
//! loop {
//!     device.poll();
//!     for event in buffer.drain() {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod device;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::device::{
        ByteChange, ByteDiffTracker, Clock, DeviceError, DeviceOptions, EventSink, MonotonicClock,
        ParserConfig, ParserOptions, PollStatus, SerialByteChangeEvent, SerialEvent,
        SerialEventDevice, SerialInputEvent, SharedEventBuffer,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
