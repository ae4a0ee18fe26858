//! Event records and sinks
//!
//! Completed frames and byte transitions are published as flat event
//! records carrying the timing metadata computed by the poll loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

/// Maximum buffered events before the oldest are dropped
const MAX_BUFFERED_EVENTS: usize = 10000;

static NEXT_EVENT_ID: AtomicU64 = AtomicU64::new(0);

/// Next monotonically increasing event id, shared process-wide across all
/// devices.
pub fn next_event_id() -> u64 {
    NEXT_EVENT_ID.fetch_add(1, Ordering::Relaxed) + 1
}

/// A completed frame received from the device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialInputEvent {
    /// Event id from the process-wide generator
    pub id: u64,
    /// Port the bytes arrived on
    pub port: String,
    /// Device time when the read completed, in seconds
    pub read_time: f64,
    /// Device time when the poll cycle started, in seconds
    pub logged_time: f64,
    /// Time since the previous poll's reference timestamp; an upper bound
    /// on how long ago the bytes actually arrived
    pub confidence_interval: f64,
    /// Frame content, truncated to [`MAX_EVENT_DATA`](super::MAX_EVENT_DATA)
    pub data: Vec<u8>,
}

/// A change in the most recently received byte
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialByteChangeEvent {
    /// Event id from the process-wide generator
    pub id: u64,
    /// Port the bytes arrived on
    pub port: String,
    /// Device time when the read completed, in seconds
    pub read_time: f64,
    /// Device time when the poll cycle started, in seconds
    pub logged_time: f64,
    /// Time since the previous poll's reference timestamp
    pub confidence_interval: f64,
    /// Byte seen before the change
    pub prev_byte: u8,
    /// Byte that replaced it
    pub current_byte: u8,
}

/// Either kind of device event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SerialEvent {
    /// A completed frame
    Input(SerialInputEvent),
    /// A byte transition
    ByteChange(SerialByteChangeEvent),
}

impl SerialEvent {
    /// Event id assigned at creation
    pub fn id(&self) -> u64 {
        match self {
            SerialEvent::Input(e) => e.id,
            SerialEvent::ByteChange(e) => e.id,
        }
    }

    /// Port the event originated from
    pub fn port(&self) -> &str {
        match self {
            SerialEvent::Input(e) => &e.port,
            SerialEvent::ByteChange(e) => &e.port,
        }
    }
}

/// Receives emitted event records
pub trait EventSink {
    /// Store or forward one event record
    fn emit(&mut self, event: SerialEvent);
}

impl EventSink for Sender<SerialEvent> {
    fn emit(&mut self, event: SerialEvent) {
        // A hung-up receiver means nobody is listening; the event is dropped.
        let _ = self.send(event);
    }
}

/// Cloneable in-memory event buffer for publishing events to a host
/// process. All clones share the same queue; the device emits into one
/// clone while the host drains another.
#[derive(Debug, Clone, Default)]
pub struct SharedEventBuffer {
    events: Arc<Mutex<VecDeque<SerialEvent>>>,
}

impl SharedEventBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return all buffered events, oldest first
    pub fn drain(&self) -> Vec<SerialEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.drain(..).collect()
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for SharedEventBuffer {
    fn emit(&mut self, event: SerialEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        if events.len() >= MAX_BUFFERED_EVENTS {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_ids_strictly_increase() {
        let a = next_event_id();
        let b = next_event_id();
        assert!(b > a);
    }

    #[test]
    fn test_shared_buffer_drains_in_order() {
        let buffer = SharedEventBuffer::new();
        let mut sink = buffer.clone();
        for i in 0..3u8 {
            sink.emit(SerialEvent::ByteChange(SerialByteChangeEvent {
                id: next_event_id(),
                port: "mock0".to_string(),
                read_time: 0.0,
                logged_time: 0.0,
                confidence_interval: 0.0,
                prev_byte: i,
                current_byte: i + 1,
            }));
        }
        let drained = buffer.drain();
        assert_eq!(drained.len(), 3);
        assert!(drained.windows(2).all(|w| w[0].id() < w[1].id()));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sink = tx;
        sink.emit(SerialEvent::Input(SerialInputEvent {
            id: next_event_id(),
            port: "mock0".to_string(),
            read_time: 1.0,
            logged_time: 1.0,
            confidence_interval: 0.1,
            data: b"frame".to_vec(),
        }));
        let event = rx.try_recv().expect("event forwarded");
        assert_eq!(event.port(), "mock0");
    }
}
