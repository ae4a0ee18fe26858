//! Device and parser configuration
//!
//! Host-supplied options are deserialized into [`DeviceOptions`] and
//! validated once, at construction, into a [`ParserConfig`].

use serde::{Deserialize, Serialize};

use super::{DeviceError, DEFAULT_BAUD_RATE};

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Framing options as supplied by the host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Report every change of the most recently received byte instead of
    /// assembling frames. When set, all other fields are ignored.
    #[serde(default)]
    pub byte_diff: bool,

    /// Complete a frame after exactly this many bytes
    #[serde(default)]
    pub fixed_length: Option<usize>,

    /// Byte sequence that must precede frame content; bytes before it are
    /// discarded
    #[serde(default)]
    pub prefix: Option<String>,

    /// Byte sequence that terminates a frame
    #[serde(default)]
    pub delimiter: Option<String>,
}

/// User-supplied device options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOptions {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3"), or "auto" to use
    /// the first available port
    pub port: String,

    /// Baud rate
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Framing configuration
    #[serde(default)]
    pub event_parser: ParserOptions,
}

impl DeviceOptions {
    /// Load options from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, DeviceError> {
        serde_json::from_str(json).map_err(|e| DeviceError::Config(e.to_string()))
    }
}

/// Validated framing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserConfig {
    /// Report byte transitions rather than assembling frames
    ByteDiff,

    /// Assemble frames from prefix / delimiter / fixed-length rules
    Framed {
        /// Bytes that open a frame; everything up to and including them is
        /// dropped
        prefix: Option<Vec<u8>>,
        /// Bytes that close a frame
        delimiter: Option<Vec<u8>>,
        /// Exact frame length in bytes
        fixed_length: Option<usize>,
    },
}

impl ParserConfig {
    /// Validate user options into a parser configuration.
    ///
    /// `fixed_length` and `delimiter` may both be set; the delimiter is
    /// checked first on every poll. Empty prefix/delimiter strings are
    /// treated as unset.
    pub fn from_options(options: &ParserOptions) -> Result<Self, DeviceError> {
        if options.byte_diff {
            return Ok(ParserConfig::ByteDiff);
        }

        let prefix = options
            .prefix
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(normalize_separator);
        let delimiter = options
            .delimiter
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(normalize_separator);

        if options.fixed_length == Some(0) {
            return Err(DeviceError::Config(
                "fixed_length must be greater than zero".to_string(),
            ));
        }
        if options.fixed_length.is_none() && delimiter.is_none() {
            return Err(DeviceError::Config(
                "event parser needs a delimiter or a fixed_length to complete frames".to_string(),
            ));
        }

        Ok(ParserConfig::Framed {
            prefix,
            delimiter,
            fixed_length: options.fixed_length,
        })
    }
}

/// Convert symbolic escape text to its literal byte form.
///
/// Only the whole-string forms `\n`, `\t`, `\r` and `\r\n` are recognized;
/// any other string is used verbatim as raw bytes.
fn normalize_separator(text: &str) -> Vec<u8> {
    match text {
        r"\n" => b"\n".to_vec(),
        r"\t" => b"\t".to_vec(),
        r"\r" => b"\r".to_vec(),
        r"\r\n" => b"\r\n".to_vec(),
        other => other.as_bytes().to_vec(),
    }
}
