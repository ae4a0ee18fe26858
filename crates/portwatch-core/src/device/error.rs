//! Device errors

use thiserror::Error;

/// Errors that can occur while configuring or driving a serial input device
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Serial connect failed: {0}")]
    Connect(String),

    #[error("Serial read failed: {0}")]
    Read(String),

    #[error("Invalid parser configuration: {0}")]
    Config(String),

    #[error("Not connected to device")]
    NotConnected,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
