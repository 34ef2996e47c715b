//! Error types for the CIM programmer protocol and image handling.

use thiserror::Error;

/// Result type alias for programmer operations.
pub type EepromResult<T> = Result<T, EepromError>;

/// Errors that can occur while talking to the programmer or handling images.
#[derive(Debug, Error)]
pub enum EepromError {
    /// Serial port error from the serialport crate.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while handling settings.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The serial port could not be opened.
    #[error("Port '{port}' is unavailable: {reason}")]
    PortUnavailable { port: String, reason: String },

    /// Expected acknowledgement byte never arrived.
    #[error("Got no ack 0x{expected:02X} within {timeout_ms}ms")]
    NoAck { expected: u8, timeout_ms: u64 },

    /// A read chunk was acknowledged but its data stopped short.
    #[error("Short chunk: expected {expected} bytes, got {received}")]
    ShortChunk { expected: usize, received: usize },

    /// A write aborted after part of the image had landed on the chip.
    #[error("Write incomplete after {written} of {total} bytes: {source}")]
    WriteIncomplete {
        written: usize,
        total: usize,
        #[source]
        source: Box<EepromError>,
    },

    /// Image length does not match the chip profile.
    #[error("Image is {actual} bytes, chip expects {expected}")]
    ImageSizeMismatch { expected: usize, actual: usize },

    /// Image is too short to hold every decoded field.
    #[error("Image is {actual} bytes, at least {required} needed to decode")]
    ImageTooShort { required: usize, actual: usize },

    /// Chip profile failed local validation.
    #[error("Invalid chip profile: {reason}")]
    InvalidProfile { reason: String },

    /// XOR mask text could not be parsed.
    #[error("Invalid xor mask: {reason}")]
    InvalidXorMask { reason: String },

    /// Operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,
}

impl EepromError {
    /// True when the chip may hold a half-written image.
    pub fn leaves_device_dirty(&self) -> bool {
        matches!(self, EepromError::WriteIncomplete { .. })
    }

    /// True for transport faults that are propagated verbatim.
    pub fn is_channel_error(&self) -> bool {
        matches!(self, EepromError::Serial(_) | EepromError::Io(_))
    }

    /// Get a user-friendly error code for support purposes.
    pub fn error_code(&self) -> &'static str {
        match self {
            EepromError::Serial(_) => "CIM-001",
            EepromError::Io(_) => "CIM-002",
            EepromError::Json(_) => "CIM-003",
            EepromError::PortUnavailable { .. } => "CIM-010",
            EepromError::NoAck { .. } => "CIM-020",
            EepromError::ShortChunk { .. } => "CIM-021",
            EepromError::WriteIncomplete { .. } => "CIM-030",
            EepromError::ImageSizeMismatch { .. } => "CIM-040",
            EepromError::ImageTooShort { .. } => "CIM-041",
            EepromError::InvalidProfile { .. } => "CIM-050",
            EepromError::InvalidXorMask { .. } => "CIM-051",
            EepromError::Cancelled => "CIM-099",
        }
    }
}
