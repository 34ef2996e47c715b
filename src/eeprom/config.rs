//! Configuration constants for the CIM programmer protocol.

use std::time::Duration;

// ============================================================================
// Serial Communication
// ============================================================================

/// Baud rate of the programmer adapter.
pub const PROGRAMMER_BAUD_RATE: u32 = 115_200;

/// Per-call read deadline. Keeps the ack poll loop blocking in short slices
/// instead of spinning.
pub const SERIAL_POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// The adapter reboots when DTR toggles on open; give it time to come up.
pub const ADAPTER_SETTLE_DELAY: Duration = Duration::from_millis(2000);

// ============================================================================
// Protocol Timeouts
// ============================================================================

/// Default timeout waiting for a single acknowledgement byte.
pub const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout for the erase acknowledgement. The device only answers once the
/// whole chip has been cleared.
pub const ERASE_ACK_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Pacing
// ============================================================================

/// Allowed range for the delay between read chunks, in milliseconds.
pub const READ_DELAY_RANGE_MS: (u64, u64) = (20, 400);

/// Allowed range for the delay between write chunks, in milliseconds.
/// The EEPROM write cycle is the bottleneck here.
pub const WRITE_DELAY_RANGE_MS: (u64, u64) = (100, 400);

pub const DEFAULT_READ_DELAY_MS: u64 = 50;
pub const DEFAULT_WRITE_DELAY_MS: u64 = 150;

/// Default number of bytes moved per acknowledged step.
pub const DEFAULT_CHUNK_SIZE: usize = 1;

/// Largest chunk the adapter buffers in one step.
pub const MAX_CHUNK_SIZE: usize = 64;

// ============================================================================
// Chip Defaults
// ============================================================================

/// 93C66 serial EEPROM.
pub const DEFAULT_CHIP_TYPE: u8 = 66;

/// Full CIM image size in bytes.
pub const DEFAULT_SIZE_BYTES: u16 = 512;

/// 8-bit word organization.
pub const DEFAULT_ORGANIZATION: u8 = 8;

// ============================================================================
// Opcodes
// ============================================================================

/// Single-byte opcodes understood by the programmer adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Dump the chip, chunk by chunk.
    Read = b'r',
    /// Program the chip, chunk by chunk.
    Write = b'w',
    /// Clear the whole chip.
    Erase = b'e',
    /// Request the next read chunk; followed by a length byte.
    Next = b'n',
}

impl Opcode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Read => "read",
            Opcode::Write => "write",
            Opcode::Erase => "erase",
            Opcode::Next => "next",
        }
    }
}

/// Acknowledgement for a single read or write chunk.
pub const CHUNK_ACK: u8 = b'k';

/// Clamp a delay into an inclusive millisecond range.
pub fn clamp_delay(ms: u64, range: (u64, u64)) -> Duration {
    Duration::from_millis(ms.clamp(range.0, range.1))
}
