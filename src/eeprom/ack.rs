//! Single-byte acknowledgement handshake.

use std::time::{Duration, Instant};

use super::error::{EepromError, EepromResult};
use super::transport::ByteChannel;

/// Wait until `expected` arrives on `channel`.
///
/// Zero-length reads are retried; bytes other than `expected` are dropped.
/// The deadline is checked after every read, and a matching byte that was
/// already read wins over an expired deadline. Channel errors are returned
/// as-is, never folded into [`EepromError::NoAck`].
pub fn wait_ack(
    channel: &mut dyn ByteChannel,
    expected: u8,
    timeout: Duration,
) -> EepromResult<()> {
    let start = Instant::now();
    let mut byte = [0u8; 1];

    loop {
        let n = channel.read(&mut byte)?;

        if n == 1 {
            if byte[0] == expected {
                log::trace!("Got ack 0x{:02X} after {:?}", expected, start.elapsed());
                return Ok(());
            }
            log::trace!("Ignoring 0x{:02X} while waiting for 0x{:02X}", byte[0], expected);
        }

        if start.elapsed() > timeout {
            return Err(EepromError::NoAck {
                expected,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
    }
}

/// Fill `buffer` from `channel` before `timeout` runs out.
///
/// Returns the number of bytes placed in `buffer`; anything short of
/// `buffer.len()` means the deadline passed.
pub fn read_within(
    channel: &mut dyn ByteChannel,
    buffer: &mut [u8],
    timeout: Duration,
) -> EepromResult<usize> {
    let start = Instant::now();
    let mut filled = 0;

    while filled < buffer.len() {
        filled += channel.read(&mut buffer[filled..])?;
        if filled < buffer.len() && start.elapsed() > timeout {
            break;
        }
    }

    Ok(filled)
}
