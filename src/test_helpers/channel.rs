use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::eeprom::{ByteChannel, EepromError, EepromResult};

/// Channel that replays a fixed script: silence, then bytes, then
/// optionally an I/O error. Empty reads sleep for one poll interval like a
/// serial read timing out.
pub struct ScriptedChannel {
    poll: Duration,
    silent_until: Option<Instant>,
    pending: VecDeque<u8>,
    fail_when_drained: bool,
    zero_reads: usize,
    latency: Duration,
}

impl ScriptedChannel {
    pub fn new(poll: Duration) -> Self {
        Self {
            poll,
            silent_until: None,
            pending: VecDeque::new(),
            fail_when_drained: false,
            zero_reads: 0,
            latency: Duration::ZERO,
        }
    }

    /// Produce only zero-length reads for `duration`, starting now.
    pub fn silent_for(mut self, duration: Duration) -> Self {
        self.silent_until = Some(Instant::now() + duration);
        self
    }

    /// Block for `latency` inside every read that returns data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn then_bytes(mut self, bytes: &[u8]) -> Self {
        self.pending.extend(bytes.iter().copied());
        self
    }

    pub fn then_fail(mut self) -> Self {
        self.fail_when_drained = true;
        self
    }

    pub fn zero_reads(&self) -> usize {
        self.zero_reads
    }

    fn idle(&mut self) -> EepromResult<usize> {
        std::thread::sleep(self.poll);
        self.zero_reads += 1;
        Ok(0)
    }
}

impl ByteChannel for ScriptedChannel {
    fn write(&mut self, _data: &[u8]) -> EepromResult<()> {
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> EepromResult<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        if let Some(until) = self.silent_until {
            if Instant::now() < until {
                return self.idle();
            }
        }

        match self.pending.pop_front() {
            Some(byte) => {
                if !self.latency.is_zero() {
                    std::thread::sleep(self.latency);
                }
                buffer[0] = byte;
                Ok(1)
            }
            None if self.fail_when_drained => Err(EepromError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            None => self.idle(),
        }
    }

    fn close(&mut self) {}
}
