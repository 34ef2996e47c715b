use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::eeprom::config::{Opcode, CHUNK_ACK};
use crate::eeprom::{ByteChannel, EepromError, EepromResult, LinkSettings, PortOpener};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Idle,
    Reading,
    Writing,
}

#[derive(Debug)]
struct DeviceState {
    memory: Vec<u8>,
    outbox: VecDeque<u8>,
    mode: Mode,
    pos: usize,
    ack_limit: Option<usize>,
    truncate_at: Option<usize>,
    rejected: Vec<u8>,
    opcodes: Vec<u8>,
    data_writes: usize,
    opens: usize,
    closes: usize,
    unavailable: bool,
}

impl DeviceState {
    fn within_limit(&self, len: usize) -> bool {
        self.ack_limit.map_or(true, |limit| self.pos + len <= limit)
    }

    fn receive(&mut self, data: &[u8]) {
        match self.mode {
            Mode::Idle => self.receive_header(data),
            Mode::Reading => self.receive_read_request(data),
            Mode::Writing => self.receive_write_chunk(data),
        }
    }

    fn receive_header(&mut self, data: &[u8]) {
        let [opcode, _chip, size_hi, size_lo, _org] = match <[u8; 5]>::try_from(data) {
            Ok(header) => header,
            Err(_) => return,
        };
        self.opcodes.push(opcode);

        let size = u16::from_be_bytes([size_hi, size_lo]) as usize;
        self.memory.resize(size, 0xFF);
        self.pos = 0;

        if self.rejected.contains(&opcode) {
            return;
        }

        if opcode == Opcode::Read.as_byte() {
            self.mode = Mode::Reading;
        } else if opcode == Opcode::Write.as_byte() {
            self.mode = Mode::Writing;
        } else if opcode == Opcode::Erase.as_byte() {
            self.memory.iter_mut().for_each(|b| *b = 0xFF);
        } else {
            return;
        }
        self.outbox.push_back(opcode);
    }

    fn receive_read_request(&mut self, data: &[u8]) {
        let len = match data {
            [next, len] if *next == Opcode::Next.as_byte() => *len as usize,
            _ => return,
        };
        if !self.within_limit(len) {
            return;
        }

        let end = (self.pos + len).min(self.memory.len());
        let sent_end = self.truncate_at.map_or(end, |cut| end.min(cut));
        self.outbox.push_back(CHUNK_ACK);
        self.outbox
            .extend(self.memory[self.pos..sent_end.max(self.pos)].iter().copied());
        self.pos = end;
    }

    fn receive_write_chunk(&mut self, data: &[u8]) {
        self.data_writes += 1;
        if !self.within_limit(data.len()) {
            return;
        }

        let end = (self.pos + data.len()).min(self.memory.len());
        let count = end - self.pos;
        self.memory[self.pos..end].copy_from_slice(&data[..count]);
        self.pos = end;
        self.outbox.push_back(CHUNK_ACK);
    }
}

/// In-memory programmer adapter that speaks the wire protocol.
///
/// Clones share one device, so a test can keep a handle while the engine
/// owns another.
#[derive(Debug, Clone)]
pub struct SimulatedProgrammer {
    state: Arc<Mutex<DeviceState>>,
    poll: Duration,
}

impl SimulatedProgrammer {
    pub fn with_memory(memory: Vec<u8>) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                memory,
                outbox: VecDeque::new(),
                mode: Mode::Idle,
                pos: 0,
                ack_limit: None,
                truncate_at: None,
                rejected: Vec::new(),
                opcodes: Vec::new(),
                data_writes: 0,
                opens: 0,
                closes: 0,
                unavailable: false,
            })),
            poll: Duration::from_millis(2),
        }
    }

    /// Freshly erased chip of `size` bytes.
    pub fn blank(size: usize) -> Self {
        Self::with_memory(vec![0xFF; size])
    }

    /// Stop acknowledging chunks once `bytes` bytes have been moved.
    pub fn ack_limit(self, bytes: usize) -> Self {
        self.lock().ack_limit = Some(bytes);
        self
    }

    /// Acknowledge read chunks but stop sending data at offset `at`.
    pub fn truncate_chunk_at(self, at: usize) -> Self {
        self.lock().truncate_at = Some(at);
        self
    }

    /// Never answer the handshake for `opcode`.
    pub fn reject(self, opcode: Opcode) -> Self {
        self.lock().rejected.push(opcode.as_byte());
        self
    }

    /// Fail every open with [`EepromError::PortUnavailable`].
    pub fn unavailable(self) -> Self {
        self.lock().unavailable = true;
        self
    }

    pub fn memory(&self) -> Vec<u8> {
        self.lock().memory.clone()
    }

    /// Opcodes of every header received, in order.
    pub fn opcodes(&self) -> Vec<u8> {
        self.lock().opcodes.clone()
    }

    /// Write calls received while in write mode.
    pub fn data_writes(&self) -> usize {
        self.lock().data_writes
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().expect("device state poisoned")
    }
}

impl PortOpener for SimulatedProgrammer {
    fn open(&self, port: &str, _link: &LinkSettings) -> EepromResult<Box<dyn ByteChannel>> {
        let mut state = self.lock();
        if state.unavailable {
            return Err(EepromError::PortUnavailable {
                port: port.to_string(),
                reason: "simulated adapter unplugged".into(),
            });
        }

        state.opens += 1;
        state.mode = Mode::Idle;
        state.outbox.clear();

        Ok(Box::new(SimulatedChannel {
            state: Arc::clone(&self.state),
            poll: self.poll,
            open: true,
        }))
    }
}

struct SimulatedChannel {
    state: Arc<Mutex<DeviceState>>,
    poll: Duration,
    open: bool,
}

impl SimulatedChannel {
    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().expect("device state poisoned")
    }
}

impl ByteChannel for SimulatedChannel {
    fn write(&mut self, data: &[u8]) -> EepromResult<()> {
        self.lock().receive(data);
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> EepromResult<usize> {
        let mut n = 0;
        {
            let mut state = self.lock();
            while n < buffer.len() {
                match state.outbox.pop_front() {
                    Some(byte) => {
                        buffer[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
        }

        if n == 0 {
            std::thread::sleep(self.poll);
        }
        Ok(n)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.lock().closes += 1;
        }
    }
}

impl Drop for SimulatedChannel {
    fn drop(&mut self) {
        self.close();
    }
}
