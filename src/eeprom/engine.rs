//! Chunked read, write and erase over the programmer adapter.
//!
//! Every operation walks the same states:
//!
//! ```text
//! Idle -> PortOpening -> Handshaking -> Transferring -> Completed | Failed -> PortClosed
//! ```
//!
//! The port is opened per operation and is always closed again before the
//! call returns. Nothing is retried: a failed step fails the operation and
//! the caller decides what to do with any partial data.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::ack::{read_within, wait_ack};
use super::config::{
    clamp_delay, Opcode, ACK_TIMEOUT, CHUNK_ACK, DEFAULT_CHUNK_SIZE, DEFAULT_READ_DELAY_MS,
    DEFAULT_WRITE_DELAY_MS, ERASE_ACK_TIMEOUT, MAX_CHUNK_SIZE, READ_DELAY_RANGE_MS,
    WRITE_DELAY_RANGE_MS,
};
use super::error::{EepromError, EepromResult};
use super::profile::ChipProfile;
use super::transport::{ByteChannel, LinkSettings, PortOpener};
use crate::image::{xor, DecodedRecord};

/// Lifecycle of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationState {
    Idle,
    PortOpening,
    Handshaking,
    Transferring,
    Completed,
    Failed,
    PortClosed,
}

impl OperationState {
    fn rank(self) -> u8 {
        match self {
            OperationState::Idle => 0,
            OperationState::PortOpening => 1,
            OperationState::Handshaking => 2,
            OperationState::Transferring => 3,
            OperationState::Completed | OperationState::Failed => 4,
            OperationState::PortClosed => 5,
        }
    }
}

/// Events reported to the caller while an operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum TransferEvent {
    /// The operation entered a new state.
    State(OperationState),
    /// Bytes moved so far.
    Progress { done: usize, total: usize },
    /// Free-text status line.
    Status { message: String },
}

/// Shared cancellation flag, checked between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can guard the next operation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Tunables for the transfer engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Bytes per acknowledged step.
    pub chunk_size: usize,
    /// Pause between read chunks. Set through [`Self::with_read_delay`].
    pub(crate) read_delay: Duration,
    /// Pause between write chunks. Too short and the chip silently drops
    /// data; the adapter cannot tell. Set through [`Self::with_write_delay`].
    pub(crate) write_delay: Duration,
    pub ack_timeout: Duration,
    pub erase_timeout: Duration,
    pub link: LinkSettings,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_delay: Duration::from_millis(DEFAULT_READ_DELAY_MS),
            write_delay: Duration::from_millis(DEFAULT_WRITE_DELAY_MS),
            ack_timeout: ACK_TIMEOUT,
            erase_timeout: ERASE_ACK_TIMEOUT,
            link: LinkSettings::default(),
        }
    }
}

impl TransferOptions {
    /// Set the read pacing, clamped into 20-400 ms.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = clamp_delay(delay.as_millis() as u64, READ_DELAY_RANGE_MS);
        self
    }

    /// Set the write pacing, clamped into 100-400 ms.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = clamp_delay(delay.as_millis() as u64, WRITE_DELAY_RANGE_MS);
        self
    }

    pub fn read_delay(&self) -> Duration {
        self.read_delay
    }

    pub fn write_delay(&self) -> Duration {
        self.write_delay
    }

    fn validate(&self) -> EepromResult<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(EepromError::InvalidProfile {
                reason: format!(
                    "chunk size {} outside 1..={}",
                    self.chunk_size, MAX_CHUNK_SIZE
                ),
            });
        }
        Ok(())
    }
}

/// Outcome of a read.
///
/// `raw` holds exactly the bytes the adapter sent, even when the read
/// failed part way. `image` is `raw` with the profile's XOR mask removed.
#[derive(Debug)]
pub struct TransferResult {
    pub raw: Vec<u8>,
    pub image: Vec<u8>,
    /// Only set when the read completed and the image is long enough.
    pub decoded: Option<DecodedRecord>,
    pub error: Option<EepromError>,
    pub expected_len: usize,
    pub finished_at: DateTime<Local>,
}

impl TransferResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True when fewer bytes than the chip size were collected.
    pub fn is_short(&self) -> bool {
        self.raw.len() < self.expected_len
    }

    /// Title for a viewer window, e.g. `successful read from <time>`.
    pub fn title(&self) -> String {
        let outcome = if self.is_ok() { "successful" } else { "failed" };
        format!("{} read from {}", outcome, self.finished_at.to_rfc2822())
    }
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub bytes_written: usize,
    pub elapsed: Duration,
    /// Duration of the erase pass, when one ran first.
    pub erase_elapsed: Option<Duration>,
}

/// Drives read, write and erase operations against the adapter.
pub struct TransferEngine<O: PortOpener> {
    opener: O,
    options: TransferOptions,
    cancel: CancelToken,
}

impl<O: PortOpener> TransferEngine<O> {
    pub fn new(opener: O, options: TransferOptions) -> Self {
        Self {
            opener,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Observe `cancel` instead of the engine's own token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    /// Dump the chip.
    ///
    /// Never returns early without data: on failure the bytes collected so
    /// far are in [`TransferResult::raw`].
    pub fn read<F>(&self, profile: &ChipProfile, on_event: F) -> TransferResult
    where
        F: Fn(TransferEvent),
    {
        let total = profile.image_len();
        let mut raw = Vec::with_capacity(total);

        log::info!("Reading {} bytes from {}", total, profile.port());

        let outcome = self.options.validate().and_then(|_| {
            self.run(profile, &on_event, |channel, session| {
                session.enter(OperationState::Handshaking);
                self.handshake(channel, Opcode::Read, profile, self.options.ack_timeout)?;

                session.enter(OperationState::Transferring);
                self.read_chunks(channel, total, &mut raw, &on_event)
            })
        });

        let image = xor::transform(&raw, profile.xor_mask());
        let error = outcome.err();
        match &error {
            Some(e) => log::warn!("Read failed after {} of {} bytes: {}", raw.len(), total, e),
            None => log::info!("Read {} bytes", raw.len()),
        }

        let decoded = if error.is_none() {
            DecodedRecord::decode(&image).ok()
        } else {
            None
        };

        TransferResult {
            raw,
            image,
            decoded,
            error,
            expected_len: total,
            finished_at: Local::now(),
        }
    }

    /// Program `image` onto the chip.
    ///
    /// `image` is the plain form; the profile's XOR mask is applied before
    /// sending. Runs an erase first when the profile asks for it. Once any
    /// chunk has been accepted, failures come back as
    /// [`EepromError::WriteIncomplete`].
    pub fn write<F>(
        &self,
        profile: &ChipProfile,
        image: &[u8],
        on_event: F,
    ) -> EepromResult<WriteReport>
    where
        F: Fn(TransferEvent),
    {
        self.options.validate()?;
        if image.len() != profile.image_len() {
            return Err(EepromError::ImageSizeMismatch {
                expected: profile.image_len(),
                actual: image.len(),
            });
        }

        let data = xor::transform(image, profile.xor_mask());
        let start = Instant::now();
        log::info!("Writing {} bytes to {}", data.len(), profile.port());

        let result = self.run(profile, &on_event, |channel, session| {
            session.enter(OperationState::Handshaking);

            let erase_elapsed = if profile.erase_before_write() {
                Some(self.erase_on(channel, profile, &on_event)?)
            } else {
                None
            };

            self.handshake(channel, Opcode::Write, profile, self.options.ack_timeout)?;

            session.enter(OperationState::Transferring);
            let bytes_written = self.write_chunks(channel, &data, &on_event)?;

            Ok(WriteReport {
                bytes_written,
                elapsed: start.elapsed(),
                erase_elapsed,
            })
        });

        match &result {
            Ok(report) => log::info!(
                "Wrote {} bytes in {:?}",
                report.bytes_written,
                report.elapsed
            ),
            Err(e) => log::warn!("Write failed: {}", e),
        }
        result
    }

    /// Clear the whole chip and return how long the adapter took.
    pub fn erase<F>(&self, profile: &ChipProfile, on_event: F) -> EepromResult<Duration>
    where
        F: Fn(TransferEvent),
    {
        log::info!("Erasing chip on {}", profile.port());

        self.run(profile, &on_event, |channel, session| {
            session.enter(OperationState::Handshaking);
            let elapsed = self.erase_on(channel, profile, &on_event)?;
            session.enter(OperationState::Transferring);
            Ok(elapsed)
        })
    }

    /// Open the port, run `body`, and close the port on every path.
    fn run<T, F, B>(&self, profile: &ChipProfile, on_event: &F, body: B) -> EepromResult<T>
    where
        F: Fn(TransferEvent),
        B: FnOnce(&mut dyn ByteChannel, &mut Session<'_, F>) -> EepromResult<T>,
    {
        let mut session = Session::start(on_event);

        session.enter(OperationState::PortOpening);
        let channel = match self.opener.open(profile.port(), &self.options.link) {
            Ok(channel) => channel,
            Err(e) => {
                session.enter(OperationState::Failed);
                session.enter(OperationState::PortClosed);
                return Err(e);
            }
        };

        let mut guard = ChannelGuard(channel);
        let result = body(guard.channel(), &mut session);

        session.enter(if result.is_ok() {
            OperationState::Completed
        } else {
            OperationState::Failed
        });

        drop(guard);
        session.enter(OperationState::PortClosed);
        result
    }

    /// Send the operation header and wait for the adapter to echo the opcode.
    fn handshake(
        &self,
        channel: &mut dyn ByteChannel,
        opcode: Opcode,
        profile: &ChipProfile,
        timeout: Duration,
    ) -> EepromResult<()> {
        log::debug!(
            "Handshake {} chip={} size={} org={}",
            opcode.name(),
            profile.chip_type(),
            profile.size_bytes(),
            profile.organization()
        );
        channel.write(&header(opcode, profile))?;
        wait_ack(channel, opcode.as_byte(), timeout)
    }

    fn erase_on<F>(
        &self,
        channel: &mut dyn ByteChannel,
        profile: &ChipProfile,
        on_event: &F,
    ) -> EepromResult<Duration>
    where
        F: Fn(TransferEvent),
    {
        let start = Instant::now();
        on_event(TransferEvent::Status {
            message: "Erasing ...".into(),
        });

        self.handshake(channel, Opcode::Erase, profile, self.options.erase_timeout)?;

        let elapsed = start.elapsed();
        on_event(TransferEvent::Status {
            message: format!("Erase took {:?}", elapsed),
        });
        Ok(elapsed)
    }

    fn read_chunks<F>(
        &self,
        channel: &mut dyn ByteChannel,
        total: usize,
        raw: &mut Vec<u8>,
        on_event: &F,
    ) -> EepromResult<()>
    where
        F: Fn(TransferEvent),
    {
        while raw.len() < total {
            self.check_cancelled()?;
            if !raw.is_empty() {
                pace(self.options.read_delay);
            }

            let len = self.options.chunk_size.min(total - raw.len());
            channel.write(&[Opcode::Next.as_byte(), len as u8])?;
            wait_ack(channel, CHUNK_ACK, self.options.ack_timeout)?;

            let mut chunk = vec![0u8; len];
            let received = read_within(channel, &mut chunk, self.options.ack_timeout)?;
            raw.extend_from_slice(&chunk[..received]);
            if received < len {
                return Err(EepromError::ShortChunk {
                    expected: len,
                    received,
                });
            }

            log::trace!("Read chunk, {}/{} bytes", raw.len(), total);
            on_event(TransferEvent::Progress {
                done: raw.len(),
                total,
            });
        }
        Ok(())
    }

    fn write_chunks<F>(
        &self,
        channel: &mut dyn ByteChannel,
        data: &[u8],
        on_event: &F,
    ) -> EepromResult<usize>
    where
        F: Fn(TransferEvent),
    {
        let total = data.len();
        let mut written = 0;

        for chunk in data.chunks(self.options.chunk_size) {
            if let Err(e) = self.send_chunk(channel, chunk, written) {
                return Err(incomplete(written, total, e));
            }

            written += chunk.len();
            log::trace!("Wrote chunk, {}/{} bytes", written, total);
            on_event(TransferEvent::Progress {
                done: written,
                total,
            });
        }
        Ok(written)
    }

    fn send_chunk(
        &self,
        channel: &mut dyn ByteChannel,
        chunk: &[u8],
        written: usize,
    ) -> EepromResult<()> {
        self.check_cancelled()?;
        if written > 0 {
            pace(self.options.write_delay);
        }
        channel.write(chunk)?;
        wait_ack(channel, CHUNK_ACK, self.options.ack_timeout)
    }

    fn check_cancelled(&self) -> EepromResult<()> {
        if self.cancel.is_cancelled() {
            return Err(EepromError::Cancelled);
        }
        Ok(())
    }
}

/// Tracks the operation state and reports each transition.
struct Session<'a, F: Fn(TransferEvent)> {
    state: OperationState,
    on_event: &'a F,
}

impl<'a, F: Fn(TransferEvent)> Session<'a, F> {
    fn start(on_event: &'a F) -> Self {
        on_event(TransferEvent::State(OperationState::Idle));
        Self {
            state: OperationState::Idle,
            on_event,
        }
    }

    fn enter(&mut self, next: OperationState) {
        debug_assert!(
            next.rank() > self.state.rank(),
            "{:?} -> {:?} goes backwards",
            self.state,
            next
        );
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        (self.on_event)(TransferEvent::State(next));
    }
}

/// Closes the channel when dropped.
struct ChannelGuard(Box<dyn ByteChannel>);

impl ChannelGuard {
    fn channel(&mut self) -> &mut dyn ByteChannel {
        &mut *self.0
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// `[opcode, chip, size_hi, size_lo, org]`
fn header(opcode: Opcode, profile: &ChipProfile) -> [u8; 5] {
    let [size_hi, size_lo] = profile.size_bytes().to_be_bytes();
    [
        opcode.as_byte(),
        profile.chip_type(),
        size_hi,
        size_lo,
        profile.organization(),
    ]
}

fn pace(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

fn incomplete(written: usize, total: usize, source: EepromError) -> EepromError {
    if written == 0 {
        source
    } else {
        EepromError::WriteIncomplete {
            written,
            total,
            source: Box::new(source),
        }
    }
}
