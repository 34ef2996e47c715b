//! Programmer adapter protocol for Saab CIM EEPROMs.
//!
//! The adapter sits on a serial port and drives a 93Cxx serial EEPROM. Every
//! exchange is a command followed by a single-byte acknowledgement:
//!
//! 1. **Handshake** - `[opcode, chip, size_hi, size_lo, org]`, answered by
//!    the opcode byte
//! 2. **Read** - `[b'n', len]` per chunk, answered by `b'k'` and `len` bytes
//! 3. **Write** - `len` data bytes per chunk, answered by `b'k'`
//! 4. **Erase** - handshake only; the ack arrives once the chip is clear
//!
//! # Example
//!
//! ```ignore
//! use cim_eeprom::eeprom::{ChipProfile, SerialOpener, TransferEngine, TransferOptions};
//!
//! let profile = ChipProfile::builder("/dev/ttyUSB0").build()?;
//! let engine = TransferEngine::new(SerialOpener, TransferOptions::default());
//! let result = engine.read(&profile, |event| println!("{:?}", event));
//! ```

pub mod ack;
pub mod config;
mod engine;
mod error;
mod profile;
mod transport;

pub use ack::wait_ack;
pub use engine::{
    CancelToken, OperationState, TransferEngine, TransferEvent, TransferOptions, TransferResult,
    WriteReport,
};
pub use error::{EepromError, EepromResult};
pub use profile::{ChipProfile, ChipProfileBuilder};
pub use transport::{
    available_port_names, ByteChannel, LinkSettings, PortOpener, SerialChannel, SerialOpener,
};
