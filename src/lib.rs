//! Serial EEPROM programmer core for Saab CIM modules.
//!
//! Reads, writes and erases the 93Cxx EEPROM in a CIM through a serial
//! programmer adapter, and decodes the identification fields stored in a
//! dump.
//!
//! - [`eeprom`] drives the adapter: acknowledgement wait, chunked transfers
//!   and the operation state machine
//! - [`image`] handles the XOR transform, field layout, checksums and files
//! - [`settings`] persists the user's configuration
//! - [`commands`] wraps operations for an async front end

pub mod commands;
pub mod eeprom;
pub mod image;
pub mod settings;

#[cfg(test)]
mod test_helpers;
