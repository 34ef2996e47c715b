//! Serial transport layer for the programmer adapter.
//!
//! The engine only sees the [`ByteChannel`] and [`PortOpener`] traits, so a
//! simulated adapter can stand in for real hardware in tests.

use std::io::Read;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use serialport::SerialPort;

use super::config::{ADAPTER_SETTLE_DELAY, PROGRAMMER_BAUD_RATE, SERIAL_POLL_TIMEOUT};
use super::error::{EepromError, EepromResult};

/// Duplex byte stream to the adapter.
pub trait ByteChannel: Send {
    /// Write all of `data`.
    fn write(&mut self, data: &[u8]) -> EepromResult<()>;

    /// Read whatever is available into `buffer`.
    ///
    /// Returns `Ok(0)` when nothing arrived within the poll timeout; that is
    /// not an error.
    fn read(&mut self, buffer: &mut [u8]) -> EepromResult<usize>;

    /// Release the underlying device. Must be idempotent.
    fn close(&mut self);
}

/// Link parameters used when opening a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub poll_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: PROGRAMMER_BAUD_RATE,
            poll_timeout: SERIAL_POLL_TIMEOUT,
            settle_delay: ADAPTER_SETTLE_DELAY,
        }
    }
}

/// Acquires a [`ByteChannel`] for a port identifier.
#[cfg_attr(test, automock)]
pub trait PortOpener: Send + Sync {
    fn open(&self, port: &str, link: &LinkSettings) -> EepromResult<Box<dyn ByteChannel>>;
}

/// Opens real serial ports through the serialport crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(&self, port: &str, link: &LinkSettings) -> EepromResult<Box<dyn ByteChannel>> {
        Ok(Box::new(SerialChannel::open(port, link)?))
    }
}

/// Serial port channel implementation.
pub struct SerialChannel {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialChannel {
    /// Open `port_name` as 8N1 without flow control.
    pub fn open(port_name: &str, link: &LinkSettings) -> EepromResult<Self> {
        let normalized = normalize_port_name(port_name);

        let mut port = serialport::new(&normalized, link.baud_rate)
            .timeout(link.poll_timeout)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(|e| EepromError::PortUnavailable {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;

        log::info!("Opened {} at {} baud", port_name, link.baud_rate);

        // Opening toggles DTR, which reboots the adapter.
        if !link.settle_delay.is_zero() {
            std::thread::sleep(link.settle_delay);
        }

        // Drop any boot banner the adapter printed
        port.clear(serialport::ClearBuffer::Input).ok();

        Ok(Self {
            port: Some(port),
            name: port_name.to_string(),
        })
    }

    fn port(&mut self) -> EepromResult<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(|| {
            EepromError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "port already closed",
            ))
        })
    }
}

impl ByteChannel for SerialChannel {
    fn write(&mut self, data: &[u8]) -> EepromResult<()> {
        use std::io::Write;

        let port = self.port()?;
        port.write_all(data).map_err(EepromError::Io)?;
        port.flush().map_err(EepromError::Io)
    }

    fn read(&mut self, buffer: &mut [u8]) -> EepromResult<usize> {
        match self.port()?.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(EepromError::Io(e)),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            log::debug!("Closed {}", self.name);
        }
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Names of the serial ports currently present on the system.
pub fn available_port_names() -> EepromResult<Vec<String>> {
    let ports = serialport::available_ports()?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Normalize a port name for cross-platform compatibility.
fn normalize_port_name(name: &str) -> String {
    #[cfg(target_os = "macos")]
    {
        // Prefer cu. over tty. so open doesn't block on DCD
        if name.starts_with("/dev/tty.") {
            return name.replace("/dev/tty.", "/dev/cu.");
        }
    }

    #[cfg(target_os = "windows")]
    {
        // COM ports > 9 need \\.\\ prefix
        if let Some(number) = name.strip_prefix("COM") {
            if let Ok(n) = number.parse::<u32>() {
                if n > 9 {
                    return format!("\\\\.\\{}", name);
                }
            }
        }
    }

    name.to_string()
}
