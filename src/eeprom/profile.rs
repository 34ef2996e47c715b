//! Per-operation chip configuration.

use serde::{Deserialize, Serialize};

use super::config::{DEFAULT_CHIP_TYPE, DEFAULT_ORGANIZATION, DEFAULT_SIZE_BYTES};
use super::error::{EepromError, EepromResult};

/// Immutable description of the chip and link for one operation.
///
/// Chip type and organization are opaque codes; only the adapter decides
/// whether it accepts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipProfile {
    chip_type: u8,
    size_bytes: u16,
    organization: u8,
    port: String,
    xor_mask: Vec<u8>,
    erase_before_write: bool,
}

impl ChipProfile {
    /// Start a profile for `port` with the 93C66 defaults.
    pub fn builder(port: &str) -> ChipProfileBuilder {
        ChipProfileBuilder::new(port)
    }

    pub fn chip_type(&self) -> u8 {
        self.chip_type
    }

    pub fn size_bytes(&self) -> u16 {
        self.size_bytes
    }

    /// Image size as a buffer length.
    pub fn image_len(&self) -> usize {
        self.size_bytes as usize
    }

    pub fn organization(&self) -> u8 {
        self.organization
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn xor_mask(&self) -> &[u8] {
        &self.xor_mask
    }

    pub fn erase_before_write(&self) -> bool {
        self.erase_before_write
    }
}

/// Builder for [`ChipProfile`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ChipProfileBuilder {
    chip_type: u8,
    size_bytes: u16,
    organization: u8,
    port: String,
    xor_mask: Vec<u8>,
    erase_before_write: bool,
}

impl ChipProfileBuilder {
    pub fn new(port: &str) -> Self {
        Self {
            chip_type: DEFAULT_CHIP_TYPE,
            size_bytes: DEFAULT_SIZE_BYTES,
            organization: DEFAULT_ORGANIZATION,
            port: port.to_string(),
            xor_mask: vec![0x00],
            erase_before_write: false,
        }
    }

    pub fn chip_type(mut self, chip_type: u8) -> Self {
        self.chip_type = chip_type;
        self
    }

    pub fn size_bytes(mut self, size_bytes: u16) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn organization(mut self, organization: u8) -> Self {
        self.organization = organization;
        self
    }

    pub fn xor_mask(mut self, mask: &[u8]) -> Self {
        self.xor_mask = mask.to_vec();
        self
    }

    pub fn erase_before_write(mut self, erase: bool) -> Self {
        self.erase_before_write = erase;
        self
    }

    pub fn build(self) -> EepromResult<ChipProfile> {
        if self.size_bytes == 0 {
            return Err(EepromError::InvalidProfile {
                reason: "size must be greater than zero".into(),
            });
        }
        if self.xor_mask.is_empty() {
            return Err(EepromError::InvalidProfile {
                reason: "xor mask must hold at least one byte".into(),
            });
        }
        if self.port.trim().is_empty() {
            return Err(EepromError::InvalidProfile {
                reason: "no port selected".into(),
            });
        }

        Ok(ChipProfile {
            chip_type: self.chip_type,
            size_bytes: self.size_bytes,
            organization: self.organization,
            port: self.port,
            xor_mask: self.xor_mask,
            erase_before_write: self.erase_before_write,
        })
    }
}
