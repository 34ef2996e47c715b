//! Fixed-offset fields of a CIM image.
//!
//! Layout of the 512-byte image (integers are big-endian):
//!
//! | Field                  | Offset | Width |
//! |------------------------|--------|-------|
//! | End model P/N          | 0x010  | 4     |
//! | End model revision     | 0x014  | 2     |
//! | Base model P/N         | 0x016  | 4     |
//! | Base model revision    | 0x01A  | 2     |
//! | VIN                    | 0x020  | 17    |
//! | Supplier (Delphi) P/N  | 0x040  | 4     |
//! | SAAB P/N               | 0x044  | 4     |
//! | Configuration version  | 0x048  | 4     |

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::eeprom::{EepromError, EepromResult};

pub const END_MODEL_PN: Range<usize> = 0x010..0x014;
pub const END_MODEL_REV: Range<usize> = 0x014..0x016;
pub const BASE_MODEL_PN: Range<usize> = 0x016..0x01A;
pub const BASE_MODEL_REV: Range<usize> = 0x01A..0x01C;
pub const VIN: Range<usize> = 0x020..0x031;
pub const SUPPLIER_PN: Range<usize> = 0x040..0x044;
pub const SAAB_PN: Range<usize> = 0x044..0x048;
pub const CONFIGURATION_VERSION: Range<usize> = 0x048..0x04C;

/// Index of the model-year character inside the VIN.
pub const MODEL_YEAR_INDEX: usize = 9;

pub const VIN_LEN: usize = 17;

/// Smallest image that holds every field.
pub const MIN_IMAGE_LEN: usize = CONFIGURATION_VERSION.end;

/// Part number plus its two-character revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartNumber {
    pub number: u32,
    pub revision: [u8; 2],
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, String::from_utf8_lossy(&self.revision))
    }
}

/// Decoded view of a CIM image. Fields are copied out positionally; nothing
/// here checks that they make sense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedRecord {
    pub vin: [u8; VIN_LEN],
    pub end_model: PartNumber,
    pub base_model: PartNumber,
    pub supplier_part_number: u32,
    pub saab_part_number: u32,
    pub configuration_version: u32,
}

impl DecodedRecord {
    /// Extract every field from `image`.
    pub fn decode(image: &[u8]) -> EepromResult<Self> {
        ensure_len(image)?;

        Ok(Self {
            vin: array(image, VIN),
            end_model: PartNumber {
                number: read_u32(image, END_MODEL_PN),
                revision: array(image, END_MODEL_REV),
            },
            base_model: PartNumber {
                number: read_u32(image, BASE_MODEL_PN),
                revision: array(image, BASE_MODEL_REV),
            },
            supplier_part_number: read_u32(image, SUPPLIER_PN),
            saab_part_number: read_u32(image, SAAB_PN),
            configuration_version: read_u32(image, CONFIGURATION_VERSION),
        })
    }

    /// Patch these fields into a copy of `image`. Bytes outside the field
    /// table are carried over untouched.
    pub fn encode_into(&self, image: &[u8]) -> EepromResult<Vec<u8>> {
        ensure_len(image)?;

        let mut out = image.to_vec();
        out[VIN].copy_from_slice(&self.vin);
        out[END_MODEL_PN].copy_from_slice(&self.end_model.number.to_be_bytes());
        out[END_MODEL_REV].copy_from_slice(&self.end_model.revision);
        out[BASE_MODEL_PN].copy_from_slice(&self.base_model.number.to_be_bytes());
        out[BASE_MODEL_REV].copy_from_slice(&self.base_model.revision);
        out[SUPPLIER_PN].copy_from_slice(&self.supplier_part_number.to_be_bytes());
        out[SAAB_PN].copy_from_slice(&self.saab_part_number.to_be_bytes());
        out[CONFIGURATION_VERSION].copy_from_slice(&self.configuration_version.to_be_bytes());
        Ok(out)
    }

    /// VIN as text; non-UTF-8 bytes are replaced.
    pub fn vin_text(&self) -> String {
        String::from_utf8_lossy(&self.vin).into_owned()
    }

    /// Model-year character of the VIN.
    pub fn model_year(&self) -> u8 {
        self.vin[MODEL_YEAR_INDEX]
    }

    /// Replace the VIN, padding with spaces or truncating to 17 bytes.
    pub fn set_vin(&mut self, vin: &str) {
        let mut field = [b' '; VIN_LEN];
        for (slot, byte) in field.iter_mut().zip(vin.bytes()) {
            *slot = byte;
        }
        self.vin = field;
    }
}

fn ensure_len(image: &[u8]) -> EepromResult<()> {
    if image.len() < MIN_IMAGE_LEN {
        return Err(EepromError::ImageTooShort {
            required: MIN_IMAGE_LEN,
            actual: image.len(),
        });
    }
    Ok(())
}

fn array<const N: usize>(image: &[u8], range: Range<usize>) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&image[range]);
    out
}

fn read_u32(image: &[u8], range: Range<usize>) -> u32 {
    u32::from_be_bytes(array(image, range))
}
