//! Checksums shown alongside an image.
//!
//! Both are for display and comparison only.

use md5::{Digest, Md5};
use serde::Serialize;

use super::record::DecodedRecord;

/// MD5 digest of `data`.
pub fn content_hash(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// MD5 digest of `data` as lowercase hex.
pub fn content_hash_hex(data: &[u8]) -> String {
    hex::encode(content_hash(data))
}

/// IEEE CRC-32 of `data`.
pub fn cyclic_check(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Key facts about an image, in the order they are shown after a read.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    pub md5: String,
    pub crc32: String,
    pub record: Option<DecodedRecord>,
}

impl ImageReport {
    /// Checksum `image` and decode it if it is long enough.
    pub fn from_image(image: &[u8]) -> Self {
        Self {
            md5: content_hash_hex(image),
            crc32: format!("{:08x}", cyclic_check(image)),
            record: DecodedRecord::decode(image).ok(),
        }
    }

    /// Labelled lines for a log view.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        let mut lines = vec![("MD5", self.md5.clone()), ("CRC32", self.crc32.clone())];

        if let Some(record) = &self.record {
            lines.push(("VIN", record.vin_text()));
            lines.push(("MY", (record.model_year() as char).to_string()));
            lines.push(("End model (HW+SW)", record.end_model.to_string()));
            lines.push(("Base model (HW+boot)", record.base_model.to_string()));
            lines.push((
                "Delphi part number",
                record.supplier_part_number.to_string(),
            ));
            lines.push(("SAAB part number", record.saab_part_number.to_string()));
            lines.push((
                "Configuration Version",
                record.configuration_version.to_string(),
            ));
        }

        lines
    }
}
