//! XOR obfuscation of CIM images.

use crate::eeprom::{EepromError, EepromResult};

/// Apply `mask` cyclically over `data`.
///
/// The transform is its own inverse, so the same call obfuscates before a
/// write and recovers after a read. An empty mask leaves `data` unchanged.
pub fn transform(data: &[u8], mask: &[u8]) -> Vec<u8> {
    if mask.is_empty() {
        return data.to_vec();
    }

    data.iter()
        .zip(mask.iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

/// True when `mask` cannot change any byte.
pub fn is_identity(mask: &[u8]) -> bool {
    mask.iter().all(|&b| b == 0)
}

/// Parse a mask written as hex text, e.g. `"00"` or `"a5ff"`.
///
/// Whitespace and an optional `0x` prefix are accepted.
pub fn parse_mask(text: &str) -> EepromResult<Vec<u8>> {
    let trimmed = text.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if digits.is_empty() {
        return Err(EepromError::InvalidXorMask {
            reason: "mask is empty".into(),
        });
    }

    hex::decode(&digits).map_err(|e| EepromError::InvalidXorMask {
        reason: format!("'{}': {}", text, e),
    })
}

/// Render a mask the way [`parse_mask`] reads it.
pub fn format_mask(mask: &[u8]) -> String {
    hex::encode(mask)
}
