//! CIM image codec: XOR transform, field layout, checksums and files.

pub mod checksum;
pub mod file;
pub mod record;
pub mod xor;

pub use checksum::{content_hash, content_hash_hex, cyclic_check, ImageReport};
pub use file::{load_image, load_image_sized, save_image};
pub use record::{DecodedRecord, PartNumber};
pub use xor::{format_mask, parse_mask, transform};
