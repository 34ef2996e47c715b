//! Headerless `.bin` image files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::eeprom::{EepromError, EepromResult};

/// File extension used for saved images.
pub const IMAGE_EXTENSION: &str = "bin";

/// Read an image file verbatim.
pub fn load_image<P: AsRef<Path>>(path: P) -> EepromResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Read an image file and check it matches the chip size.
pub fn load_image_sized<P: AsRef<Path>>(path: P, expected: usize) -> EepromResult<Vec<u8>> {
    let data = load_image(path)?;
    if data.len() != expected {
        return Err(EepromError::ImageSizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(data)
}

/// Write `data` with no header, adding `.bin` if the name lacks it.
///
/// Returns the path actually written.
pub fn save_image<P: AsRef<Path>>(path: P, data: &[u8]) -> EepromResult<PathBuf> {
    let path = with_bin_suffix(path.as_ref());

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(&path, data)?;
    log::info!("Saved {} bytes to {}", data.len(), path.display());
    Ok(path)
}

fn with_bin_suffix(path: &Path) -> PathBuf {
    let has_suffix = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(IMAGE_EXTENSION))
        .unwrap_or(false);

    if has_suffix {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(IMAGE_EXTENSION);
        PathBuf::from(name)
    }
}
