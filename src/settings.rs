//! Programmer settings with persistence.
//!
//! This module provides:
//! - `Settings`, the caller-editable configuration surface
//! - Persistence to a JSON file in a caller-chosen directory
//! - Conversion into the immutable per-operation `ChipProfile` and
//!   `TransferOptions`
//!
//! Each operation takes a snapshot through [`Settings::chip_profile`], so
//! edits made while a read or write is running never reach it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::eeprom::config::{
    DEFAULT_CHIP_TYPE, DEFAULT_ORGANIZATION, DEFAULT_READ_DELAY_MS, DEFAULT_SIZE_BYTES,
    DEFAULT_WRITE_DELAY_MS,
};
use crate::eeprom::{ChipProfile, EepromResult, TransferOptions};
use crate::image::xor::parse_mask;

/// Programmer configuration as the user edits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Selected serial port, if any.
    pub port: Option<String>,
    pub chip_type: u8,
    pub size: u16,
    pub organization: u8,
    /// XOR mask as hex text, e.g. `"00"`.
    pub xor_mask: String,
    pub erase_before_write: bool,
    /// Delay between read chunks; clamped to 20-400 ms when used.
    pub read_delay_ms: u64,
    /// Delay between write chunks; clamped to 100-400 ms when used.
    pub write_delay_ms: u64,
    /// Keep a failed read's partial bytes instead of discarding them.
    pub ignore_read_errors: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            chip_type: DEFAULT_CHIP_TYPE,
            size: DEFAULT_SIZE_BYTES,
            organization: DEFAULT_ORGANIZATION,
            xor_mask: "00".to_string(),
            erase_before_write: false,
            read_delay_ms: DEFAULT_READ_DELAY_MS,
            write_delay_ms: DEFAULT_WRITE_DELAY_MS,
            ignore_read_errors: false,
        }
    }
}

impl Settings {
    /// Snapshot the chip configuration for one operation.
    pub fn chip_profile(&self) -> EepromResult<ChipProfile> {
        let mask = parse_mask(&self.xor_mask)?;
        ChipProfile::builder(self.port.as_deref().unwrap_or(""))
            .chip_type(self.chip_type)
            .size_bytes(self.size)
            .organization(self.organization)
            .xor_mask(&mask)
            .erase_before_write(self.erase_before_write)
            .build()
    }

    /// Engine options with the pacing delays clamped into range.
    pub fn transfer_options(&self) -> TransferOptions {
        self.paced(TransferOptions::default())
    }

    /// `base` with its pacing replaced by these settings' delays.
    ///
    /// Chunk size, timeouts and link parameters are kept from `base`.
    pub fn paced(&self, base: TransferOptions) -> TransferOptions {
        base.with_read_delay(Duration::from_millis(self.read_delay_ms))
            .with_write_delay(Duration::from_millis(self.write_delay_ms))
    }
}

/// Settings file name stored in the settings directory.
const SETTINGS_FILENAME: &str = "cim_settings.json";

/// Manages persistence of settings to a JSON file.
pub struct SettingsManager {
    settings_file_path: PathBuf,
}

impl SettingsManager {
    pub fn new(settings_dir: &Path) -> Self {
        let settings_file_path = settings_dir.join(SETTINGS_FILENAME);
        Self { settings_file_path }
    }

    /// Load settings from disk, returning defaults if the file doesn't exist.
    pub fn load(&self) -> Result<Settings, String> {
        if !self.settings_file_path.exists() {
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(&self.settings_file_path)
            .map_err(|e| format!("Failed to read settings file: {}", e))?;

        // Handle empty file gracefully
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }

        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse settings JSON: {}", e))
    }

    pub fn save(&self, settings: &Settings) -> Result<(), String> {
        if let Some(parent) = self.settings_file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let contents = serde_json::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(&self.settings_file_path, contents)
            .map_err(|e| format!("Failed to write settings file: {}", e))?;

        log::debug!("Saved settings to {}", self.settings_file_path.display());
        Ok(())
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_file_path
    }
}
