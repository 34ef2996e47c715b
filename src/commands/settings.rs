//! Commands for loading and saving programmer settings.
//!
//! Settings persist to a JSON file in a caller-supplied directory.

use std::path::PathBuf;

use crate::settings::{Settings, SettingsManager};

/// Get current settings from disk.
///
/// Returns default settings if no settings file exists yet.
pub async fn get_settings(settings_dir: PathBuf) -> Result<Settings, String> {
    tokio::task::spawn_blocking(move || SettingsManager::new(&settings_dir).load())
        .await
        .map_err(|e| format!("Failed to load settings: {}", e))?
}

/// Save settings to disk.
///
/// Rejects settings whose xor mask does not parse, so a bad value never
/// reaches the next operation.
pub async fn save_settings(settings_dir: PathBuf, settings: Settings) -> Result<(), String> {
    crate::image::parse_mask(&settings.xor_mask).map_err(|e| e.to_string())?;

    tokio::task::spawn_blocking(move || {
        let manager = SettingsManager::new(&settings_dir);
        manager.save(&settings)?;
        log::info!(
            "Saved settings: port {:?}, chip 93C{}, {} bytes",
            settings.port,
            settings.chip_type,
            settings.size
        );
        Ok(())
    })
    .await
    .map_err(|e| format!("Failed to save settings: {}", e))?
}
