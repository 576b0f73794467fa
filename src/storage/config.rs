use std::path::{Path, PathBuf};

use anyhow::Context;
use ytripper_core::fs_paths::AppPaths;
use ytripper_core::models::settings::AppSettings;

const SETTINGS_FILE: &str = "settings.json";

pub fn settings_path(paths: &dyn AppPaths) -> PathBuf {
    paths.config_dir().join(SETTINGS_FILE)
}

/// Missing or unreadable settings fall back to defaults.
pub fn load_settings(path: &Path) -> AppSettings {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return AppSettings::default(),
    };

    match serde_json::from_str::<AppSettings>(&text) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Ignoring invalid settings at {}: {}", path.display(), e);
            AppSettings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
