use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub schema_version: u32,
    #[serde(default)]
    pub download: DownloadSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadSettings {
    #[serde(default)]
    pub default_output_dir: Option<PathBuf>,
    #[serde(default = "default_quality")]
    pub default_quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Replaces the packaged/development install root when set.
    #[serde(default)]
    pub install_root: Option<PathBuf>,
    #[serde(default = "default_ffmpeg_command")]
    pub ffmpeg_command: String,
    #[serde(default = "default_downloader_command")]
    pub downloader_command: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_quality() -> String {
    "best".into()
}

pub fn default_ffmpeg_command() -> String {
    "ffmpeg".into()
}

pub fn default_downloader_command() -> String {
    "yt-dlp".into()
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            default_output_dir: None,
            default_quality: default_quality(),
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            install_root: None,
            ffmpeg_command: default_ffmpeg_command(),
            downloader_command: default_downloader_command(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            download: DownloadSettings::default(),
            tools: ToolSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}
