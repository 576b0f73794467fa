use serde::Serialize;
use ytripper_core::core::dependencies::{self, ToolKind, ToolLocator};

use crate::storage::config;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct DependencyStatus {
    pub name: String,
    pub available: bool,
    pub path: String,
    pub version: Option<String>,
}

pub async fn check_dependencies(state: &AppState) -> Vec<DependencyStatus> {
    let settings = config::load_settings(&state.config_path);
    let locator = ToolLocator::from_settings(&settings.tools, state.paths.as_ref());
    tool_statuses(&locator).await
}

pub async fn tool_statuses(locator: &ToolLocator) -> Vec<DependencyStatus> {
    let (ytdlp, ffmpeg) = tokio::join!(
        locator.resolve(ToolKind::Downloader),
        locator.resolve(ToolKind::Ffmpeg),
    );
    let (ytdlp_version, ffmpeg_version) = tokio::join!(
        dependencies::check_version(&ytdlp),
        dependencies::check_version(&ffmpeg),
    );

    vec![
        DependencyStatus {
            name: ToolKind::Downloader.display_name().into(),
            available: ytdlp.available,
            path: ytdlp.path_or_command,
            version: ytdlp_version,
        },
        DependencyStatus {
            name: ToolKind::Ffmpeg.display_name().into(),
            available: ffmpeg.available,
            path: ffmpeg.path_or_command,
            version: ffmpeg_version,
        },
    ]
}
