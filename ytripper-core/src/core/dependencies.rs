use std::path::{Path, PathBuf};
use std::process::Stdio;

use crate::core::process;
use crate::fs_paths::AppPaths;
use crate::models::settings::{default_downloader_command, default_ffmpeg_command, ToolSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Ffmpeg,
    Downloader,
}

impl ToolKind {
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolKind::Ffmpeg => "ffmpeg",
            ToolKind::Downloader => "yt-dlp",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ToolKind::Ffmpeg => "FFmpeg",
            ToolKind::Downloader => "yt-dlp",
        }
    }

    fn version_flag(&self) -> &'static str {
        match self {
            ToolKind::Ffmpeg => "-version",
            ToolKind::Downloader => "--version",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub kind: ToolKind,
    pub path_or_command: String,
    pub available: bool,
    /// Bundled location checked first, kept for diagnostics.
    pub bundled_path: PathBuf,
}

impl ResolvedTool {
    pub fn missing_message(&self) -> String {
        format!(
            "Critical Error: {} is missing! Looked for {} and `{}` on the system PATH.",
            self.kind.display_name(),
            self.bundled_path.display(),
            self.path_or_command
        )
    }
}

/// Finds ffmpeg and the downloader. Holds no results: every `resolve` call
/// inspects the filesystem again.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    install_root: PathBuf,
    ffmpeg_command: String,
    downloader_command: String,
}

impl ToolLocator {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            ffmpeg_command: default_ffmpeg_command(),
            downloader_command: default_downloader_command(),
        }
    }

    pub fn from_settings(settings: &ToolSettings, paths: &dyn AppPaths) -> Self {
        let root = settings
            .install_root
            .clone()
            .unwrap_or_else(|| paths.install_root());
        Self::new(root)
            .with_command(ToolKind::Ffmpeg, &settings.ffmpeg_command)
            .with_command(ToolKind::Downloader, &settings.downloader_command)
    }

    pub fn with_command(mut self, kind: ToolKind, command: impl Into<String>) -> Self {
        let command = command.into();
        match kind {
            ToolKind::Ffmpeg => self.ffmpeg_command = command,
            ToolKind::Downloader => self.downloader_command = command,
        }
        self
    }

    pub fn bundled_path(&self, kind: ToolKind) -> PathBuf {
        self.install_root
            .join("bin")
            .join(process::bin_name(kind.tool_name()))
    }

    fn command_for(&self, kind: ToolKind) -> &str {
        match kind {
            ToolKind::Ffmpeg => &self.ffmpeg_command,
            ToolKind::Downloader => &self.downloader_command,
        }
    }

    pub async fn resolve(&self, kind: ToolKind) -> ResolvedTool {
        let _timer_start = std::time::Instant::now();
        let bundled_path = self.bundled_path(kind);

        if bundled_path.exists() {
            tracing::debug!(
                "[perf] resolve({}) bundled at {} took {:?}",
                kind.tool_name(),
                bundled_path.display(),
                _timer_start.elapsed()
            );
            return ResolvedTool {
                kind,
                path_or_command: bundled_path.to_string_lossy().into_owned(),
                available: true,
                bundled_path,
            };
        }

        let command = self.command_for(kind).to_string();
        let available = if Path::new(&command).exists() {
            true
        } else {
            process::lookup_command(&command).await.is_some()
        };

        tracing::debug!(
            "[perf] resolve({}) via `{}` available={} took {:?}",
            kind.tool_name(),
            command,
            available,
            _timer_start.elapsed()
        );

        ResolvedTool {
            kind,
            path_or_command: command,
            available,
            bundled_path,
        }
    }
}

pub async fn check_version(tool: &ResolvedTool) -> Option<String> {
    if !tool.available {
        return None;
    }

    let output = process::command(&tool.path_or_command)
        .arg(tool.kind.version_flag())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_version(tool.kind, stdout.lines().next().unwrap_or(""))
}

fn parse_version(kind: ToolKind, first_line: &str) -> Option<String> {
    match kind {
        // "ffmpeg version 7.0.1-static https://..."
        ToolKind::Ffmpeg => first_line.split_whitespace().nth(2).map(|s| s.to_string()),
        ToolKind::Downloader => Some(first_line.trim().to_string()).filter(|s| !s.is_empty()),
    }
}
