use std::path::PathBuf;

use anyhow::bail;
use serde::{Deserialize, Serialize};

pub const EMPTY_URL_MESSAGE: &str = "Error: Input is empty.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Tier1080,
    Tier720,
    Tier480,
    Best,
}

impl QualityTier {
    /// Unrecognized or empty labels fall back to `Best`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "1080p" => QualityTier::Tier1080,
            "720p" => QualityTier::Tier720,
            "480p" => QualityTier::Tier480,
            _ => QualityTier::Best,
        }
    }

    pub fn max_height(&self) -> Option<u32> {
        match self {
            QualityTier::Tier1080 => Some(1080),
            QualityTier::Tier720 => Some(720),
            QualityTier::Tier480 => Some(480),
            QualityTier::Best => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    Audio,
    Video(QualityTier),
}

impl DownloadMode {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            DownloadMode::Audio => MediaKind::Audio,
            DownloadMode::Video(_) => MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    url: String,
    mode: DownloadMode,
    destination: Option<PathBuf>,
}

impl JobRequest {
    pub fn new(
        url: impl AsRef<str>,
        mode: DownloadMode,
        destination: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let url = url.as_ref().trim();
        if url.is_empty() {
            bail!(EMPTY_URL_MESSAGE);
        }

        Ok(Self {
            url: url.to_string(),
            mode,
            destination,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mode(&self) -> DownloadMode {
        self.mode
    }

    pub fn destination(&self) -> Option<&PathBuf> {
        self.destination.as_ref()
    }
}

/// Request shape sent by the front-end with `start-download`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartDownload {
    pub url: String,
    pub is_audio: bool,
    pub save_path: Option<String>,
    pub quality: Option<String>,
}

impl TryFrom<StartDownload> for JobRequest {
    type Error = anyhow::Error;

    fn try_from(req: StartDownload) -> anyhow::Result<Self> {
        let mode = if req.is_audio {
            DownloadMode::Audio
        } else {
            DownloadMode::Video(QualityTier::from_label(
                req.quality.as_deref().unwrap_or_default(),
            ))
        };

        let destination = req
            .save_path
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        JobRequest::new(req.url, mode, destination)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ToolMissing,
    ProcessError,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Success(MediaKind),
    Failure {
        reason: FailureReason,
        detail: Option<String>,
    },
}

impl JobOutcome {
    pub fn failure(reason: FailureReason, detail: impl Into<String>) -> Self {
        JobOutcome::Failure {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success(_))
    }
}
