use std::path::Path;

use crate::core::dependencies::ResolvedTool;
use crate::models::job::{DownloadMode, JobRequest, QualityTier};

pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const MERGE_FORMAT: &str = "mp4";
pub const AUDIO_FORMAT: &str = "mp3";

/// Best mp4 video under the tier's height plus best m4a audio, else the best
/// single file at that height.
pub fn format_selector(tier: QualityTier) -> String {
    match tier.max_height() {
        Some(h) => format!("bv*[height<={h}][ext=mp4]+ba[ext=m4a]/b[height<={h}]"),
        None => "bv*[ext=mp4]+ba[ext=m4a]/b[ext=mp4]".to_string(),
    }
}

/// Downloader argument vector for one job. The leading flags keep their order
/// and the URL is always the final argument.
pub fn build_args(request: &JobRequest, ffmpeg: &ResolvedTool, output_dir: &Path) -> Vec<String> {
    let mut args = vec![
        "--newline".to_string(),
        "--no-part".to_string(),
        "--no-mtime".to_string(),
        "--restrict-filenames".to_string(),
        "--ffmpeg-location".to_string(),
        ffmpeg.path_or_command.clone(),
        "--merge-output-format".to_string(),
        MERGE_FORMAT.to_string(),
        "-P".to_string(),
        output_dir.to_string_lossy().into_owned(),
        "-o".to_string(),
        OUTPUT_TEMPLATE.to_string(),
    ];

    match request.mode() {
        DownloadMode::Audio => {
            args.extend([
                "-x".to_string(),
                "--audio-format".to_string(),
                AUDIO_FORMAT.to_string(),
            ]);
        }
        DownloadMode::Video(tier) => {
            args.push("-f".to_string());
            args.push(format_selector(tier));
        }
    }

    args.push(request.url().to_string());
    args
}
