use tokio::io::{AsyncBufReadExt, BufReader};
use ytripper_core::core::dependencies::ToolLocator;
use ytripper_core::core::dialog::FolderPicker;
use ytripper_core::core::events::EventEmitter;
use ytripper_core::core::supervisor::JobSupervisor;
use ytripper_core::models::job::{FailureReason, JobOutcome, JobRequest, StartDownload};
use ytripper_core::models::settings::AppSettings;

use crate::cli::DownloadArgs;
use crate::core::events::StdoutEventEmitter;
use crate::storage::config;
use crate::AppState;

pub fn build_supervisor(state: &AppState, settings: &AppSettings) -> JobSupervisor {
    let locator = ToolLocator::from_settings(&settings.tools, state.paths.as_ref());
    JobSupervisor::new(locator, state.paths.clone())
        .with_default_output_dir(settings.download.default_output_dir.clone())
}

fn start_download_from_args(
    args: DownloadArgs,
    save_path: Option<std::path::PathBuf>,
    settings: &AppSettings,
) -> StartDownload {
    StartDownload {
        url: args.url,
        is_audio: args.audio,
        save_path: save_path.map(|p| p.to_string_lossy().into_owned()),
        quality: Some(
            args.quality
                .unwrap_or_else(|| settings.download.default_quality.clone()),
        ),
    }
}

pub async fn download(
    state: &AppState,
    args: DownloadArgs,
    picker: &dyn FolderPicker,
) -> anyhow::Result<JobOutcome> {
    let settings = config::load_settings(&state.config_path);

    let save_path = if args.pick_folder {
        picker.pick_folder().await
    } else {
        args.output.clone()
    };

    let request = JobRequest::try_from(start_download_from_args(args, save_path, &settings))?;

    let handle = build_supervisor(state, &settings).start(request, StdoutEventEmitter);
    let token = handle.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling download");
            token.cancel();
        }
    });

    let outcome = handle.wait().await;
    ctrl_c.abort();
    Ok(outcome)
}

fn parse_request(line: &str) -> anyhow::Result<JobRequest> {
    let wire: StartDownload = serde_json::from_str(line)?;
    JobRequest::try_from(wire)
}

/// Runs the job a request line describes. A rejected line still gets its
/// `download-complete` event.
async fn handle_line<E: EventEmitter>(state: &AppState, line: &str, emitter: E) -> JobOutcome {
    let request = match parse_request(line) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected request: {:#}", e);
            let outcome = JobOutcome::failure(FailureReason::Unknown, e.to_string());
            emitter.emit_complete(&outcome);
            return outcome;
        }
    };

    let settings = config::load_settings(&state.config_path);
    build_supervisor(state, &settings)
        .start(request, emitter)
        .wait()
        .await
}

/// One request per stdin line. Jobs run strictly one after another.
pub async fn serve(state: &AppState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        handle_line(state, line, StdoutEventEmitter).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use ytripper_core::core::events::{ChannelEventEmitter, JobEvent};
    use ytripper_core::models::job::{DownloadMode, QualityTier, EMPTY_URL_MESSAGE};

    use super::*;

    fn args(url: &str, audio: bool, quality: Option<&str>) -> DownloadArgs {
        DownloadArgs {
            url: url.to_string(),
            audio,
            quality: quality.map(str::to_string),
            output: None,
            pick_folder: false,
        }
    }

    #[test]
    fn args_fall_back_to_default_quality() {
        let mut settings = AppSettings::default();
        settings.download.default_quality = "480p".into();

        let wire = start_download_from_args(args("https://youtu.be/abc", false, None), None, &settings);
        let req = JobRequest::try_from(wire).unwrap();
        assert_eq!(req.mode(), DownloadMode::Video(QualityTier::Tier480));
    }

    #[test]
    fn explicit_quality_and_folder_win() {
        let settings = AppSettings::default();
        let wire = start_download_from_args(
            args("https://youtu.be/abc", false, Some("1080p")),
            Some(PathBuf::from("/videos")),
            &settings,
        );
        let req = JobRequest::try_from(wire).unwrap();
        assert_eq!(req.mode(), DownloadMode::Video(QualityTier::Tier1080));
        assert_eq!(req.destination(), Some(&PathBuf::from("/videos")));
    }

    #[test]
    fn serve_line_parses_front_end_request() {
        let req = parse_request(r#"{"url":"https://youtu.be/abc","isAudio":true,"savePath":"","quality":null}"#)
            .unwrap();
        assert_eq!(req.mode(), DownloadMode::Audio);
        assert!(req.destination().is_none());
    }

    #[test]
    fn serve_line_with_blank_url_is_rejected() {
        let err = parse_request(r#"{"url":"  ","isAudio":false}"#).unwrap_err();
        assert_eq!(err.to_string(), EMPTY_URL_MESSAGE);
    }

    #[test]
    fn serve_line_that_is_not_json_is_rejected() {
        assert!(parse_request("https://youtu.be/abc").is_err());
    }

    #[tokio::test]
    async fn rejected_line_still_completes_once() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(Some(dir.path().join("settings.json")));
        let (emitter, mut rx) = ChannelEventEmitter::channel();

        let outcome = handle_line(&state, r#"{"url":"   ","isAudio":false}"#, emitter).await;

        let expected = JobOutcome::failure(FailureReason::Unknown, EMPTY_URL_MESSAGE);
        assert_eq!(outcome, expected);
        assert_eq!(rx.recv().await, Some(JobEvent::Complete(expected)));
        assert_eq!(rx.recv().await, None);
    }
}
