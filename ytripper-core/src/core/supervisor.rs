use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::dependencies::{ResolvedTool, ToolKind, ToolLocator};
use crate::core::events::EventEmitter;
use crate::core::process;
use crate::core::progress::ProgressParser;
use crate::core::ytdlp;
use crate::fs_paths::AppPaths;
use crate::models::job::{FailureReason, JobOutcome, JobRequest};

pub const PROCESS_ERROR_DETAIL: &str = "check URL or network";
pub const CANCELLED_DETAIL: &str = "Download cancelled";

const CHUNK_SIZE: usize = 8 * 1024;
const STDERR_TAIL: usize = 16 * 1024;

/// Runs download jobs. Holds no per-job state; tools are resolved again for
/// every job.
#[derive(Clone)]
pub struct JobSupervisor {
    locator: ToolLocator,
    paths: Arc<dyn AppPaths>,
    default_output_dir: Option<PathBuf>,
}

pub struct JobHandle {
    cancel: CancellationToken,
    task: JoinHandle<JobOutcome>,
}

impl JobHandle {
    /// Kills the downloader if it is still running. The job still completes
    /// with a single outcome.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn wait(self) -> JobOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::failure(
                FailureReason::Unknown,
                format!("Download task failed: {}", e),
            ),
        }
    }
}

impl JobSupervisor {
    pub fn new(locator: ToolLocator, paths: Arc<dyn AppPaths>) -> Self {
        Self {
            locator,
            paths,
            default_output_dir: None,
        }
    }

    /// Used instead of the platform downloads dir when a request names none.
    pub fn with_default_output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.default_output_dir = dir;
        self
    }

    pub fn output_dir_for(&self, request: &JobRequest) -> PathBuf {
        request
            .destination()
            .cloned()
            .or_else(|| self.default_output_dir.clone())
            .unwrap_or_else(|| self.paths.downloads_dir())
    }

    /// Spawns the job on the runtime and returns immediately. The completion
    /// event is sent even if the job task panics.
    pub fn start<E: EventEmitter>(&self, request: JobRequest, emitter: E) -> JobHandle {
        let cancel = CancellationToken::new();
        let supervisor = self.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let job = {
                let supervisor = supervisor.clone();
                let request = request.clone();
                let emitter = emitter.clone();
                tokio::spawn(async move { supervisor.execute(&request, &emitter, &token).await })
            };

            let outcome = job.await.unwrap_or_else(|e| {
                JobOutcome::failure(FailureReason::Unknown, format!("Download task failed: {}", e))
            });
            supervisor.finish(&request, &emitter, outcome)
        });

        JobHandle { cancel, task }
    }

    /// Drives one job to its end. `emit_complete` is called exactly once, after
    /// every progress event.
    pub async fn run<E: EventEmitter>(
        &self,
        request: &JobRequest,
        emitter: &E,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let outcome = self.execute(request, emitter, cancel).await;
        self.finish(request, emitter, outcome)
    }

    fn finish<E: EventEmitter>(
        &self,
        request: &JobRequest,
        emitter: &E,
        outcome: JobOutcome,
    ) -> JobOutcome {
        match &outcome {
            JobOutcome::Success(kind) => {
                tracing::info!("{:?} download finished: {}", kind, request.url());
            }
            JobOutcome::Failure { reason, detail } => {
                tracing::warn!(
                    "Download of {} failed ({:?}): {}",
                    request.url(),
                    reason,
                    detail.as_deref().unwrap_or("no detail")
                );
            }
        }

        emitter.emit_complete(&outcome);
        outcome
    }

    async fn execute<E: EventEmitter>(
        &self,
        request: &JobRequest,
        emitter: &E,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let (ffmpeg, downloader) = tokio::join!(
            self.locator.resolve(ToolKind::Ffmpeg),
            self.locator.resolve(ToolKind::Downloader),
        );

        if let Some(missing) = first_missing(&ffmpeg, &downloader) {
            return JobOutcome::failure(FailureReason::ToolMissing, missing.missing_message());
        }

        let output_dir = self.output_dir_for(request);
        let args = ytdlp::build_args(request, &ffmpeg, &output_dir);

        tracing::info!(
            "Starting {:?} download of {} into {}",
            request.mode(),
            request.url(),
            output_dir.display()
        );
        tracing::debug!("{} {:?}", downloader.path_or_command, args);

        let mut child = match process::command(&downloader.path_or_command)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                return JobOutcome::failure(
                    FailureReason::ProcessError,
                    format!("Failed to launch {}: {}", downloader.kind.display_name(), e),
                );
            }
        };

        let stderr_task = child.stderr.take().map(|s| tokio::spawn(capture_stderr(s)));

        let cancelled = match child.stdout.take() {
            Some(stdout) => pump_progress(stdout, emitter, cancel).await,
            None => false,
        };

        let status = if cancelled {
            None
        } else {
            tokio::select! {
                _ = cancel.cancelled() => None,
                status = child.wait() => Some(status),
            }
        };

        let Some(status) = status else {
            if let Err(e) = child.kill().await {
                tracing::debug!("Failed to kill yt-dlp: {}", e);
            }
            // a killed child may leave grandchildren holding the pipe open
            if let Some(task) = stderr_task {
                task.abort();
            }
            return JobOutcome::failure(FailureReason::Unknown, CANCELLED_DETAIL);
        };

        if let Some(task) = stderr_task {
            if let Ok(stderr) = task.await {
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    tracing::debug!("yt-dlp stderr:\n{}", stderr);
                }
            }
        }

        match status {
            Ok(status) if status.success() => JobOutcome::Success(request.mode().media_kind()),
            Ok(status) => {
                tracing::warn!("yt-dlp exited with {}", status);
                JobOutcome::failure(FailureReason::ProcessError, PROCESS_ERROR_DETAIL)
            }
            Err(e) => JobOutcome::failure(
                FailureReason::Unknown,
                format!("Lost track of {}: {}", downloader.kind.display_name(), e),
            ),
        }
    }
}

fn first_missing<'a>(
    ffmpeg: &'a ResolvedTool,
    downloader: &'a ResolvedTool,
) -> Option<&'a ResolvedTool> {
    [ffmpeg, downloader].into_iter().find(|t| !t.available)
}

/// Feeds raw output chunks to a fresh parser until EOF. Returns true when
/// stopped by cancellation.
async fn pump_progress<R, E>(mut reader: R, emitter: &E, cancel: &CancellationToken) -> bool
where
    R: AsyncRead + Unpin,
    E: EventEmitter,
{
    let mut parser = ProgressParser::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return true,
            read = reader.read(&mut buf) => match read {
                Ok(0) => return false,
                Ok(n) => {
                    let chunk = String::from_utf8_lossy(&buf[..n]);
                    if let Some(percent) = parser.consume(&chunk) {
                        emitter.emit_progress(percent);
                    }
                }
                Err(e) => {
                    tracing::debug!("Stopped reading yt-dlp output: {}", e);
                    return false;
                }
            }
        }
    }
}

/// Keeps the last `STDERR_TAIL` bytes; the text only feeds debug logs.
async fn capture_stderr<R: AsyncRead + Unpin>(mut stderr: R) -> String {
    let mut tail = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        match stderr.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&buf[..n]);
                if tail.len() > STDERR_TAIL {
                    let excess = tail.len() - STDERR_TAIL;
                    tail.drain(..excess);
                }
            }
            Err(e) => {
                tracing::debug!("Stopped reading yt-dlp stderr: {}", e);
                break;
            }
        }
    }

    String::from_utf8_lossy(&tail).into_owned()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::core::events::{ChannelEventEmitter, JobEvent};
    use crate::models::job::{DownloadMode, MediaKind, QualityTier};

    const NO_SUCH_COMMAND: &str = "ytripper-no-such-tool-3b1f";
    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    struct FixedPaths(PathBuf);

    impl AppPaths for FixedPaths {
        fn downloads_dir(&self) -> PathBuf {
            self.0.clone()
        }

        fn config_dir(&self) -> PathBuf {
            self.0.clone()
        }

        fn install_root(&self) -> PathBuf {
            self.0.clone()
        }
    }

    fn supervisor(root: &Path) -> JobSupervisor {
        let locator = ToolLocator::new(root)
            .with_command(ToolKind::Ffmpeg, NO_SUCH_COMMAND)
            .with_command(ToolKind::Downloader, NO_SUCH_COMMAND);
        JobSupervisor::new(locator, Arc::new(FixedPaths(root.join("downloads"))))
    }

    fn drain(rx: &mut UnboundedReceiver<JobEvent>) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn progress_values(events: &[JobEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress(p) => Some(*p),
                JobEvent::Complete(_) => None,
            })
            .collect()
    }

    fn assert_single_terminal(events: &[JobEvent]) {
        let completes = events
            .iter()
            .filter(|e| matches!(e, JobEvent::Complete(_)))
            .count();
        assert_eq!(completes, 1, "events: {:?}", events);
        assert!(matches!(events.last(), Some(JobEvent::Complete(_))));
    }

    #[cfg(unix)]
    fn place_script(root: &Path, kind: ToolKind, body: &str, executable: bool) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let bin = root.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let path = bin.join(kind.tool_name());
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mode = if executable { 0o755 } else { 0o644 };
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        path
    }

    #[cfg(unix)]
    fn place_ffmpeg(root: &Path) {
        place_script(root, ToolKind::Ffmpeg, "exit 0", true);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_ffmpeg_never_spawns() {
        let dir = tempfile::tempdir().unwrap();
        place_script(
            dir.path(),
            ToolKind::Downloader,
            "touch \"$(dirname \"$0\")/spawned\"",
            true,
        );
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();

        let outcome = supervisor(dir.path())
            .run(&req, &emitter, &CancellationToken::new())
            .await;

        match &outcome {
            JobOutcome::Failure {
                reason: FailureReason::ToolMissing,
                detail: Some(detail),
            } => {
                assert!(detail.contains("FFmpeg"));
                assert!(detail.contains(NO_SUCH_COMMAND));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!dir.path().join("bin").join("spawned").exists());
        assert_eq!(drain(&mut rx), vec![JobEvent::Complete(outcome)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_downloader_is_named() {
        let dir = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();

        let outcome = supervisor(dir.path())
            .run(&req, &emitter, &CancellationToken::new())
            .await;

        match &outcome {
            JobOutcome::Failure {
                reason: FailureReason::ToolMissing,
                detail: Some(detail),
            } => assert!(detail.contains("yt-dlp")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_single_terminal(&drain(&mut rx));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_video_job_reports_progress_then_success() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        place_script(
            dir.path(),
            ToolKind::Downloader,
            r#"printf '%s\n' "$@" > "$(dirname "$0")/args.txt"
echo '[youtube] dQw4w9WgXcQ: Downloading webpage'
sleep 0.2
echo '[download]   5.0% of 10.00MiB at 1.00MiB/s ETA 00:09'
sleep 0.2
echo '[download]   3.2% of 10.00MiB at 1.00MiB/s ETA 00:09'
sleep 0.2
echo '[download]   5.0% of 10.00MiB at 1.00MiB/s ETA 00:09'
sleep 0.2
echo '[download]  12.7% of 10.00MiB at 1.00MiB/s ETA 00:08'
echo 'WARNING: something odd' >&2
exit 0"#,
            true,
        );
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(
            URL,
            DownloadMode::Video(QualityTier::Tier720),
            Some(out.path().to_path_buf()),
        )
        .unwrap();

        let outcome = supervisor(dir.path())
            .run(&req, &emitter, &CancellationToken::new())
            .await;
        assert_eq!(outcome, JobOutcome::Success(MediaKind::Video));

        let events = drain(&mut rx);
        assert_single_terminal(&events);
        let progress = progress_values(&events);
        assert_eq!(progress.first(), Some(&5.0));
        assert!(progress.windows(2).all(|w| w[0] < w[1]), "{:?}", progress);

        let args = std::fs::read_to_string(dir.path().join("bin").join("args.txt")).unwrap();
        let args: Vec<&str> = args.lines().collect();
        assert_eq!(args.last(), Some(&URL));
        let out_str = out.path().to_string_lossy();
        assert!(args.windows(2).any(|w| w[0] == "-P" && w[1] == out_str));
        assert!(args.contains(&"bv*[height<=720][ext=mp4]+ba[ext=m4a]/b[height<=720]"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn audio_job_succeeds_as_audio() {
        let dir = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        place_script(dir.path(), ToolKind::Downloader, "exit 0", true);
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();

        let outcome = supervisor(dir.path())
            .run(&req, &emitter, &CancellationToken::new())
            .await;

        assert_eq!(outcome, JobOutcome::Success(MediaKind::Audio));
        assert_eq!(drain(&mut rx), vec![JobEvent::Complete(outcome)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        place_script(
            dir.path(),
            ToolKind::Downloader,
            "echo 'ERROR: Unsupported URL' >&2\nexit 1",
            true,
        );
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new("not a url", DownloadMode::Video(QualityTier::Best), None).unwrap();

        let outcome = supervisor(dir.path())
            .run(&req, &emitter, &CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            JobOutcome::failure(FailureReason::ProcessError, PROCESS_ERROR_DETAIL)
        );
        assert_single_terminal(&drain(&mut rx));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unlaunchable_downloader_is_process_error() {
        let dir = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        place_script(dir.path(), ToolKind::Downloader, "exit 0", false);
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();

        let outcome = supervisor(dir.path())
            .run(&req, &emitter, &CancellationToken::new())
            .await;

        match &outcome {
            JobOutcome::Failure {
                reason: FailureReason::ProcessError,
                detail: Some(detail),
            } => assert!(detail.starts_with("Failed to launch yt-dlp")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_single_terminal(&drain(&mut rx));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cancelled_job_completes_once() {
        let dir = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        place_script(
            dir.path(),
            ToolKind::Downloader,
            "echo '[download]   1.0% of 10.00MiB'\nexec sleep 30",
            true,
        );
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();

        let handle = supervisor(dir.path()).start(req, emitter);
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        handle.cancel();

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), handle.wait())
            .await
            .expect("job did not stop after cancel");
        assert_eq!(
            outcome,
            JobOutcome::failure(FailureReason::Unknown, CANCELLED_DETAIL)
        );
        assert_single_terminal(&drain(&mut rx));
    }

    #[derive(Clone)]
    struct PanicOnProgress(ChannelEventEmitter);

    impl EventEmitter for PanicOnProgress {
        fn emit_progress(&self, _percent: f64) {
            panic!("progress sink failed");
        }

        fn emit_complete(&self, outcome: &JobOutcome) {
            self.0.emit_complete(outcome);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn panicking_job_still_completes_once() {
        let dir = tempfile::tempdir().unwrap();
        place_ffmpeg(dir.path());
        place_script(
            dir.path(),
            ToolKind::Downloader,
            "echo '[download]   1.0% of 10.00MiB'\nexec sleep 30",
            true,
        );
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let req = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();

        let handle = supervisor(dir.path()).start(req, PanicOnProgress(emitter));
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), handle.wait())
            .await
            .expect("job did not finish after panic");

        match &outcome {
            JobOutcome::Failure {
                reason: FailureReason::Unknown,
                detail: Some(detail),
            } => assert!(detail.starts_with("Download task failed")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(drain(&mut rx), vec![JobEvent::Complete(outcome)]);
    }

    #[test]
    fn output_dir_prefers_request_then_settings_then_platform() {
        let dir = tempfile::tempdir().unwrap();
        let sup = supervisor(dir.path());
        let plain = JobRequest::new(URL, DownloadMode::Audio, None).unwrap();
        assert_eq!(sup.output_dir_for(&plain), dir.path().join("downloads"));

        let sup = sup.with_default_output_dir(Some(PathBuf::from("/music")));
        assert_eq!(sup.output_dir_for(&plain), PathBuf::from("/music"));

        let explicit =
            JobRequest::new(URL, DownloadMode::Audio, Some(PathBuf::from("/explicit"))).unwrap();
        assert_eq!(sup.output_dir_for(&explicit), PathBuf::from("/explicit"));
    }

    #[tokio::test]
    async fn pump_reports_increasing_progress_until_eof() {
        let (emitter, mut rx) = ChannelEventEmitter::channel();
        let output: &[u8] = b"[download]  33.3% of 3MiB\n";
        let cancelled = pump_progress(output, &emitter, &CancellationToken::new()).await;

        assert!(!cancelled);
        assert_eq!(drain(&mut rx), vec![JobEvent::Progress(33.3)]);
    }

    #[tokio::test]
    async fn stderr_capture_keeps_only_the_tail() {
        let mut noise = vec![b'x'; STDERR_TAIL * 3];
        noise.extend_from_slice(b"ERROR: Unsupported URL");

        let captured = capture_stderr(noise.as_slice()).await;

        assert_eq!(captured.len(), STDERR_TAIL);
        assert!(captured.ends_with("ERROR: Unsupported URL"));
    }
}
