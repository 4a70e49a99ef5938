//! FFmpeg invocation: argument building and a timeout-bounded runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

const FFMPEG: &str = "ffmpeg";

/// Number of trailing stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// What FFmpeg should do when the output file already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overwrite {
    /// `-y`: replace existing output
    #[default]
    Always,
    /// `-n`: fail instead of replacing existing output
    Never,
}

impl Overwrite {
    fn flag(self) -> &'static str {
        match self {
            Self::Always => "-y",
            Self::Never => "-n",
        }
    }
}

/// One FFmpeg invocation: a single input, a single output and the output
/// options between them.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    source: PathBuf,
    target: PathBuf,
    options: Vec<String>,
    overwrite: Overwrite,
}

impl FfmpegCommand {
    /// `target` may be an image sequence pattern such as `frame_%02d.jpg`.
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
            options: Vec::new(),
            overwrite: Overwrite::default(),
        }
    }

    /// Append raw output arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a `flag value` pair.
    pub fn option(self, flag: &str, value: impl Into<String>) -> Self {
        self.args([flag.to_string(), value.into()])
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.option("-vf", filter)
    }

    pub fn audio_codec(self, codec: &str) -> Self {
        self.option("-acodec", codec)
    }

    pub fn sample_rate(self, hz: u32) -> Self {
        self.option("-ar", hz.to_string())
    }

    pub fn channels(self, channels: u8) -> Self {
        self.option("-ac", channels.to_string())
    }

    /// Drop the video stream.
    pub fn no_video(self) -> Self {
        self.args(["-vn"])
    }

    pub fn overwrite(mut self, policy: Overwrite) -> Self {
        self.overwrite = policy;
        self
    }

    /// Full argument list, excluding the program name.
    pub fn to_args(&self) -> Vec<String> {
        // Errors only: keeps the captured stderr tail readable
        let preamble = [self.overwrite.flag(), "-hide_banner", "-v", "error", "-i"];

        preamble
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(self.source.to_string_lossy().into_owned()))
            .chain(self.options.iter().cloned())
            .chain(std::iter::once(self.target.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Runs [`FfmpegCommand`]s, killing any that outlive the timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// A runner that waits indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `cmd` to completion.
    ///
    /// Non-zero exits become [`MediaError::FfmpegFailed`] carrying the last
    /// stderr lines; an expired timeout becomes [`MediaError::Timeout`].
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        check_ffmpeg()?;

        let args = cmd.to_args();
        debug!(args = %args.join(" "), "Spawning ffmpeg");

        let mut child = Command::new(FFMPEG)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("ffmpeg stderr was not piped"))?;
        let tail = tokio::spawn(stderr_tail(stderr));

        let status = self.wait(&mut child).await;
        let tail = tail.await.unwrap_or_default();

        let status = status?;
        if status.success() {
            return Ok(());
        }

        warn!(exit_code = ?status.code(), stderr = %tail, "ffmpeg failed");
        Err(MediaError::ffmpeg_failed(
            format!("ffmpeg exited with {}", status),
            (!tail.is_empty()).then_some(tail),
            status.code(),
        ))
    }

    async fn wait(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait().await?);
        };

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => Ok(status?),
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "ffmpeg timed out, killing it");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill ffmpeg");
                }
                Err(MediaError::Timeout(timeout.as_secs()))
            }
        }
    }
}

/// Drain a stream, keeping only its last [`STDERR_TAIL_LINES`] lines.
async fn stderr_tail(stream: impl AsyncRead + Unpin) -> String {
    let mut lines = BufReader::new(stream).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

/// Locate the ffmpeg binary on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which(FFMPEG).map_err(|_| MediaError::FfmpegNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_args_layout() {
        let args = FfmpegCommand::new("input.mp4", "output.wav")
            .no_video()
            .audio_codec("pcm_s16le")
            .sample_rate(16000)
            .channels(1)
            .to_args();

        assert_eq!(
            args,
            [
                "-y", "-hide_banner", "-v", "error", "-i", "input.mp4", "-vn", "-acodec",
                "pcm_s16le", "-ar", "16000", "-ac", "1", "output.wav",
            ]
        );
    }

    #[test]
    fn test_never_overwrite_flag() {
        let args = FfmpegCommand::new("in.mp4", "out.wav")
            .overwrite(Overwrite::Never)
            .to_args();
        assert_eq!(args[0], "-n");
        assert!(!args.iter().any(|a| a == "-y"));
    }

    #[tokio::test]
    async fn test_stderr_tail_keeps_last_lines() {
        let text: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let tail = stderr_tail(text.as_bytes()).await;

        let lines: Vec<&str> = tail.lines().collect();
        assert_eq!(lines.len(), STDERR_TAIL_LINES);
        assert_eq!(lines.first(), Some(&"line 10"));
        assert_eq!(lines.last(), Some(&"line 29"));
    }
}
