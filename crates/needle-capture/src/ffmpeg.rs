use crate::source::AudioSource;
use async_trait::async_trait;
use needle_core::{AudioClip, CaptureError};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A canonical WAV header is 44 bytes; anything at or below that carries no samples.
const WAV_HEADER_LEN: usize = 44;

/// Samples a live stream by running ffmpeg as a child process and reading
/// decoded WAV from its stdout.
pub struct FfmpegSource {
    stream_url: String,
    capture_timeout: Duration,
    command: String,
}

impl FfmpegSource {
    pub fn new(stream_url: impl Into<String>, capture_timeout: Duration) -> Self {
        Self {
            stream_url: stream_url.into(),
            capture_timeout,
            command: "ffmpeg".to_string(),
        }
    }

    /// Override the ffmpeg binary name (tests, unusual installs).
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }
}

/// Build the ffmpeg argument list for one capture: decode `duration`
/// seconds of the stream to 44.1kHz stereo WAV on stdout.
fn build_args(stream_url: &str, duration: Duration) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        stream_url.to_string(),
        "-t".to_string(),
        duration.as_secs().to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-f".to_string(),
        "wav".to_string(),
        "pipe:1".to_string(),
    ]
}

fn has_audio_payload(data: &[u8]) -> bool {
    data.len() > WAV_HEADER_LEN
}

#[async_trait]
impl AudioSource for FfmpegSource {
    fn describe(&self) -> String {
        self.stream_url.clone()
    }

    async fn capture(&self, duration: Duration) -> Result<AudioClip, CaptureError> {
        let args = build_args(&self.stream_url, duration);

        tracing::debug!(
            url = %self.stream_url,
            secs = duration.as_secs(),
            "capturing stream sample"
        );

        let child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CaptureError::Spawn(e.to_string()))?;

        // kill_on_drop reaps the child if the timeout fires first.
        let output = tokio::time::timeout(self.capture_timeout, child.wait_with_output())
            .await
            .map_err(|_| CaptureError::Timeout(self.capture_timeout.as_secs()))?
            .map_err(|e| CaptureError::ProcessFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CaptureError::ProcessFailed(
                stderr.trim().lines().last().unwrap_or("unknown error").to_string(),
            ));
        }

        if !has_audio_payload(&output.stdout) {
            return Err(CaptureError::EmptyCapture);
        }

        Ok(AudioClip {
            data: output.stdout,
            duration,
        })
    }
}
