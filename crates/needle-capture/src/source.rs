use async_trait::async_trait;
use needle_core::{AudioClip, CaptureError};
use std::time::Duration;

/// A live audio source that can be sampled for recognition.
///
/// Implementations must bound each capture themselves; a slow or dead
/// source surfaces as a [`CaptureError`], never as a hung future.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Human-readable description for logs (e.g. the stream URL).
    fn describe(&self) -> String;

    /// Capture `duration` worth of audio from the live source.
    async fn capture(&self, duration: Duration) -> Result<AudioClip, CaptureError>;
}
