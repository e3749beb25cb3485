use async_trait::async_trait;
use needle_core::{NowPlaying, PublishError};

/// A metadata sink that exposes the latest recognition result somewhere
/// a display surface can read it.
///
/// Implementations are registered via [`SinkRegistry`](crate::SinkRegistry)
/// and receive each new [`NowPlaying`] record through
/// [`publish`](Self::publish). Sinks must replace their stored record
/// atomically: a concurrent reader never observes a half-written record.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns the sink's plugin name (e.g. `"json_file"`, `"icecast"`).
    fn name(&self) -> &str;
    /// One-time initialisation with sink-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), PublishError>;
    /// Replace the sink's record with `now_playing`.
    async fn publish(&self, now_playing: &NowPlaying) -> Result<(), PublishError>;
    /// Returns `true` if the sink is currently able to accept records.
    fn is_healthy(&self) -> bool;
    /// Gracefully shut down the sink, releasing resources.
    async fn shutdown(&self) -> Result<(), PublishError>;
}
