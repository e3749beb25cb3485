use async_trait::async_trait;
use needle_core::{AudioClip, RecognizeError, TrackInfo};

/// A recognition provider that identifies a track from a short audio clip.
///
/// Implementations are registered via [`ProviderRegistry`](crate::ProviderRegistry)
/// and receive provider-specific TOML configuration through
/// [`initialize`](Self::initialize). A clean "nothing matched" outcome is
/// `Ok(None)`; errors are reserved for transport and provider failures.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Returns the provider's plugin name (e.g. `"shazam"`, `"null"`).
    fn name(&self) -> &str;
    /// One-time initialisation with provider-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognizeError>;
    /// Identify the track in `clip`, or `Ok(None)` when nothing matched.
    async fn recognize(&self, clip: &AudioClip) -> Result<Option<TrackInfo>, RecognizeError>;
}
