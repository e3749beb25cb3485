use crate::recognizer::Recognizer;
use async_trait::async_trait;
use needle_core::{AudioClip, RecognizeError, TrackInfo};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Offline provider for tests and credential-less smoke runs.
///
/// When configured with `title` and `artist` it "recognizes" that fixed
/// track on every call; otherwise every call is a no-match.
pub struct NullRecognizer {
    fixed: Mutex<Option<TrackInfo>>,
    call_count: AtomicUsize,
}

impl NullRecognizer {
    pub fn new() -> Self {
        Self {
            fixed: Mutex::new(None),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Default for NullRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for NullRecognizer {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognizeError> {
        let title = config.get("title").and_then(|v| v.as_str());
        let artist = config.get("artist").and_then(|v| v.as_str());

        if let (Some(title), Some(artist)) = (title, artist) {
            let track = TrackInfo {
                title: title.to_string(),
                artist: artist.to_string(),
                album: config
                    .get("album")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
                cover_url: None,
            };
            *self.fixed.lock().unwrap() = Some(track);
        }
        Ok(())
    }

    async fn recognize(&self, clip: &AudioClip) -> Result<Option<TrackInfo>, RecognizeError> {
        let count = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(
            "NullRecognizer call #{count}, {} byte clip",
            clip.data.len()
        );
        Ok(self.fixed.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn clip() -> AudioClip {
        AudioClip {
            data: vec![0u8; 64],
            duration: Duration::from_secs(8),
        }
    }

    #[test]
    fn test_null_recognizer_name() {
        let provider = NullRecognizer::new();
        assert_eq!(provider.name(), "null");
    }

    #[tokio::test]
    async fn test_null_recognizer_unconfigured_is_no_match() {
        let mut provider = NullRecognizer::new();
        provider
            .initialize(toml::Value::Table(Default::default()))
            .await
            .unwrap();
        let result = provider.recognize(&clip()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_null_recognizer_configured_returns_fixed_track() {
        let mut provider = NullRecognizer::new();
        let mut table = toml::map::Map::new();
        table.insert("title".to_string(), toml::Value::String("A".to_string()));
        table.insert("artist".to_string(), toml::Value::String("B".to_string()));
        provider.initialize(toml::Value::Table(table)).await.unwrap();

        let track = provider.recognize(&clip()).await.unwrap().unwrap();
        assert_eq!(track.title, "A");
        assert_eq!(track.artist, "B");
        assert!(track.album.is_none());
    }

    #[tokio::test]
    async fn test_null_recognizer_title_alone_is_not_enough() {
        let mut provider = NullRecognizer::new();
        let mut table = toml::map::Map::new();
        table.insert("title".to_string(), toml::Value::String("A".to_string()));
        provider.initialize(toml::Value::Table(table)).await.unwrap();
        assert!(provider.recognize(&clip()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_recognizer_call_count_increments() {
        let provider = NullRecognizer::new();
        for _ in 0..3 {
            provider.recognize(&clip()).await.unwrap();
        }
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_null_recognizer_implements_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullRecognizer>();
    }
}
