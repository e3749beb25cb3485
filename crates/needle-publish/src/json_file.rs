use crate::atomic::atomic_write;
use crate::publisher::Publisher;
use async_trait::async_trait;
use needle_core::{NowPlaying, PublishError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Writes the latest [`NowPlaying`] record to a JSON file, atomically
/// replaced on every update so a polling web page never reads a torn record.
pub struct JsonFileSink {
    output_path: Mutex<Option<PathBuf>>,
    publish_count: AtomicUsize,
}

impl JsonFileSink {
    pub fn new() -> Self {
        Self {
            output_path: Mutex::new(None),
            publish_count: AtomicUsize::new(0),
        }
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }
}

impl Default for JsonFileSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for JsonFileSink {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), PublishError> {
        let path = config.get("path").and_then(|v| v.as_str()).ok_or_else(|| {
            PublishError::InitializationFailed("missing 'path' in config".to_string())
        })?;
        *self.output_path.lock().unwrap() = Some(PathBuf::from(path));
        Ok(())
    }

    async fn publish(&self, now_playing: &NowPlaying) -> Result<(), PublishError> {
        let path = {
            let guard = self.output_path.lock().unwrap();
            guard
                .clone()
                .ok_or_else(|| PublishError::WriteFailed("not initialized".to_string()))?
        };

        let mut json = serde_json::to_vec_pretty(now_playing)
            .map_err(|e| PublishError::WriteFailed(e.to_string()))?;
        json.push(b'\n');

        atomic_write(&path, &json).map_err(|e| PublishError::WriteFailed(e.to_string()))?;

        self.publish_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.output_path.lock().unwrap().is_some()
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        Ok(())
    }
}
