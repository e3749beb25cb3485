use crate::atomic::atomic_write;
use crate::publisher::Publisher;
use async_trait::async_trait;
use needle_core::{NowPlaying, PlayStatus, PublishError};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

const USER_AGENT: &str = concat!("needledrop/", env!("CARGO_PKG_VERSION"));
const ADMIN_TIMEOUT: Duration = Duration::from_secs(5);
const COVER_TIMEOUT: Duration = Duration::from_secs(10);

/// Pushes the current track into the Icecast stream's own metadata
/// (`StreamTitle`/`StreamUrl` via the admin `updinfo` endpoint) and mirrors
/// cover art to a locally served file.
pub struct IcecastSink {
    inner: Mutex<Option<Inner>>,
}

#[derive(Clone)]
struct Inner {
    http: reqwest::Client,
    admin_url: String,
    mount: String,
    username: String,
    password: String,
    cover_path: Option<PathBuf>,
    cover_url: Option<String>,
}

impl IcecastSink {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }
}

impl Default for IcecastSink {
    fn default() -> Self {
        Self::new()
    }
}

/// The `song` value for StreamTitle. "Artist - Title", falling back to the
/// artist alone for an empty title, with fixed labels for the idle states.
fn stream_title(now_playing: &NowPlaying) -> String {
    match now_playing.status {
        PlayStatus::Playing => match &now_playing.track {
            Some(track) if track.title.is_empty() => track.artist.clone(),
            Some(track) => format!("{} - {}", track.artist, track.title),
            None => "Unknown".to_string(),
        },
        PlayStatus::Detecting => "Detecting...".to_string(),
        PlayStatus::Paused => "Paused".to_string(),
        PlayStatus::Unknown => "Unknown".to_string(),
    }
}

fn required<'a>(config: &'a toml::Value, key: &str) -> Result<&'a str, PublishError> {
    config.get(key).and_then(|v| v.as_str()).ok_or_else(|| {
        PublishError::InitializationFailed(format!("missing '{key}' in config"))
    })
}

impl Inner {
    /// Mirror the remote cover art into the locally served file. Failures
    /// degrade to metadata-without-cover rather than failing the publish.
    async fn mirror_cover(&self, src_url: &str) -> Option<String> {
        let (path, public_url) = match (&self.cover_path, &self.cover_url) {
            (Some(p), Some(u)) => (p, u),
            _ => return None,
        };

        let fetched = async {
            let response = self.http.get(src_url).send().await?;
            response.error_for_status()?.bytes().await
        }
        .await;

        match fetched {
            Ok(bytes) => match atomic_write(path, &bytes) {
                Ok(()) => {
                    tracing::debug!(bytes = bytes.len(), "cover art mirrored");
                    Some(public_url.clone())
                }
                Err(e) => {
                    tracing::warn!("failed to save cover art: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::warn!("failed to download cover art: {e}");
                None
            }
        }
    }

    /// Remove the local cover file so the display falls back to its placeholder.
    fn clear_cover(&self) {
        if let Some(path) = &self.cover_path {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("cover art cleared"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("failed to clear cover art: {e}"),
            }
        }
    }
}

#[async_trait]
impl Publisher for IcecastSink {
    fn name(&self) -> &str {
        "icecast"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), PublishError> {
        let admin_url = required(&config, "admin_url")?.to_string();
        let mount = required(&config, "mount")?.to_string();
        let username = required(&config, "username")?.to_string();
        let password = required(&config, "password")?.to_string();

        let cover_path = config
            .get("cover_path")
            .and_then(|v| v.as_str())
            .map(PathBuf::from);
        let cover_url = config
            .get("cover_url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        // Mirroring needs both the local file and the URL it is served under.
        if cover_path.is_some() != cover_url.is_some() {
            return Err(PublishError::InitializationFailed(
                "'cover_path' and 'cover_url' must be configured together".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(COVER_TIMEOUT.max(ADMIN_TIMEOUT))
            .build()
            .map_err(|e| PublishError::InitializationFailed(e.to_string()))?;

        *self.inner.lock().unwrap() = Some(Inner {
            http,
            admin_url,
            mount,
            username,
            password,
            cover_path,
            cover_url,
        });
        Ok(())
    }

    async fn publish(&self, now_playing: &NowPlaying) -> Result<(), PublishError> {
        let inner = {
            let guard = self.inner.lock().unwrap();
            guard
                .clone()
                .ok_or_else(|| PublishError::WriteFailed("not initialized".to_string()))?
        };

        let song = stream_title(now_playing);

        let cover_public = match now_playing.status {
            PlayStatus::Playing => {
                match now_playing.track.as_ref().and_then(|t| t.cover_url.as_deref()) {
                    Some(src) => inner.mirror_cover(src).await,
                    None => None,
                }
            }
            PlayStatus::Unknown => {
                inner.clear_cover();
                None
            }
            _ => None,
        };

        let mut params: Vec<(&str, String)> = vec![
            ("mount", inner.mount.clone()),
            ("mode", "updinfo".to_string()),
            ("song", song.clone()),
        ];
        if let Some(url) = cover_public {
            params.push(("url", url));
        }

        let response = inner
            .http
            .get(&inner.admin_url)
            .query(&params)
            .basic_auth(&inner.username, Some(&inner.password))
            .timeout(ADMIN_TIMEOUT)
            .send()
            .await
            .map_err(|e| PublishError::WriteFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::WriteFailed(format!(
                "admin endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        tracing::info!(song = %song, "icecast metadata updated");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.inner.lock().unwrap().is_some()
    }

    async fn shutdown(&self) -> Result<(), PublishError> {
        Ok(())
    }
}
