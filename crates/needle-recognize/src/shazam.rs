use crate::recognizer::Recognizer;
use async_trait::async_trait;
use needle_core::{AudioClip, RecognizeError, TrackInfo};
use std::time::Duration;

const USER_AGENT: &str = concat!("needledrop/", env!("CARGO_PKG_VERSION"));
// Outer bound on a single HTTP exchange; the loop applies its own,
// usually tighter, recognition timeout on top.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP recognition provider speaking the Shazam-style discovery API:
/// POST the raw WAV clip, get back a JSON document with an optional
/// `track` object.
pub struct ShazamRecognizer {
    endpoint: Option<String>,
    api_key: Option<String>,
    http: Option<reqwest::Client>,
}

impl ShazamRecognizer {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            http: None,
        }
    }
}

impl Default for ShazamRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Recognizer for ShazamRecognizer {
    fn name(&self) -> &str {
        "shazam"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognizeError> {
        let endpoint = config
            .get("endpoint")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RecognizeError::InitializationFailed(
                    "missing 'endpoint' in shazam config".to_string(),
                )
            })?;
        let api_key = config
            .get("api_key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RecognizeError::InitializationFailed(
                    "missing 'api_key' in shazam config".to_string(),
                )
            })?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| RecognizeError::InitializationFailed(e.to_string()))?;

        self.endpoint = Some(endpoint.to_string());
        self.api_key = Some(api_key.to_string());
        self.http = Some(http);
        Ok(())
    }

    async fn recognize(&self, clip: &AudioClip) -> Result<Option<TrackInfo>, RecognizeError> {
        let (http, endpoint, api_key) = match (&self.http, &self.endpoint, &self.api_key) {
            (Some(h), Some(e), Some(k)) => (h, e, k),
            _ => {
                return Err(RecognizeError::InitializationFailed(
                    "recognizer not initialized".to_string(),
                ))
            }
        };

        tracing::debug!(
            bytes = clip.data.len(),
            secs = clip.duration.as_secs(),
            "submitting clip to recognition provider"
        );

        let response = http
            .post(endpoint)
            .header("x-api-key", api_key)
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .query(&[("duration", clip.duration.as_secs().to_string())])
            .body(clip.data.clone())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecognizeError::Timeout
                } else {
                    RecognizeError::Network(e.to_string())
                }
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(RecognizeError::InvalidApiKey);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RecognizeError::Api(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RecognizeError::Parse(e.to_string()))?;

        let track = parse_track(&body);
        if let Some(ref t) = track {
            tracing::info!(artist = %t.artist, title = %t.title, "provider matched a track");
        }
        Ok(track)
    }
}

/// Extract track metadata from a Shazam-shaped response document.
///
/// A missing or empty `track` object is the no-match outcome. The artist
/// rides in `track.subtitle`; the album hides in the metadata sections;
/// cover art prefers the HQ variant.
fn parse_track(body: &serde_json::Value) -> Option<TrackInfo> {
    let track = body.get("track")?;
    if !track.is_object() || track.as_object().is_some_and(|t| t.is_empty()) {
        return None;
    }

    let title = track["title"].as_str().unwrap_or("Unknown").to_string();
    let artist = track["subtitle"].as_str().unwrap_or("Unknown").to_string();

    let album = track["sections"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|section| section["metadata"].as_array())
        .flatten()
        .find(|meta| {
            meta["title"]
                .as_str()
                .is_some_and(|t| t.eq_ignore_ascii_case("album"))
        })
        .and_then(|meta| meta["text"].as_str())
        .map(|s| s.to_string());

    let images = &track["images"];
    let cover_url = images["coverarthq"]
        .as_str()
        .or_else(|| images["coverart"].as_str())
        .map(|s| s.to_string());

    Some(TrackInfo {
        title,
        artist,
        album,
        cover_url,
    })
}
