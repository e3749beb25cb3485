use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A short segment of captured stream audio (WAV bytes).
///
/// Created once per poll cycle and dropped as soon as the recognition
/// call returns; nothing is persisted.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub duration: Duration,
}

/// Metadata for an identified track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayStatus {
    /// A track was identified and is assumed to still be playing.
    Playing,
    /// No track could be identified.
    Unknown,
    /// The stream is idle (no listeners tuned in).
    Paused,
    /// Listeners just arrived; first recognition attempt is underway.
    Detecting,
}

/// The sink record: the last-known recognition outcome, written by exactly
/// one writer (the recognition loop) and read by arbitrarily many viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub status: PlayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackInfo>,
    pub updated_at: DateTime<Utc>,
}

impl NowPlaying {
    pub fn playing(track: TrackInfo) -> Self {
        Self {
            status: PlayStatus::Playing,
            track: Some(track),
            updated_at: Utc::now(),
        }
    }

    pub fn status_only(status: PlayStatus) -> Self {
        Self {
            status,
            track: None,
            updated_at: Utc::now(),
        }
    }
}
