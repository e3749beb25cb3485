pub mod backoff;
pub mod config;
pub mod error;
pub mod types;

pub use backoff::Backoff;
pub use config::{
    AppConfig, GeneralConfig, IcecastConfig, NoMatchPolicy, NullConfig, PollConfig,
    RecognizerConfig, ShazamConfig, SinkConfig, StreamConfig,
};
pub use error::{CaptureError, ConfigError, PublishError, RecognizeError};
pub use types::{AudioClip, NowPlaying, PlayStatus, TrackInfo};
