pub mod ffmpeg;
pub mod source;
pub mod stats;

pub use ffmpeg::FfmpegSource;
pub use source::AudioSource;
pub use stats::{ListenerStats, StatsClient};
