use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to launch capture process: {0}")]
    Spawn(String),

    #[error("audio capture timed out after {0} seconds")]
    Timeout(u64),

    #[error("capture process failed: {0}")]
    ProcessFailed(String),

    #[error("capture produced no audio data")]
    EmptyCapture,

    #[error("failed to fetch stream stats: {0}")]
    Stats(String),
}

#[derive(Debug, Error)]
pub enum RecognizeError {
    #[error("network error: {0}")]
    Network(String),

    #[error("recognition request timed out")]
    Timeout,

    #[error("provider returned HTTP {0}: {1}")]
    Api(u16, String),

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("provider rejected credentials")]
    InvalidApiKey,

    #[error("recognition provider not found: {0}")]
    ProviderNotFound(String),

    #[error("provider initialization failed: {0}")]
    InitializationFailed(String),
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("sink initialization failed: {0}")]
    InitializationFailed(String),

    #[error("failed to write sink record: {0}")]
    WriteFailed(String),

    #[error("sink not found: {0}")]
    NotFound(String),
}
