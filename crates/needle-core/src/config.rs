use crate::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    pub stream: StreamConfig,

    #[serde(default)]
    pub recognizer: RecognizerConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(default)]
    pub icecast: Option<IcecastConfig>,

    #[serde(default, rename = "sink")]
    pub sinks: Vec<SinkConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// URL of the live stream to sample (e.g. the local Icecast mount).
    pub url: String,

    #[serde(default = "default_sample_secs")]
    pub sample_secs: u64,

    /// Hard bound on a single capture attempt. Defaults to `sample_secs + 10`.
    #[serde(default)]
    pub capture_timeout_secs: Option<u64>,
}

impl StreamConfig {
    pub fn sample_duration(&self) -> Duration {
        Duration::from_secs(self.sample_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(
            self.capture_timeout_secs
                .unwrap_or(self.sample_secs + 10),
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RecognizerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_recognize_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub shazam: Option<ShazamConfig>,

    #[serde(default)]
    pub null: Option<NullConfig>,
}

impl RecognizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            timeout_secs: default_recognize_timeout_secs(),
            shazam: None,
            null: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ShazamConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NullConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Re-check cadence while the stream has no listeners.
    #[serde(default = "default_idle_interval_secs")]
    pub idle_interval_secs: u64,

    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,

    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,

    #[serde(default)]
    pub no_match: NoMatchPolicy,
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn backoff_initial(&self) -> Duration {
        Duration::from_secs(self.backoff_initial_secs)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            idle_interval_secs: default_idle_interval_secs(),
            backoff_initial_secs: default_backoff_initial_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            no_match: NoMatchPolicy::default(),
        }
    }
}

/// What to do with the sink record when recognition succeeds but nothing matches.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoMatchPolicy {
    /// Forget the last track and publish "no track identified".
    #[default]
    Clear,
    /// Keep showing the previously identified track.
    Retain,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IcecastConfig {
    /// Icecast stats endpoint (status-json.xsl) used for listener gating.
    pub stats_url: String,

    #[serde(default = "default_true")]
    pub gate_on_listeners: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SinkConfig {
    pub plugin: String,

    #[serde(flatten)]
    pub extra: toml::Value,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_sample_secs() -> u64 {
    8
}

fn default_provider() -> String {
    "shazam".to_string()
}

fn default_recognize_timeout_secs() -> u64 {
    20
}

fn default_interval_secs() -> u64 {
    30
}

fn default_idle_interval_secs() -> u64 {
    15
}

fn default_backoff_initial_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.url.is_empty() {
            return Err(ConfigError::Invalid("stream.url must not be empty".into()));
        }
        if self.stream.sample_secs == 0 {
            return Err(ConfigError::Invalid(
                "stream.sample_secs must be at least 1".into(),
            ));
        }
        if self.poll.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.interval_secs must be at least 1".into(),
            ));
        }
        if self.poll.backoff_initial_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll.backoff_initial_secs must be at least 1".into(),
            ));
        }
        if self.poll.backoff_max_secs < self.poll.backoff_initial_secs {
            return Err(ConfigError::Invalid(
                "poll.backoff_max_secs must be at least poll.backoff_initial_secs".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parse_valid_toml() {
        let toml_str = r#"
[general]
log_level = "debug"

[stream]
url = "http://localhost:8000/stream.mp3"
sample_secs = 5

[recognizer]
provider = "shazam"
timeout_secs = 10

[recognizer.shazam]
endpoint = "https://amp.example.com/discovery"
api_key = "k123"

[poll]
interval_secs = 15
no_match = "retain"

[[sink]]
plugin = "json_file"
path = "/var/www/nowplaying.json"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.stream.url, "http://localhost:8000/stream.mp3");
        assert_eq!(config.stream.sample_secs, 5);
        assert_eq!(config.recognizer.provider, "shazam");
        assert_eq!(config.recognizer.timeout_secs, 10);
        assert_eq!(
            config.recognizer.shazam.as_ref().unwrap().api_key,
            "k123"
        );
        assert_eq!(config.poll.interval_secs, 15);
        assert_eq!(config.poll.no_match, NoMatchPolicy::Retain);
        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.sinks[0].plugin, "json_file");
    }

    #[test]
    fn test_config_parse_minimal_toml() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.stream.sample_secs, 8);
        assert_eq!(config.stream.capture_timeout(), Duration::from_secs(18));
        assert_eq!(config.recognizer.provider, "shazam");
        assert_eq!(config.recognizer.timeout(), Duration::from_secs(20));
        assert_eq!(config.poll.interval(), Duration::from_secs(30));
        assert_eq!(config.poll.idle_interval(), Duration::from_secs(15));
        assert_eq!(config.poll.backoff_initial(), Duration::from_secs(1));
        assert_eq!(config.poll.backoff_max(), Duration::from_secs(60));
        assert_eq!(config.poll.no_match, NoMatchPolicy::Clear);
        assert!(config.icecast.is_none());
        assert!(config.sinks.is_empty());
    }

    #[test]
    fn test_config_missing_stream_section_fails() {
        let result = AppConfig::from_toml_str("");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_empty_stream_url_fails() {
        let toml_str = r#"
[stream]
url = ""
"#;
        let result = AppConfig::from_toml_str(toml_str);
        match result {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("stream.url")),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn test_config_zero_sample_secs_fails() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"
sample_secs = 0
"#;
        assert!(AppConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_config_zero_poll_interval_fails() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[poll]
interval_secs = 0
"#;
        match AppConfig::from_toml_str(toml_str) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("poll.interval_secs")),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn test_config_backoff_max_below_initial_fails() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[poll]
backoff_initial_secs = 5
backoff_max_secs = 2
"#;
        match AppConfig::from_toml_str(toml_str) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("poll.backoff_max_secs")),
            _ => panic!("expected Invalid"),
        }
    }

    #[test]
    fn test_config_zero_backoff_max_fails() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[poll]
backoff_max_secs = 0
"#;
        assert!(AppConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_config_env_var_interpolation() {
        std::env::set_var("NEEDLE_TEST_KEY", "secret123");
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[recognizer.shazam]
endpoint = "https://amp.example.com"
api_key = "${NEEDLE_TEST_KEY}"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.recognizer.shazam.unwrap().api_key, "secret123");
        std::env::remove_var("NEEDLE_TEST_KEY");
    }

    #[test]
    fn test_config_missing_env_var_error() {
        let toml_str = r#"
[stream]
url = "${DEFINITELY_DOES_NOT_EXIST_12345}"
"#;
        let result = AppConfig::from_toml_str(toml_str);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("DEFINITELY_DOES_NOT_EXIST_12345"));
    }

    #[test]
    fn test_config_invalid_toml_error() {
        let toml_str = "this is not valid toml [[[";
        assert!(AppConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn test_config_capture_timeout_override() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"
sample_secs = 8
capture_timeout_secs = 12
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.stream.capture_timeout(), Duration::from_secs(12));
    }

    #[test]
    fn test_config_icecast_section_defaults() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[icecast]
stats_url = "http://localhost:8000/status-json.xsl"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        let icecast = config.icecast.unwrap();
        assert_eq!(icecast.stats_url, "http://localhost:8000/status-json.xsl");
        assert!(icecast.gate_on_listeners);
    }

    #[test]
    fn test_config_sink_extra_fields() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[[sink]]
plugin = "icecast"
admin_url = "http://localhost:8000/admin/metadata"
mount = "/stream.mp3"
username = "admin"
password = "hackme"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        let sink = &config.sinks[0];
        assert_eq!(sink.plugin, "icecast");
        // Extra fields are captured via #[serde(flatten)]
        assert_eq!(
            sink.extra.get("mount").unwrap().as_str(),
            Some("/stream.mp3")
        );
    }

    #[test]
    fn test_config_multiple_sinks() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[[sink]]
plugin = "json_file"
path = "/tmp/nowplaying.json"

[[sink]]
plugin = "icecast"
admin_url = "http://localhost:8000/admin/metadata"
mount = "/stream.mp3"
username = "admin"
password = "hackme"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.sinks.len(), 2);
        assert_eq!(config.sinks[0].plugin, "json_file");
        assert_eq!(config.sinks[1].plugin, "icecast");
    }

    #[test]
    fn test_config_null_provider_section() {
        let toml_str = r#"
[stream]
url = "http://localhost:8000/stream.mp3"

[recognizer]
provider = "null"

[recognizer.null]
title = "A"
artist = "B"
"#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.recognizer.provider, "null");
        let null = config.recognizer.null.unwrap();
        assert_eq!(null.title.as_deref(), Some("A"));
        assert_eq!(null.artist.as_deref(), Some("B"));
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = std::env::temp_dir().join("needle_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.toml");
        std::fs::write(
            &path,
            r#"
[general]
log_level = "warn"

[stream]
url = "http://localhost:8000/stream.mp3"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.general.log_level, "warn");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_load_from_file_not_found() {
        let result = AppConfig::load_from_file(std::path::Path::new("/nonexistent/path.toml"));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("failed to read config file"));
    }
}
