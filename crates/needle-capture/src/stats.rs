use async_trait::async_trait;
use needle_core::CaptureError;
use std::time::Duration;

const USER_AGENT: &str = concat!("needledrop/", env!("CARGO_PKG_VERSION"));
const STATS_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of the stream's current audience size, used to gate recognition
/// on whether anyone is actually listening.
#[async_trait]
pub trait ListenerStats: Send + Sync {
    /// Total listener count across all mounts.
    async fn listener_count(&self) -> Result<u64, CaptureError>;
}

/// [`ListenerStats`] backed by the Icecast stats endpoint (status-json.xsl).
pub struct StatsClient {
    http: reqwest::Client,
    stats_url: String,
}

impl StatsClient {
    pub fn new(stats_url: impl Into<String>) -> Result<Self, CaptureError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(STATS_TIMEOUT)
            .build()
            .map_err(|e| CaptureError::Stats(e.to_string()))?;

        Ok(Self {
            http,
            stats_url: stats_url.into(),
        })
    }
}

#[async_trait]
impl ListenerStats for StatsClient {
    async fn listener_count(&self) -> Result<u64, CaptureError> {
        let response = self
            .http
            .get(&self.stats_url)
            .send()
            .await
            .map_err(|e| CaptureError::Stats(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CaptureError::Stats(format!("HTTP {}", status.as_u16())));
        }

        let stats: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CaptureError::Stats(e.to_string()))?;

        Ok(count_listeners(&stats))
    }
}

/// Sum `listeners` over the stats document. Icecast reports `source` as a
/// single object when one mount exists and as an array otherwise.
fn count_listeners(stats: &serde_json::Value) -> u64 {
    let source = &stats["icestats"]["source"];
    match source {
        serde_json::Value::Array(sources) => sources
            .iter()
            .filter_map(|s| s["listeners"].as_u64())
            .sum(),
        serde_json::Value::Object(_) => source["listeners"].as_u64().unwrap_or(0),
        _ => 0,
    }
}
