use crate::publisher::Publisher;
use crate::registry::SinkRegistry;
use needle_core::{NowPlaying, PublishError};
use tokio::sync::mpsc;

/// Owns the configured sinks and fans every [`NowPlaying`] update out to
/// all of them. A failing sink is logged and skipped; it never stalls the
/// recognition loop or the other sinks.
pub struct PublisherHost {
    registry: SinkRegistry,
    sinks: Vec<Box<dyn Publisher>>,
    update_rx: Option<mpsc::UnboundedReceiver<NowPlaying>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl PublisherHost {
    pub fn new(update_rx: mpsc::UnboundedReceiver<NowPlaying>) -> Self {
        Self {
            registry: SinkRegistry::new(),
            sinks: Vec::new(),
            update_rx: Some(update_rx),
            task_handle: None,
        }
    }

    pub async fn add_sink(
        &mut self,
        plugin_name: &str,
        config: toml::Value,
    ) -> Result<(), PublishError> {
        let mut sink = self.registry.create(plugin_name)?;
        sink.initialize(config).await?;
        self.sinks.push(sink);
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn start(&mut self) {
        let mut rx = self
            .update_rx
            .take()
            .expect("start() called but receiver already taken");
        let sinks = std::mem::take(&mut self.sinks);

        let handle = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                for sink in &sinks {
                    if let Err(e) = sink.publish(&update).await {
                        tracing::error!(
                            sink = %sink.name(),
                            status = ?update.status,
                            "publish failed: {e}"
                        );
                    }
                }
            }
            for sink in &sinks {
                if let Err(e) = sink.shutdown().await {
                    tracing::warn!(sink = %sink.name(), "sink shutdown failed: {e}");
                }
            }
        });

        self.task_handle = Some(handle);
    }

    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
    }
}
