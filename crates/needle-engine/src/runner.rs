use needle_capture::{AudioSource, ListenerStats};
use needle_core::{
    Backoff, CaptureError, NoMatchPolicy, NowPlaying, PlayStatus, RecognizeError, TrackInfo,
};
use needle_recognize::Recognizer;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Tunables for the recognition loop. Values come from the `[stream]` and
/// `[poll]` config sections; nothing here is hard-coded at the call sites.
#[derive(Debug, Clone)]
pub struct LoopOptions {
    pub sample_duration: Duration,
    pub poll_interval: Duration,
    pub idle_interval: Duration,
    pub recognize_timeout: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub no_match: NoMatchPolicy,
    pub gate_on_listeners: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            sample_duration: Duration::from_secs(8),
            poll_interval: Duration::from_secs(30),
            idle_interval: Duration::from_secs(15),
            recognize_timeout: Duration::from_secs(20),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            no_match: NoMatchPolicy::Clear,
            gate_on_listeners: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CycleError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Recognize(#[from] RecognizeError),
}

/// The unattended sample → recognize → publish loop.
///
/// One cycle runs at a time: the capture and the provider call are awaited
/// sequentially, so at most one recognition request is ever in flight.
/// Every per-cycle failure is absorbed here and turned into a backoff
/// delay; the loop only exits through [`LoopHandle::shutdown`].
pub struct RecognitionLoop {
    source: Box<dyn AudioSource>,
    recognizer: Box<dyn Recognizer>,
    update_tx: mpsc::UnboundedSender<NowPlaying>,
    stats: Option<Box<dyn ListenerStats>>,
    options: LoopOptions,
}

/// Controls a started [`RecognitionLoop`].
pub struct LoopHandle {
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl LoopHandle {
    /// Signal the loop to stop and wait for the in-progress cycle to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl RecognitionLoop {
    pub fn new(
        source: Box<dyn AudioSource>,
        recognizer: Box<dyn Recognizer>,
        update_tx: mpsc::UnboundedSender<NowPlaying>,
        options: LoopOptions,
    ) -> Self {
        Self {
            source,
            recognizer,
            update_tx,
            stats: None,
            options,
        }
    }

    /// Enable listener gating against a stream stats source.
    pub fn with_stats(mut self, stats: Box<dyn ListenerStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn start(self) -> LoopHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        LoopHandle { shutdown_tx, task }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut backoff = Backoff::new(self.options.backoff_initial, self.options.backoff_max);
        let mut last_track: Option<TrackInfo> = None;
        // Assume an audience until the stats endpoint says otherwise.
        let mut had_listeners = true;

        tracing::info!(
            source = %self.source.describe(),
            provider = %self.recognizer.name(),
            "recognition loop started"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if let Some(listeners) = self.gated_listener_count().await {
                if listeners == 0 {
                    if had_listeners {
                        tracing::info!("no active listeners, pausing recognition");
                        self.send(NowPlaying::status_only(PlayStatus::Paused));
                        had_listeners = false;
                    }
                    if sleep_or_shutdown(self.options.idle_interval, &mut shutdown_rx).await {
                        break;
                    }
                    continue;
                }
                if !had_listeners {
                    tracing::info!(listeners, "first listener detected");
                    self.send(NowPlaying::status_only(PlayStatus::Detecting));
                    had_listeners = true;
                }
            }

            let delay = match self.run_cycle(&mut last_track).await {
                Ok(()) => {
                    backoff.reset();
                    self.options.poll_interval
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        retry_in_secs = delay.as_secs(),
                        "recognition cycle failed: {e}"
                    );
                    delay
                }
            };

            if sleep_or_shutdown(delay, &mut shutdown_rx).await {
                break;
            }
        }

        tracing::info!("recognition loop stopped");
    }

    /// One poll cycle: capture a clip, submit it, publish the outcome.
    async fn run_cycle(&self, last_track: &mut Option<TrackInfo>) -> Result<(), CycleError> {
        let clip = self.source.capture(self.options.sample_duration).await?;

        let outcome = tokio::time::timeout(
            self.options.recognize_timeout,
            self.recognizer.recognize(&clip),
        )
        .await
        .map_err(|_| RecognizeError::Timeout)??;

        match outcome {
            Some(track) => {
                if last_track.as_ref() == Some(&track) {
                    tracing::debug!("track unchanged, skipping publish");
                } else {
                    tracing::info!(artist = %track.artist, title = %track.title, "now playing");
                    self.send(NowPlaying::playing(track.clone()));
                    *last_track = Some(track);
                }
            }
            None => match self.options.no_match {
                NoMatchPolicy::Retain => {
                    tracing::debug!("no match, retaining previous record");
                }
                NoMatchPolicy::Clear => {
                    tracing::info!("no match, clearing now-playing record");
                    *last_track = None;
                    self.send(NowPlaying::status_only(PlayStatus::Unknown));
                }
            },
        }
        Ok(())
    }

    /// Listener count when gating applies, `None` to skip the gate.
    /// A failing stats endpoint fails open: the loop keeps recognizing.
    async fn gated_listener_count(&self) -> Option<u64> {
        if !self.options.gate_on_listeners {
            return None;
        }
        let stats = self.stats.as_ref()?;
        match stats.listener_count().await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!("could not fetch stream stats: {e}");
                None
            }
        }
    }

    fn send(&self, update: NowPlaying) {
        if self.update_tx.send(update).is_err() {
            tracing::debug!("update receiver dropped");
        }
    }
}

/// Returns `true` when shutdown was signalled during the sleep.
async fn sleep_or_shutdown(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        res = shutdown_rx.changed() => res.is_err() || *shutdown_rx.borrow(),
    }
}
