use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "needledrop", about = "Now-playing recognition for live vinyl streams")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = needle_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("needledrop starting");

    // Build the recognition provider
    let registry = needle_recognize::ProviderRegistry::new();
    let mut recognizer = registry
        .create(&config.recognizer.provider)
        .with_context(|| {
            format!(
                "failed to create recognition provider '{}'",
                config.recognizer.provider
            )
        })?;

    let provider_config = match config.recognizer.provider.as_str() {
        "shazam" => match &config.recognizer.shazam {
            Some(shazam_cfg) => {
                toml::Value::try_from(shazam_cfg).context("failed to serialize shazam config")?
            }
            None => toml::Value::Table(Default::default()),
        },
        "null" => match &config.recognizer.null {
            Some(null_cfg) => {
                toml::Value::try_from(null_cfg).context("failed to serialize null config")?
            }
            None => toml::Value::Table(Default::default()),
        },
        _ => toml::Value::Table(Default::default()),
    };

    recognizer
        .initialize(provider_config)
        .await
        .with_context(|| {
            format!(
                "failed to initialize recognition provider '{}'",
                config.recognizer.provider
            )
        })?;
    tracing::info!("recognition provider '{}' active", config.recognizer.provider);

    // Build the sinks and start the fan-out host
    let (update_tx, update_rx) = tokio::sync::mpsc::unbounded_channel();
    let mut publisher_host = needle_publish::PublisherHost::new(update_rx);

    if config.sinks.is_empty() {
        tracing::warn!("no sinks configured; recognition results will only be logged");
    }
    for sink_cfg in &config.sinks {
        publisher_host
            .add_sink(&sink_cfg.plugin, sink_cfg.extra.clone())
            .await
            .with_context(|| format!("failed to add sink '{}'", sink_cfg.plugin))?;
        tracing::info!("sink '{}' active", sink_cfg.plugin);
    }
    publisher_host.start();

    // Build the stream source and the recognition loop
    let source = needle_capture::FfmpegSource::new(
        config.stream.url.as_str(),
        config.stream.capture_timeout(),
    );
    tracing::info!("sampling stream: {}", config.stream.url);

    let options = needle_engine::LoopOptions {
        sample_duration: config.stream.sample_duration(),
        poll_interval: config.poll.interval(),
        idle_interval: config.poll.idle_interval(),
        recognize_timeout: config.recognizer.timeout(),
        backoff_initial: config.poll.backoff_initial(),
        backoff_max: config.poll.backoff_max(),
        no_match: config.poll.no_match,
        gate_on_listeners: config
            .icecast
            .as_ref()
            .map(|i| i.gate_on_listeners)
            .unwrap_or(false),
    };

    let mut recognition_loop =
        needle_engine::RecognitionLoop::new(Box::new(source), recognizer, update_tx, options);

    if let Some(ref icecast_cfg) = config.icecast {
        let stats = needle_capture::StatsClient::new(icecast_cfg.stats_url.as_str())
            .context("failed to create icecast stats client")?;
        recognition_loop = recognition_loop.with_stats(Box::new(stats));
        tracing::info!("listener gating via {}", icecast_cfg.stats_url);
    }

    let loop_handle = recognition_loop.start();

    wait_for_shutdown_signal().await?;

    tracing::info!("shutting down");
    // Stopping the loop drops the update sender, which lets the host drain.
    loop_handle.shutdown().await;
    publisher_host.shutdown().await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.context("failed to listen for ctrl-c")?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")
}
