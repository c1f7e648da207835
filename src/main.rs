use anyhow::{Context, Result};
use g3dfreq::common::LogLevel;
use g3dfreq::core::config;
use g3dfreq::daemon::run::{DaemonConfig, run_with_config};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let base_filter = EnvFilter::new("info");
    let (filter_layer, filter_handle) = reload::Layer::new(base_filter);
    let timer = tracing_subscriber::fmt::time::UtcTime::new(
        time::format_description::parse("[hour]:[minute]:[second]")
            .context("Invalid log time format")?,
    );

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_level(false)
                .with_timer(timer)
                .with_writer(std::io::stderr),
        )
        .init();

    let settings = config::load_settings()?;

    if let Some(lvl) = LogLevel::from_str_ignore_case(&settings.daemon.log_level)
        && lvl != LogLevel::Info
    {
        filter_handle
            .reload(EnvFilter::new(lvl.filter_str()))
            .context("Failed to apply configured log level")?;
    }

    tracing::info!(
        "g3dfreq v{} started (steps={}, polling={}ms, hysteresis={})",
        env!("CARGO_PKG_VERSION"),
        settings.steps.len(),
        settings.daemon.polling_ms,
        settings.governor.hysteresis
    );

    let cfg = DaemonConfig::new(settings);
    run_with_config(&cfg, filter_handle).await
}
