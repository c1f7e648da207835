use crate::common::LogLevel;
use crate::core::config::{Settings, settings_path};
use crate::core::dvfs::Governor;
use crate::core::hw::Platform;
use crate::daemon::state::{LastState, SharedGovernor, shared};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::{signal as ctrl, time};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

pub use crate::daemon::config::DaemonConfig;

pub type ReloadHandle =
    tracing_subscriber::reload::Handle<tracing_subscriber::EnvFilter, tracing_subscriber::Registry>;

#[inline]
pub(crate) fn now_ms() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_e| {
            tracing::warn!(
                target: "g3dfreq::daemon",
                "Daemon | System clock error (using fallback)"
            );
            Duration::from_secs(0)
        })
        .as_millis()
}

/// Mirror the committed operating point as `"<mhz> <uv>\n"`. Empty path disables it.
pub(crate) fn update_current_clock_file(path: &str, clock_mhz: u32, voltage_uv: u32) -> Result<()> {
    if path.is_empty() {
        return Ok(());
    }
    if let Some(dir) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    std::fs::write(path, format!("{} {}\n", clock_mhz, voltage_uv))
        .with_context(|| format!("Failed to update {}", path))?;
    debug!(target: "g3dfreq::daemon", "Updated {} to {}MHz / {}uV", path, clock_mhz, voltage_uv);
    Ok(())
}

fn apply_log_level(
    handle: Option<&ReloadHandle>,
    current: &RwLock<LogLevel>,
    lvl: LogLevel,
) {
    if let Ok(mut l) = current.write() {
        *l = lvl;
    }
    let Some(handle) = handle else {
        return;
    };
    match handle.reload(EnvFilter::new(lvl.filter_str())) {
        Ok(_) => debug!(target: "g3dfreq::daemon", "Log level changed to {}", lvl),
        Err(e) => error!(target: "g3dfreq::daemon", "Failed to change log level: {}", e),
    }
}

pub struct Daemon {
    pub(crate) cfg: DaemonConfig,
    pub(crate) governor: SharedGovernor,
    pub(crate) last: LastState,
    pub(crate) last_error: Option<(String, u128)>,
    pub(crate) tick_count: u64,
    pub(crate) polling: Duration,
    filter_handle: Option<ReloadHandle>,
    current_log_level: Arc<RwLock<LogLevel>>,
}

impl Daemon {
    pub fn new(cfg: DaemonConfig, governor: Governor, filter_handle: Option<ReloadHandle>) -> Self {
        let level = LogLevel::from_str_ignore_case(&cfg.settings.daemon.log_level).unwrap_or_else(|| {
            warn!(
                target: "g3dfreq::daemon",
                "Unknown log_level {:?}, using INFO",
                cfg.settings.daemon.log_level
            );
            LogLevel::Info
        });

        Self {
            polling: cfg.settings.polling_interval(),
            cfg,
            governor: shared(governor),
            last: LastState::default(),
            last_error: None,
            tick_count: 0,
            filter_handle,
            current_log_level: Arc::new(RwLock::new(level)),
        }
    }

    pub(crate) fn reload_settings(&mut self, path: &Path) {
        match Settings::load(path) {
            Ok(new_settings) => self.apply_settings(new_settings),
            Err(e) => {
                error!(target: "g3dfreq::daemon", "Failed to reload settings: {:?}", e);
            }
        }
    }

    /// Polling period and log level apply live; table and sysfs changes wait for a restart.
    pub(crate) fn apply_settings(&mut self, new_settings: Settings) {
        let polling = new_settings.polling_interval();
        if polling != self.polling {
            info!(
                target: "g3dfreq::daemon",
                "Settings reloaded. Polling {}ms -> {}ms",
                self.polling.as_millis(),
                polling.as_millis()
            );
            self.polling = polling;
        }

        if new_settings.daemon.log_level != self.cfg.settings.daemon.log_level {
            match LogLevel::from_str_ignore_case(&new_settings.daemon.log_level) {
                Some(lvl) => apply_log_level(
                    self.filter_handle.as_ref(),
                    &self.current_log_level,
                    lvl,
                ),
                None => warn!(
                    target: "g3dfreq::daemon",
                    "Ignoring unknown log_level {:?}",
                    new_settings.daemon.log_level
                ),
            }
        }

        if new_settings.steps != self.cfg.settings.steps
            || new_settings.paths != self.cfg.settings.paths
            || new_settings.governor != self.cfg.settings.governor
            || new_settings.cpu != self.cfg.settings.cpu
        {
            warn!(target: "g3dfreq::daemon", "Governor settings changed; restart the daemon to apply");
        }

        self.cfg.settings = new_settings;
    }

    pub async fn init_ipc(&self) {
        let log_level_clone = self.current_log_level.clone();
        let handle = self.filter_handle.clone();
        let set_log_level = Arc::new(move |lvl| {
            apply_log_level(handle.as_ref(), &log_level_clone, lvl);
        });

        let ipc_handles = crate::daemon::ipc::IpcHandles {
            governor: self.governor.clone(),
            set_log_level,
            current_log_level: self.current_log_level.clone(),
        };

        let path = self.cfg.socket_path().to_string();
        tokio::spawn(async move {
            debug!(target: "g3dfreq::daemon", "Starting IPC socket listener...");
            match crate::daemon::ipc::start(&path, ipc_handles).await {
                Ok(_) => info!(target: "g3dfreq::daemon", "IPC    | Listener stopped"),
                Err(e) => error!(target: "g3dfreq::daemon", "IPC    | Error: {:?}", e),
            }
        });
    }

    async fn shutdown(&mut self) {
        self.governor.lock().await.shutdown();
        let _ = std::fs::remove_file(self.cfg.socket_path());
    }
}

pub async fn run_with_config(cfg: &DaemonConfig, filter_handle: ReloadHandle) -> Result<()> {
    let settings = &cfg.settings;
    let platform = Platform::from_sysfs(&settings.paths);
    let mut governor = Governor::new(settings.table()?, settings.governor_config(), platform);
    governor.start();

    let mut daemon = Daemon::new(cfg.clone(), governor, Some(filter_handle));

    daemon.init_ipc().await;

    tokio::time::sleep(time::Duration::from_millis(200)).await;
    debug!(target: "g3dfreq::daemon", "IPC socket ready at {}", daemon.cfg.socket_path());

    let mut watch_rx = crate::daemon::watcher::start_config_watcher(settings_path());
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    debug!(target: "g3dfreq::daemon", "Tick loop started ({}ms)", daemon.polling.as_millis());

    daemon.tick().await;

    loop {
        tokio::select! {
            _ = time::sleep(daemon.polling) => {
                daemon.tick().await;
            }
            Some(path) = watch_rx.recv() => {
                daemon.reload_settings(&path);
            }
            _ = ctrl::ctrl_c() => {
                info!(target: "g3dfreq::daemon", "Daemon | Received Ctrl-C, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!(target: "g3dfreq::daemon", "Daemon | Received SIGTERM, shutting down");
                break;
            }
        }
    }

    daemon.shutdown().await;
    info!(target: "g3dfreq::daemon", "Daemon | Stopped");
    Ok(())
}
