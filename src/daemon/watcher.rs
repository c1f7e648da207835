use notify::{EventKind, RecursiveMode, Watcher};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Watch the directory holding `settings` and report every write to that file.
pub fn start_config_watcher(settings: PathBuf) -> mpsc::Receiver<PathBuf> {
    let (watch_tx, watch_rx) = mpsc::channel::<PathBuf>(10);

    std::thread::spawn(move || {
        let Some(dir) = settings.parent().map(|p| p.to_path_buf()) else {
            error!(target: "g3dfreq::daemon", "Settings path {:?} has no parent", settings);
            return;
        };
        if !dir.is_dir() {
            warn!(target: "g3dfreq::daemon", "Config dir {:?} missing, settings watcher disabled", dir);
            return;
        }

        let tx = watch_tx;
        let target = settings.clone();
        let mut watcher = match notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| {
                if let Ok(event) = res
                    && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                    && event.paths.iter().any(|p| p.file_name() == target.file_name())
                {
                    debug!(target: "g3dfreq::daemon", "Settings file event: {:?}", event.kind);
                    let _ = tx.blocking_send(target.clone());
                }
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                error!(target: "g3dfreq::daemon", "Failed to create settings watcher: {}", e);
                return;
            }
        };

        if let Err(e) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
            error!(target: "g3dfreq::daemon", "Failed to watch {:?}: {}", dir, e);
            return;
        }

        info!(target: "g3dfreq::daemon", "Settings watcher started on {:?}", settings);
        loop {
            std::thread::sleep(std::time::Duration::from_secs(3600));
        }
    });

    watch_rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn reports_writes_to_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "").unwrap();

        let mut rx = start_config_watcher(path.clone());
        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, "[daemon]\npolling_ms = 50\n").unwrap();

        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, Some(path));
    }

    #[tokio::test]
    async fn missing_dir_closes_channel() {
        let mut rx = start_config_watcher(PathBuf::from("/nonexistent/g3dfreq/settings.toml"));
        let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(got, None);
    }
}
