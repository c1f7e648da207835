use super::settings::Settings;
use crate::common::CONFIG_DIR;
use std::path::PathBuf;

pub fn settings_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("settings.toml")
}

/// Settings from [`settings_path`], or built-in defaults when the file is absent.
pub fn load_settings() -> anyhow::Result<Settings> {
    let path = settings_path();
    if !path.exists() {
        tracing::info!(
            target: "g3dfreq::daemon",
            "{} not found, using built-in DVFS table",
            path.display()
        );
        return Ok(Settings::default());
    }
    Settings::load(path)
}
