use crate::common::STATE_FILE;
use crate::core::config::Settings;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub settings: Settings,
    /// File mirroring the committed clock and voltage, empty to disable.
    pub state_file: String,
    pub error_debounce_ms: u128,
}

impl DaemonConfig {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            state_file: STATE_FILE.to_string(),
            error_debounce_ms: 30_000,
        }
    }

    pub fn socket_path(&self) -> &str {
        &self.settings.daemon.socket_path
    }
}
