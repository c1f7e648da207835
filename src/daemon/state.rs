use crate::core::dvfs::Governor;
use std::sync::Arc;

/// The one lock every governor entry point goes through.
pub type SharedGovernor = Arc<tokio::sync::Mutex<Governor>>;

pub fn shared(governor: Governor) -> SharedGovernor {
    Arc::new(tokio::sync::Mutex::new(governor))
}

/// Last operating point mirrored to the state file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LastState {
    pub clock_mhz: Option<u32>,
    pub voltage_uv: Option<u32>,
}
