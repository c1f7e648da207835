use crate::common::SOCKET_PATH;
use crate::core::dvfs::table::{DEFAULT_STEPS, DvfsTable, OperatingPoint};
use crate::core::dvfs::{ApplierConfig, GovernorConfig};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub daemon: DaemonSettings,
    #[serde(default)]
    pub governor: GovernorSettings,
    #[serde(default)]
    pub cpu: CpuSettings,
    #[serde(default)]
    pub paths: SysfsPaths,
    #[serde(default = "default_steps")]
    pub steps: Vec<OperatingPoint>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DaemonSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_polling_ms")]
    pub polling_ms: u64,

    #[serde(default = "default_socket_path")]
    pub socket_path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GovernorSettings {
    #[serde(default)]
    pub default_step: usize,

    #[serde(default)]
    pub resume_step: usize,

    #[serde(default = "default_hysteresis")]
    pub hysteresis: i32,

    #[serde(default = "default_stable_wait_ms")]
    pub stable_wait_ms: u64,

    #[serde(default = "default_stable_poll_us")]
    pub stable_poll_us: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CpuSettings {
    #[serde(default = "default_true")]
    pub lock_enabled: bool,

    #[serde(default = "default_lock_threshold")]
    pub lock_threshold_mhz: u32,

    #[serde(default = "default_floor")]
    pub floor_mhz: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SysfsPaths {
    #[serde(default = "default_utilization_path")]
    pub utilization: String,

    #[serde(default = "default_clock_path")]
    pub clock: String,

    /// Multiplier from MHz to the unit the clock node expects.
    #[serde(default = "default_clock_scale")]
    pub clock_scale: u64,

    #[serde(default = "default_voltage_path")]
    pub voltage: String,

    #[serde(default = "default_cpu_min_freq_path")]
    pub cpu_min_freq: String,

    #[serde(default = "default_stable_status_path")]
    pub stable_status: String,

    #[serde(default = "default_busy_mask")]
    pub stable_busy_mask: u32,
}

impl Settings {
    /// Load settings from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read {}", path.display()))?;

        let settings = Self::parse(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings.toml")
    }

    pub fn validate(&self) -> Result<()> {
        let table = self.table()?;
        if self.governor.default_step >= table.len() {
            bail!(
                "default_step {} out of range (table has {} steps)",
                self.governor.default_step,
                table.len()
            );
        }
        if self.governor.resume_step >= table.len() {
            bail!(
                "resume_step {} out of range (table has {} steps)",
                self.governor.resume_step,
                table.len()
            );
        }
        if self.governor.hysteresis < 1 {
            bail!("hysteresis must be at least 1 tick");
        }
        if self.daemon.polling_ms == 0 {
            bail!("polling_ms must be non-zero");
        }
        Ok(())
    }

    pub fn table(&self) -> Result<DvfsTable> {
        DvfsTable::new(self.steps.clone()).context("Invalid [[steps]] table")
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.daemon.polling_ms)
    }

    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig {
            default_step: self.governor.default_step,
            resume_step: self.governor.resume_step,
            hysteresis: self.governor.hysteresis,
            applier: ApplierConfig {
                cpu_lock_enabled: self.cpu.lock_enabled,
                cpu_lock_threshold_mhz: self.cpu.lock_threshold_mhz,
                cpu_floor_mhz: self.cpu.floor_mhz,
                stable_wait: Duration::from_millis(self.governor.stable_wait_ms),
                stable_poll: Duration::from_micros(self.governor.stable_poll_us),
            },
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daemon: DaemonSettings::default(),
            governor: GovernorSettings::default(),
            cpu: CpuSettings::default(),
            paths: SysfsPaths::default(),
            steps: default_steps(),
        }
    }
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            polling_ms: default_polling_ms(),
            socket_path: default_socket_path(),
        }
    }
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            default_step: 0,
            resume_step: 0,
            hysteresis: default_hysteresis(),
            stable_wait_ms: default_stable_wait_ms(),
            stable_poll_us: default_stable_poll_us(),
        }
    }
}

impl Default for CpuSettings {
    fn default() -> Self {
        Self {
            lock_enabled: true,
            lock_threshold_mhz: default_lock_threshold(),
            floor_mhz: default_floor(),
        }
    }
}

impl Default for SysfsPaths {
    fn default() -> Self {
        Self {
            utilization: default_utilization_path(),
            clock: default_clock_path(),
            clock_scale: default_clock_scale(),
            voltage: default_voltage_path(),
            cpu_min_freq: default_cpu_min_freq_path(),
            stable_status: default_stable_status_path(),
            stable_busy_mask: default_busy_mask(),
        }
    }
}

fn default_steps() -> Vec<OperatingPoint> {
    DEFAULT_STEPS.to_vec()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_polling_ms() -> u64 {
    100
}

fn default_socket_path() -> String {
    SOCKET_PATH.to_string()
}

fn default_hysteresis() -> i32 {
    5
}

fn default_stable_wait_ms() -> u64 {
    10
}

fn default_stable_poll_us() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_lock_threshold() -> u32 {
    440
}

fn default_floor() -> u32 {
    400
}

fn default_utilization_path() -> String {
    "/sys/devices/platform/mali.0/utilization".to_string()
}

fn default_clock_path() -> String {
    "/sys/devices/platform/mali.0/clock".to_string()
}

fn default_clock_scale() -> u64 {
    1_000_000
}

fn default_voltage_path() -> String {
    "/sys/devices/platform/mali.0/vol".to_string()
}

fn default_cpu_min_freq_path() -> String {
    "/sys/devices/system/cpu/cpu0/cpufreq/scaling_min_freq".to_string()
}

fn default_stable_status_path() -> String {
    "/sys/devices/platform/mali.0/clk_div_stat".to_string()
}

fn default_busy_mask() -> u32 {
    0x8000
}
