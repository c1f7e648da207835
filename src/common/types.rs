use serde::{Deserialize, Serialize};

/// Power state of the GPU as seen by the governor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerMode {
    On,
    LightSleep,
    DeepSleep,
}

impl PowerMode {
    pub fn from_str_ignore_case(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "on" => Some(Self::On),
            "light_sleep" | "lightsleep" | "light" => Some(Self::LightSleep),
            "deep_sleep" | "deepsleep" | "deep" => Some(Self::DeepSleep),
            _ => None,
        }
    }

    pub fn to_upper_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::LightSleep => "LIGHT_SLEEP",
            Self::DeepSleep => "DEEP_SLEEP",
        }
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for PowerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::LightSleep => write!(f, "light_sleep"),
            Self::DeepSleep => write!(f, "deep_sleep"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn from_str_ignore_case(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn to_upper_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    /// Directive for `EnvFilter`.
    pub fn filter_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.filter_str())
    }
}

/// One row of the time-in-state report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInStateEntry {
    pub clock_mhz: u32,
    pub time_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorStatus {
    pub power: PowerMode,
    pub step: usize,
    pub level: usize,
    pub clock_mhz: u32,
    pub voltage_uv: u32,
    pub forced_mhz: u32,
    pub stay_count: i32,
    pub utilization: u8,
    pub cpu_floor_locked: bool,
}

impl GovernorStatus {
    /// `KEY=VALUE` line used by the IPC `STATUS` reply.
    pub fn to_line(&self) -> String {
        format!(
            "POWER={} STEP={} LEVEL={} CLOCK={} VOLTAGE={} FORCED={} STAY={} UTIL={} CPU_LOCK={}",
            self.power.to_upper_str(),
            self.step,
            self.level,
            self.clock_mhz,
            self.voltage_uv,
            self.forced_mhz,
            self.stay_count,
            self.utilization,
            self.cpu_floor_locked
        )
    }
}
