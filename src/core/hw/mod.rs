mod dummy;
#[cfg(test)]
pub(crate) mod mock;
mod sysfs;

pub use dummy::{AlwaysStable, FixedUtilization};
pub use sysfs::{SysfsClock, SysfsCpuFloor, SysfsRegulator, SysfsStability, SysfsUtilization};

use crate::core::config::SysfsPaths;
use anyhow::Result;
use std::path::Path;
use std::time::Instant;

/// GPU busy-ness on a 0..=255 scale. `None` means no fresh sample yet.
pub trait UtilizationSource: Send {
    fn sample(&mut self) -> Result<Option<u8>>;
}

pub trait GpuClock: Send {
    fn set_clock(&mut self, mhz: u32) -> Result<()>;
}

pub trait VoltageRegulator: Send {
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<()>;
}

/// Keeps the CPU from throttling below a floor while the GPU runs hot.
pub trait CpuFloor: Send {
    fn lock(&mut self, mhz: u32) -> Result<()>;
    fn unlock(&mut self) -> Result<()>;
}

/// Clock divider status: `true` once the hardware reports the change settled.
pub trait StabilityProbe: Send {
    fn is_stable(&mut self) -> Result<bool>;
}

pub trait Clock: Send {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Every collaborator the governor needs, wired once by the daemon.
pub struct Platform {
    pub utilization: Box<dyn UtilizationSource>,
    pub clock: Box<dyn GpuClock>,
    pub regulator: Box<dyn VoltageRegulator>,
    pub cpu_floor: Box<dyn CpuFloor>,
    pub stability: Box<dyn StabilityProbe>,
    pub time: Box<dyn Clock>,
}

impl Platform {
    pub fn from_sysfs(paths: &SysfsPaths) -> Self {
        Self {
            utilization: create_utilization_source(paths),
            clock: Box::new(SysfsClock::new(&paths.clock, paths.clock_scale)),
            regulator: Box::new(SysfsRegulator::new(&paths.voltage)),
            cpu_floor: Box::new(SysfsCpuFloor::new(&paths.cpu_min_freq)),
            stability: create_stability_probe(paths),
            time: Box::new(SystemClock),
        }
    }
}

pub fn create_utilization_source(paths: &SysfsPaths) -> Box<dyn UtilizationSource> {
    if Path::new(&paths.utilization).exists() {
        tracing::debug!(target: "g3dfreq::hw", "Utilization source: {}", paths.utilization);
        Box::new(SysfsUtilization::new(&paths.utilization))
    } else {
        tracing::warn!(
            target: "g3dfreq::hw",
            "Utilization node {} missing, using fixed full-load source",
            paths.utilization
        );
        Box::new(FixedUtilization::new(255))
    }
}

pub fn create_stability_probe(paths: &SysfsPaths) -> Box<dyn StabilityProbe> {
    if Path::new(&paths.stable_status).exists() {
        Box::new(SysfsStability::new(&paths.stable_status, paths.stable_busy_mask))
    } else {
        tracing::warn!(
            target: "g3dfreq::hw",
            "Clock status node {} missing, skipping stability wait",
            paths.stable_status
        );
        Box::new(AlwaysStable)
    }
}
