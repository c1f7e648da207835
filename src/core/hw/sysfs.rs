use super::{CpuFloor, GpuClock, StabilityProbe, UtilizationSource, VoltageRegulator};
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::PathBuf;

/// Reads either a plain `0..=255` load value or a `busy total` counter pair.
pub struct SysfsUtilization {
    path: PathBuf,
    last_busy: u64,
    last_total: u64,
}

impl SysfsUtilization {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_busy: 0,
            last_total: 0,
        }
    }
}

impl UtilizationSource for SysfsUtilization {
    fn sample(&mut self) -> Result<Option<u8>> {
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let parts: Vec<u64> = data
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();

        match parts.as_slice() {
            [load] => Ok(Some((*load).min(255) as u8)),
            [busy, total, ..] => {
                let (busy, total) = (*busy, *total);
                if busy < self.last_busy || total < self.last_total || self.last_total == 0 {
                    tracing::debug!(target: "g3dfreq::hw", "GPU busy counters (re)initialised");
                    self.last_busy = busy;
                    self.last_total = total;
                    return Ok(None);
                }

                let delta_busy = busy - self.last_busy;
                let delta_total = total - self.last_total;
                self.last_busy = busy;
                self.last_total = total;

                if delta_total == 0 {
                    return Ok(None);
                }
                let util = (delta_busy.min(delta_total) * 255) / delta_total;
                Ok(Some(util as u8))
            }
            [] => bail!("Unrecognised utilization format: {:?}", data.trim()),
        }
    }
}

pub struct SysfsClock {
    path: PathBuf,
    scale: u64,
}

impl SysfsClock {
    /// `scale` converts MHz into the unit the node expects (1_000_000 for Hz).
    pub fn new(path: impl Into<PathBuf>, scale: u64) -> Self {
        Self {
            path: path.into(),
            scale: scale.max(1),
        }
    }
}

impl GpuClock for SysfsClock {
    fn set_clock(&mut self, mhz: u32) -> Result<()> {
        let value = u64::from(mhz) * self.scale;
        fs::write(&self.path, value.to_string())
            .with_context(|| format!("Cannot set GPU clock to {}MHz", mhz))
    }
}

/// Writes `min max` in microvolts.
pub struct SysfsRegulator {
    path: PathBuf,
}

impl SysfsRegulator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VoltageRegulator for SysfsRegulator {
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<()> {
        fs::write(&self.path, format!("{} {}", min_uv, max_uv))
            .with_context(|| format!("Cannot set GPU voltage to {}uV", min_uv))
    }
}

/// Raises `scaling_min_freq` and restores the previous value on unlock.
pub struct SysfsCpuFloor {
    path: PathBuf,
    saved_khz: Option<String>,
}

impl SysfsCpuFloor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            saved_khz: None,
        }
    }
}

impl CpuFloor for SysfsCpuFloor {
    fn lock(&mut self, mhz: u32) -> Result<()> {
        if self.saved_khz.is_none() {
            let current = fs::read_to_string(&self.path)
                .with_context(|| format!("Failed to read {}", self.path.display()))?;
            self.saved_khz = Some(current.trim().to_string());
        }
        fs::write(&self.path, (u64::from(mhz) * 1000).to_string())
            .with_context(|| format!("Cannot lock CPU floor at {}MHz", mhz))
    }

    fn unlock(&mut self) -> Result<()> {
        match self.saved_khz.take() {
            Some(khz) => fs::write(&self.path, &khz)
                .with_context(|| format!("Cannot restore CPU floor to {}kHz", khz)),
            None => Ok(()),
        }
    }
}

/// Hardware is settled while `value & busy_mask == 0`.
pub struct SysfsStability {
    path: PathBuf,
    busy_mask: u32,
}

impl SysfsStability {
    pub fn new(path: impl Into<PathBuf>, busy_mask: u32) -> Self {
        Self {
            path: path.into(),
            busy_mask,
        }
    }
}

impl StabilityProbe for SysfsStability {
    fn is_stable(&mut self) -> Result<bool> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let value = parse_register(&raw)?;
        Ok(value & self.busy_mask == 0)
    }
}

fn parse_register(raw: &str) -> Result<u32> {
    let s = raw.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.with_context(|| format!("Invalid register value: {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_load_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utilization");
        fs::write(&path, "300\n").unwrap();
        let mut src = SysfsUtilization::new(&path);
        assert_eq!(src.sample().unwrap(), Some(255));
        fs::write(&path, "128").unwrap();
        assert_eq!(src.sample().unwrap(), Some(128));
    }

    #[test]
    fn counter_pair_uses_deltas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gpubusy");
        fs::write(&path, "100 1000").unwrap();
        let mut src = SysfsUtilization::new(&path);
        assert_eq!(src.sample().unwrap(), None);
        fs::write(&path, "600 2000").unwrap();
        assert_eq!(src.sample().unwrap(), Some(127));
        fs::write(&path, "10 20").unwrap();
        assert_eq!(src.sample().unwrap(), None);
    }

    #[test]
    fn clock_and_regulator_write_values() {
        let dir = tempfile::tempdir().unwrap();
        let clk = dir.path().join("clock");
        let vol = dir.path().join("voltage");
        SysfsClock::new(&clk, 1_000_000).set_clock(340).unwrap();
        SysfsRegulator::new(&vol).set_voltage(950_000, 950_000).unwrap();
        assert_eq!(fs::read_to_string(&clk).unwrap(), "340000000");
        assert_eq!(fs::read_to_string(&vol).unwrap(), "950000 950000");
    }

    #[test]
    fn cpu_floor_restores_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaling_min_freq");
        fs::write(&path, "200000\n").unwrap();
        let mut floor = SysfsCpuFloor::new(&path);
        floor.lock(400).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "400000");
        floor.unlock().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "200000");
        floor.unlock().unwrap();
    }

    #[test]
    fn stability_checks_busy_bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clk_div_stat");
        fs::write(&path, "0x8001").unwrap();
        let mut probe = SysfsStability::new(&path, 0x8000);
        assert!(!probe.is_stable().unwrap());
        fs::write(&path, "1").unwrap();
        assert!(probe.is_stable().unwrap());
        fs::write(&path, "garbage").unwrap();
        assert!(probe.is_stable().is_err());
    }
}
