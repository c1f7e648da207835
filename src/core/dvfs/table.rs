use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Full scale of the utilization sample.
pub const UTILIZATION_MAX: u32 = 255;

/// One DVFS step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub clock_mhz: u32,
    pub voltage_uv: u32,
    pub down_threshold_pct: u8,
    pub up_threshold_pct: u8,
}

impl OperatingPoint {
    pub const fn new(
        clock_mhz: u32,
        voltage_uv: u32,
        down_threshold_pct: u8,
        up_threshold_pct: u8,
    ) -> Self {
        Self {
            clock_mhz,
            voltage_uv,
            down_threshold_pct,
            up_threshold_pct,
        }
    }

    /// Up threshold on the 0..=255 utilization scale.
    pub fn up_threshold(&self) -> u32 {
        UTILIZATION_MAX * u32::from(self.up_threshold_pct) / 100
    }

    /// Down threshold on the 0..=255 utilization scale.
    pub fn down_threshold(&self) -> u32 {
        UTILIZATION_MAX * u32::from(self.down_threshold_pct) / 100
    }
}

pub const DEFAULT_STEPS: [OperatingPoint; 4] = [
    OperatingPoint::new(266, 900_000, 0, 70),
    OperatingPoint::new(300, 925_000, 65, 85),
    OperatingPoint::new(340, 950_000, 80, 95),
    OperatingPoint::new(440, 1_000_000, 90, 100),
];

/// Immutable step table, ascending by clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DvfsTable {
    steps: Vec<OperatingPoint>,
}

impl DvfsTable {
    pub fn new(steps: Vec<OperatingPoint>) -> Result<Self> {
        if steps.is_empty() {
            bail!("DVFS table must contain at least one step");
        }

        for (i, op) in steps.iter().enumerate() {
            if op.up_threshold_pct > 100 {
                bail!(
                    "step {} ({}MHz): up threshold {}% exceeds 100%",
                    i,
                    op.clock_mhz,
                    op.up_threshold_pct
                );
            }
            if op.down_threshold_pct > op.up_threshold_pct {
                bail!(
                    "step {} ({}MHz): down threshold {}% above up threshold {}%",
                    i,
                    op.clock_mhz,
                    op.down_threshold_pct,
                    op.up_threshold_pct
                );
            }
        }

        if let Some(w) = steps.windows(2).find(|w| w[0].clock_mhz >= w[1].clock_mhz) {
            bail!(
                "DVFS table clocks must be strictly ascending ({}MHz before {}MHz)",
                w[0].clock_mhz,
                w[1].clock_mhz
            );
        }

        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn max_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Out-of-range indices wrap around the table size.
    pub fn wrap(&self, index: usize) -> usize {
        index % self.steps.len()
    }

    pub fn get(&self, index: usize) -> &OperatingPoint {
        &self.steps[self.wrap(index)]
    }

    pub fn steps(&self) -> &[OperatingPoint] {
        &self.steps
    }

    /// Highest step whose clock does not exceed `mhz`, scanning from the top.
    /// Falls back to step 0 when nothing qualifies.
    pub fn highest_at_or_below(&self, mhz: u32) -> usize {
        self.steps
            .iter()
            .rposition(|op| op.clock_mhz <= mhz)
            .unwrap_or(0)
    }

    /// Space separated clocks, highest first.
    pub fn freq_list(&self) -> String {
        self.steps
            .iter()
            .rev()
            .map(|op| op.clock_mhz.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for DvfsTable {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS.to_vec(),
        }
    }
}
