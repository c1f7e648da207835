use super::{StabilityProbe, UtilizationSource};

/// Reports the same load every tick.
pub struct FixedUtilization {
    value: u8,
}

impl FixedUtilization {
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

impl UtilizationSource for FixedUtilization {
    fn sample(&mut self) -> anyhow::Result<Option<u8>> {
        Ok(Some(self.value))
    }
}

pub struct AlwaysStable;

impl StabilityProbe for AlwaysStable {
    fn is_stable(&mut self) -> anyhow::Result<bool> {
        Ok(true)
    }
}
