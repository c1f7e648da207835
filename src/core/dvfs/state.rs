/// Ticks a backoff must persist before it is committed.
pub const DEFAULT_HYSTERESIS: i32 = 5;
pub const DEFAULT_STEP: usize = 0;

/// Mutable governor bookkeeping.
///
/// `current_step` is what the hardware was last told to run at, `level` is the
/// step the selector currently asks for. The two differ only while a backoff
/// is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorState {
    pub current_step: usize,
    pub level: usize,
    pub stay_count: i32,
    hysteresis: i32,
}

impl GovernorState {
    pub fn new(default_step: usize, hysteresis: i32) -> Self {
        let hysteresis = hysteresis.max(1);
        Self {
            current_step: default_step,
            level: default_step,
            stay_count: hysteresis,
            hysteresis,
        }
    }

    pub fn hysteresis(&self) -> i32 {
        self.hysteresis
    }

    pub fn rearm(&mut self) {
        self.stay_count = self.hysteresis;
    }

    /// Back to `step` with a fresh hysteresis counter (deep sleep).
    pub fn reset(&mut self, step: usize) {
        self.current_step = step;
        self.level = step;
        self.rearm();
    }
}

impl Default for GovernorState {
    fn default() -> Self {
        Self::new(DEFAULT_STEP, DEFAULT_HYSTERESIS)
    }
}
