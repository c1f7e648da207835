use super::hysteresis::Direction;
use super::table::OperatingPoint;
use crate::core::hw::{CpuFloor, GpuClock, StabilityProbe, VoltageRegulator};
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplierConfig {
    pub cpu_lock_enabled: bool,
    /// Steps at or above this clock hold the CPU floor.
    pub cpu_lock_threshold_mhz: u32,
    pub cpu_floor_mhz: u32,
    pub stable_wait: Duration,
    pub stable_poll: Duration,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            cpu_lock_enabled: true,
            cpu_lock_threshold_mhz: 440,
            cpu_floor_mhz: 400,
            stable_wait: Duration::from_millis(10),
            stable_poll: Duration::from_micros(100),
        }
    }
}

/// What actually happened on the hardware for one step change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub voltage_ok: bool,
    pub clock_ok: bool,
    pub stable: bool,
}

/// Drives clock, regulator and CPU floor for committed step changes.
pub struct StepApplier {
    clock: Box<dyn GpuClock>,
    regulator: Box<dyn VoltageRegulator>,
    cpu_floor: Box<dyn CpuFloor>,
    stability: Box<dyn StabilityProbe>,
    cfg: ApplierConfig,
    cpu_locked: bool,
    clock_mhz: u32,
    voltage_uv: u32,
}

impl StepApplier {
    pub fn new(
        clock: Box<dyn GpuClock>,
        regulator: Box<dyn VoltageRegulator>,
        cpu_floor: Box<dyn CpuFloor>,
        stability: Box<dyn StabilityProbe>,
        cfg: ApplierConfig,
    ) -> Self {
        Self {
            clock,
            regulator,
            cpu_floor,
            stability,
            cfg,
            cpu_locked: false,
            clock_mhz: 0,
            voltage_uv: 0,
        }
    }

    /// Boost raises voltage before clock, backoff lowers clock before voltage.
    pub fn apply(&mut self, op: &OperatingPoint, direction: Direction) -> ApplyReport {
        let (voltage_ok, clock_ok) = match direction {
            Direction::Up => {
                let v = self.set_voltage(op.voltage_uv);
                let c = self.set_clock(op.clock_mhz);
                (v, c)
            }
            Direction::Down => {
                let c = self.set_clock(op.clock_mhz);
                let v = self.set_voltage(op.voltage_uv);
                (v, c)
            }
        };

        self.update_cpu_floor(op.clock_mhz);
        let stable = self.wait_stable();

        ApplyReport {
            voltage_ok,
            clock_ok,
            stable,
        }
    }

    /// Power-on restore of a known operating point: voltage, then clock.
    pub fn resume(&mut self, op: &OperatingPoint) -> ApplyReport {
        let voltage_ok = self.set_voltage(op.voltage_uv);
        let clock_ok = self.set_clock(op.clock_mhz);
        self.update_cpu_floor(op.clock_mhz);
        ApplyReport {
            voltage_ok,
            clock_ok,
            stable: true,
        }
    }

    /// Re-program only the clock, keeping the current voltage.
    pub fn restore_clock(&mut self, mhz: u32) -> bool {
        self.set_clock(mhz)
    }

    pub fn clock_mhz(&self) -> u32 {
        self.clock_mhz
    }

    pub fn voltage_uv(&self) -> u32 {
        self.voltage_uv
    }

    pub fn cpu_floor_locked(&self) -> bool {
        self.cpu_locked
    }

    pub fn release_cpu_floor(&mut self) {
        if self.cpu_locked {
            match self.cpu_floor.unlock() {
                Ok(()) => {
                    self.cpu_locked = false;
                    debug!(target: "g3dfreq::governor", "CPU floor released");
                }
                Err(e) => error!(target: "g3dfreq::governor", ?e, "Failed to release CPU floor"),
            }
        }
    }

    fn set_voltage(&mut self, uv: u32) -> bool {
        match self.regulator.set_voltage(uv, uv) {
            Ok(()) => {
                debug!(target: "g3dfreq::governor", "Voltage set to {}uV", uv);
                self.voltage_uv = uv;
                true
            }
            Err(e) => {
                error!(target: "g3dfreq::governor", ?e, "Failed to set voltage {}uV", uv);
                false
            }
        }
    }

    fn set_clock(&mut self, mhz: u32) -> bool {
        match self.clock.set_clock(mhz) {
            Ok(()) => {
                debug!(target: "g3dfreq::governor", "Clock set to {}MHz", mhz);
                self.clock_mhz = mhz;
                true
            }
            Err(e) => {
                error!(target: "g3dfreq::governor", ?e, "Failed to set clock {}MHz", mhz);
                false
            }
        }
    }

    fn update_cpu_floor(&mut self, mhz: u32) {
        if !self.cfg.cpu_lock_enabled {
            return;
        }

        if mhz >= self.cfg.cpu_lock_threshold_mhz {
            if !self.cpu_locked {
                match self.cpu_floor.lock(self.cfg.cpu_floor_mhz) {
                    Ok(()) => {
                        self.cpu_locked = true;
                        info!(target: "g3dfreq::governor", "CPU floor locked at {}MHz", self.cfg.cpu_floor_mhz);
                    }
                    Err(e) => error!(target: "g3dfreq::governor", ?e, "Failed to lock CPU floor"),
                }
            }
        } else {
            self.release_cpu_floor();
        }
    }

    /// Bounded poll; running out of budget is logged and otherwise ignored.
    fn wait_stable(&mut self) -> bool {
        let poll = self.cfg.stable_poll;
        let attempts = (self.cfg.stable_wait.as_micros() / poll.as_micros().max(1)).max(1);

        for attempt in 0..attempts {
            match self.stability.is_stable() {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    warn!(target: "g3dfreq::governor", ?e, "Stability probe failed, not waiting");
                    return false;
                }
            }
            if attempt + 1 < attempts {
                std::thread::sleep(poll);
            }
        }

        warn!(
            target: "g3dfreq::governor",
            "Hardware not stable after {}us, continuing",
            self.cfg.stable_wait.as_micros()
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dvfs::table::DEFAULT_STEPS;
    use crate::core::hw::mock::{self, HwEvent, MockHandles};

    fn applier(cfg: ApplierConfig) -> (StepApplier, MockHandles) {
        let (p, h) = mock::platform();
        (
            StepApplier::new(p.clock, p.regulator, p.cpu_floor, p.stability, cfg),
            h,
        )
    }

    #[test]
    fn boost_sets_voltage_before_clock() {
        let (mut a, h) = applier(ApplierConfig::default());
        let report = a.apply(&DEFAULT_STEPS[1], Direction::Up);
        assert_eq!(
            h.take_events(),
            vec![
                HwEvent::Voltage(925_000, 925_000),
                HwEvent::Clock(300),
                HwEvent::StablePoll
            ]
        );
        assert!(report.voltage_ok && report.clock_ok && report.stable);
        assert_eq!(a.clock_mhz(), 300);
        assert_eq!(a.voltage_uv(), 925_000);
    }

    #[test]
    fn backoff_sets_clock_before_voltage() {
        let (mut a, h) = applier(ApplierConfig::default());
        a.apply(&DEFAULT_STEPS[0], Direction::Down);
        assert_eq!(
            h.take_events(),
            vec![
                HwEvent::Clock(266),
                HwEvent::Voltage(900_000, 900_000),
                HwEvent::StablePoll
            ]
        );
    }

    #[test]
    fn top_step_holds_cpu_floor_once() {
        let (mut a, h) = applier(ApplierConfig::default());
        a.apply(&DEFAULT_STEPS[3], Direction::Up);
        assert!(a.cpu_floor_locked());
        assert!(h.take_events().contains(&HwEvent::CpuLock(400)));

        a.apply(&DEFAULT_STEPS[3], Direction::Up);
        assert!(!h.take_events().contains(&HwEvent::CpuLock(400)));

        a.apply(&DEFAULT_STEPS[2], Direction::Down);
        assert!(!a.cpu_floor_locked());
        assert!(h.take_events().contains(&HwEvent::CpuUnlock));

        a.apply(&DEFAULT_STEPS[1], Direction::Down);
        assert!(!h.take_events().contains(&HwEvent::CpuUnlock));
    }

    #[test]
    fn disabled_cpu_lock_never_touches_floor() {
        let (mut a, h) = applier(ApplierConfig {
            cpu_lock_enabled: false,
            ..ApplierConfig::default()
        });
        a.apply(&DEFAULT_STEPS[3], Direction::Up);
        assert!(!h.take_events().contains(&HwEvent::CpuLock(400)));
    }

    #[test]
    fn hardware_failures_are_reported_not_raised() {
        let (mut a, h) = applier(ApplierConfig::default());
        *h.fail_clock.lock().unwrap() = true;
        let report = a.apply(&DEFAULT_STEPS[2], Direction::Up);
        assert!(report.voltage_ok);
        assert!(!report.clock_ok);
        assert_eq!(a.clock_mhz(), 0);
        assert_eq!(a.voltage_uv(), 950_000);
    }

    #[test]
    fn stability_wait_is_bounded() {
        let (mut a, h) = applier(ApplierConfig {
            stable_wait: Duration::from_micros(500),
            stable_poll: Duration::from_micros(100),
            ..ApplierConfig::default()
        });
        *h.stable_after.lock().unwrap() = None;
        let report = a.apply(&DEFAULT_STEPS[1], Direction::Up);
        assert!(!report.stable);
        let polls = h
            .take_events()
            .into_iter()
            .filter(|e| *e == HwEvent::StablePoll)
            .count();
        assert_eq!(polls, 5);
    }

    #[test]
    fn stability_wait_stops_when_settled() {
        let (mut a, h) = applier(ApplierConfig::default());
        *h.stable_after.lock().unwrap() = Some(3);
        assert!(a.apply(&DEFAULT_STEPS[1], Direction::Up).stable);
        let polls = h
            .take_events()
            .into_iter()
            .filter(|e| *e == HwEvent::StablePoll)
            .count();
        assert_eq!(polls, 3);
    }

    #[test]
    fn resume_restores_voltage_then_clock() {
        let (mut a, h) = applier(ApplierConfig::default());
        a.resume(&DEFAULT_STEPS[0]);
        assert_eq!(
            h.take_events(),
            vec![HwEvent::Voltage(900_000, 900_000), HwEvent::Clock(266)]
        );
    }

    #[test]
    fn resume_to_top_step_takes_cpu_floor() {
        let (mut a, h) = applier(ApplierConfig::default());
        a.resume(&DEFAULT_STEPS[3]);
        assert_eq!(
            h.take_events(),
            vec![
                HwEvent::Voltage(1_000_000, 1_000_000),
                HwEvent::Clock(440),
                HwEvent::CpuLock(400)
            ]
        );
        assert!(a.cpu_floor_locked());
    }

    #[test]
    fn voltage_failure_is_reported_and_clock_still_set() {
        let (mut a, h) = applier(ApplierConfig::default());
        *h.fail_voltage.lock().unwrap() = true;
        let report = a.apply(&DEFAULT_STEPS[2], Direction::Up);
        assert!(!report.voltage_ok);
        assert!(report.clock_ok);
        assert_eq!(a.voltage_uv(), 0);
        assert_eq!(a.clock_mhz(), 340);
    }
}
