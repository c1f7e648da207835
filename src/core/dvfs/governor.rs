use super::applier::{ApplierConfig, ApplyReport, StepApplier};
use super::hysteresis::{Commit, Direction, commit, commit_forced};
use super::selector::{select_candidate, select_forced};
use super::state::{DEFAULT_HYSTERESIS, DEFAULT_STEP, GovernorState};
use super::table::DvfsTable;
use super::time_in_state::TimeInState;
use crate::common::{GovernorStatus, PowerMode, TimeInStateEntry};
use crate::core::hw::{Clock, Platform, UtilizationSource};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorConfig {
    pub default_step: usize,
    /// Operating point restored on power-on when nothing faster is active.
    pub resume_step: usize,
    pub hysteresis: i32,
    pub applier: ApplierConfig,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            default_step: DEFAULT_STEP,
            resume_step: DEFAULT_STEP,
            hysteresis: DEFAULT_HYSTERESIS,
            applier: ApplierConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub utilization: u8,
    pub candidate: usize,
    pub commit: Commit,
    pub report: Option<ApplyReport>,
}

pub struct Governor {
    table: DvfsTable,
    state: GovernorState,
    applier: StepApplier,
    utilization: Box<dyn UtilizationSource>,
    time: Box<dyn Clock>,
    time_in_state: TimeInState,
    default_step: usize,
    resume_step: usize,
    forced_mhz: u32,
    power: PowerMode,
    last_utilization: u8,
    sample_failing: bool,
    /// Set when deep sleep moved the step without touching the hardware.
    step_reset: bool,
}

impl Governor {
    pub fn new(table: DvfsTable, cfg: GovernorConfig, platform: Platform) -> Self {
        let Platform {
            utilization,
            clock,
            regulator,
            cpu_floor,
            stability,
            time,
        } = platform;

        let default_step = table.wrap(cfg.default_step);
        let resume_step = table.wrap(cfg.resume_step);
        let time_in_state = TimeInState::new(table.len(), time.now());

        Self {
            state: GovernorState::new(default_step, cfg.hysteresis),
            applier: StepApplier::new(clock, regulator, cpu_floor, stability, cfg.applier),
            utilization,
            time,
            time_in_state,
            default_step,
            resume_step,
            forced_mhz: 0,
            power: PowerMode::DeepSleep,
            last_utilization: 255,
            sample_failing: false,
            step_reset: false,
            table,
        }
    }

    /// Program the default operating point and start accepting ticks.
    pub fn start(&mut self) {
        let op = *self.table.get(self.default_step);
        let report = self.applier.resume(&op);
        info!(
            target: "g3dfreq::governor",
            "Governor started at {}MHz / {}uV (table: {})",
            op.clock_mhz,
            op.voltage_uv,
            self.table.freq_list()
        );
        if !(report.clock_ok && report.voltage_ok) {
            warn!(target: "g3dfreq::governor", "Initial operating point only partially applied");
        }
        self.power = PowerMode::On;
    }

    /// One polling period. Returns `None` while the GPU is not powered.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if !self.power.is_on() {
            return None;
        }

        let utilization = self.sample_utilization();

        let (candidate, (state, decision)) = if self.forced_mhz != 0 {
            let target = select_forced(&self.table, self.forced_mhz);
            (target, commit_forced(self.state, target))
        } else {
            let target = select_candidate(&self.table, &self.state, utilization);
            (target, commit(self.state, target))
        };
        self.state = state;

        let report = match decision {
            Commit::Change {
                from,
                to,
                direction,
            } => Some(self.change_step(from, to, direction)),
            Commit::Pending { remaining } => {
                debug!(
                    target: "g3dfreq::governor",
                    "util={} backoff to step {} pending ({} ticks left)",
                    utilization, candidate, remaining
                );
                None
            }
            Commit::Steady => None,
        };

        Some(TickOutcome {
            utilization,
            candidate,
            commit: decision,
            report,
        })
    }

    /// Force the highest step at or below `mhz`; 0 hands control back to utilization.
    pub fn force_step(&mut self, mhz: u32) -> Option<usize> {
        self.forced_mhz = mhz;
        if mhz == 0 {
            info!(target: "g3dfreq::governor", "Forced clock cleared, utilization driven");
            return None;
        }

        let step = select_forced(&self.table, mhz);
        info!(
            target: "g3dfreq::governor",
            "Forced clock {}MHz -> step {} ({}MHz)",
            mhz,
            step,
            self.table.get(step).clock_mhz
        );
        Some(step)
    }

    pub fn read_time_in_state(&mut self) -> Vec<TimeInStateEntry> {
        let now = self.time.now();
        self.time_in_state.accrue(self.state.current_step, now);
        self.time_in_state.entries(&self.table)
    }

    pub fn reset_time_in_state(&mut self) {
        let now = self.time.now();
        self.time_in_state.reset(now);
        debug!(target: "g3dfreq::governor", "Time-in-state counters cleared");
    }

    pub fn set_power_mode(&mut self, mode: PowerMode) {
        if mode == self.power {
            return;
        }

        match mode {
            PowerMode::On => {
                self.power_on();
                info!(target: "g3dfreq::governor", "GPU powered on from {}", self.power);
            }
            PowerMode::LightSleep | PowerMode::DeepSleep => {
                if mode == PowerMode::DeepSleep {
                    let now = self.time.now();
                    self.time_in_state.accrue(self.state.current_step, now);
                    self.applier.release_cpu_floor();
                    self.state.reset(self.default_step);
                    self.step_reset = true;
                }
                info!(target: "g3dfreq::governor", "GPU entering {}", mode);
            }
        }
        self.power = mode;
    }

    /// Teardown: drop the CPU floor and park in deep sleep.
    pub fn shutdown(&mut self) {
        self.applier.release_cpu_floor();
        self.set_power_mode(PowerMode::DeepSleep);
    }

    pub fn status(&self) -> GovernorStatus {
        let op = self.table.get(self.state.current_step);
        GovernorStatus {
            power: self.power,
            step: self.state.current_step,
            level: self.state.level,
            clock_mhz: op.clock_mhz,
            voltage_uv: op.voltage_uv,
            forced_mhz: self.forced_mhz,
            stay_count: self.state.stay_count,
            utilization: self.last_utilization,
            cpu_floor_locked: self.applier.cpu_floor_locked(),
        }
    }

    pub fn table(&self) -> &DvfsTable {
        &self.table
    }

    pub fn state(&self) -> GovernorState {
        self.state
    }

    pub fn power_mode(&self) -> PowerMode {
        self.power
    }

    pub fn forced_mhz(&self) -> u32 {
        self.forced_mhz
    }

    fn change_step(&mut self, from: usize, to: usize, direction: Direction) -> ApplyReport {
        let now = self.time.now();
        self.time_in_state.accrue(from, now);

        let op = *self.table.get(to);
        let report = self.applier.apply(&op, direction);
        self.state.current_step = self.table.wrap(to);

        info!(
            target: "g3dfreq::governor",
            "{} {}MHz -> {}MHz ({}uV, util={})",
            match direction {
                Direction::Up => "Boost",
                Direction::Down => "Backoff",
            },
            self.table.get(from).clock_mhz,
            op.clock_mhz,
            op.voltage_uv,
            self.last_utilization
        );
        report
    }

    fn power_on(&mut self) {
        let current = *self.table.get(self.state.current_step);
        let resume = *self.table.get(self.resume_step);

        if self.forced_mhz != 0 || current.clock_mhz >= resume.clock_mhz {
            if self.step_reset {
                self.applier.resume(&current);
            } else {
                self.applier.restore_clock(current.clock_mhz);
            }
        } else {
            self.applier.resume(&resume);
            let now = self.time.now();
            self.time_in_state.accrue(self.state.current_step, now);
            self.state.reset(self.resume_step);
        }
        self.step_reset = false;
    }

    /// Failed or empty samples keep the previous value.
    fn sample_utilization(&mut self) -> u8 {
        match self.utilization.sample() {
            Ok(Some(u)) => {
                if self.sample_failing {
                    info!(target: "g3dfreq::governor", "Utilization source recovered");
                    self.sample_failing = false;
                }
                self.last_utilization = u;
            }
            Ok(None) => {}
            Err(e) => {
                if self.sample_failing {
                    debug!(target: "g3dfreq::governor", ?e, "Utilization sample failed");
                } else {
                    warn!(target: "g3dfreq::governor", ?e, "Utilization sample failed, reusing {}", self.last_utilization);
                    self.sample_failing = true;
                }
            }
        }
        self.last_utilization
    }
}
