use super::{Clock, CpuFloor, GpuClock, Platform, StabilityProbe, UtilizationSource, VoltageRegulator};
use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HwEvent {
    Clock(u32),
    Voltage(u32, u32),
    CpuLock(u32),
    CpuUnlock,
    StablePoll,
}

/// Shared handles into a mock platform.
#[derive(Clone)]
pub struct MockHandles {
    pub events: Arc<Mutex<Vec<HwEvent>>>,
    pub samples: Arc<Mutex<VecDeque<u8>>>,
    pub fail_clock: Arc<Mutex<bool>>,
    pub fail_voltage: Arc<Mutex<bool>>,
    pub stable_after: Arc<Mutex<Option<usize>>>,
    pub now: Arc<Mutex<Instant>>,
}

impl MockHandles {
    pub fn push_samples(&self, samples: &[u8]) {
        self.samples.lock().unwrap().extend(samples.iter().copied());
    }

    pub fn take_events(&self) -> Vec<HwEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

struct MockUtilization(Arc<Mutex<VecDeque<u8>>>);

impl UtilizationSource for MockUtilization {
    fn sample(&mut self) -> Result<Option<u8>> {
        Ok(self.0.lock().unwrap().pop_front())
    }
}

struct MockClock {
    events: Arc<Mutex<Vec<HwEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl GpuClock for MockClock {
    fn set_clock(&mut self, mhz: u32) -> Result<()> {
        self.events.lock().unwrap().push(HwEvent::Clock(mhz));
        if *self.fail.lock().unwrap() {
            bail!("clk_set_rate failed");
        }
        Ok(())
    }
}

struct MockRegulator {
    events: Arc<Mutex<Vec<HwEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl VoltageRegulator for MockRegulator {
    fn set_voltage(&mut self, min_uv: u32, max_uv: u32) -> Result<()> {
        self.events.lock().unwrap().push(HwEvent::Voltage(min_uv, max_uv));
        if *self.fail.lock().unwrap() {
            bail!("regulator_set_voltage failed");
        }
        Ok(())
    }
}

struct MockCpuFloor(Arc<Mutex<Vec<HwEvent>>>);

impl CpuFloor for MockCpuFloor {
    fn lock(&mut self, mhz: u32) -> Result<()> {
        self.0.lock().unwrap().push(HwEvent::CpuLock(mhz));
        Ok(())
    }

    fn unlock(&mut self) -> Result<()> {
        self.0.lock().unwrap().push(HwEvent::CpuUnlock);
        Ok(())
    }
}

struct MockStability {
    events: Arc<Mutex<Vec<HwEvent>>>,
    stable_after: Arc<Mutex<Option<usize>>>,
    polls: usize,
}

impl StabilityProbe for MockStability {
    fn is_stable(&mut self) -> Result<bool> {
        self.events.lock().unwrap().push(HwEvent::StablePoll);
        self.polls += 1;
        Ok(match *self.stable_after.lock().unwrap() {
            Some(n) => {
                let ready = self.polls >= n;
                if ready {
                    self.polls = 0;
                }
                ready
            }
            None => false,
        })
    }
}

struct ManualClock(Arc<Mutex<Instant>>);

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock().unwrap()
    }
}

/// Platform whose hardware settles on the first poll.
pub fn platform() -> (Platform, MockHandles) {
    let handles = MockHandles {
        events: Arc::default(),
        samples: Arc::default(),
        fail_clock: Arc::default(),
        fail_voltage: Arc::default(),
        stable_after: Arc::new(Mutex::new(Some(1))),
        now: Arc::new(Mutex::new(Instant::now())),
    };

    let platform = Platform {
        utilization: Box::new(MockUtilization(handles.samples.clone())),
        clock: Box::new(MockClock {
            events: handles.events.clone(),
            fail: handles.fail_clock.clone(),
        }),
        regulator: Box::new(MockRegulator {
            events: handles.events.clone(),
            fail: handles.fail_voltage.clone(),
        }),
        cpu_floor: Box::new(MockCpuFloor(handles.events.clone())),
        stability: Box::new(MockStability {
            events: handles.events.clone(),
            stable_after: handles.stable_after.clone(),
            polls: 0,
        }),
        time: Box::new(ManualClock(handles.now.clone())),
    };

    (platform, handles)
}
