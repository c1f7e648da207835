use crate::core::dvfs::Commit;
use crate::daemon::run::{Daemon, now_ms, update_current_clock_file};
use anyhow::Result;
use tracing::{debug, error};

impl Daemon {
    pub async fn tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);

        if let Err(e) = self.process_tick().await {
            let err_msg = e.to_string();
            let now = now_ms();

            let should_log = match &self.last_error {
                None => true,
                Some((last_msg, last_time)) => {
                    err_msg != *last_msg
                        || (now.saturating_sub(*last_time) >= self.cfg.error_debounce_ms)
                }
            };

            if should_log {
                error!(target: "g3dfreq::daemon", "Tick error: {:?}", e);
                self.last_error = Some((err_msg, now));
            } else {
                debug!(target: "g3dfreq::daemon", "Tick error suppressed: {:?}", e);
            }
        }
    }

    async fn process_tick(&mut self) -> Result<()> {
        let status = {
            let mut gov = self.governor.lock().await;
            if let Some(out) = gov.tick()
                && !matches!(out.commit, Commit::Steady)
            {
                debug!(
                    target: "g3dfreq::daemon",
                    "Tick #{} util={} candidate={} {:?}",
                    self.tick_count, out.utilization, out.candidate, out.commit
                );
            }
            gov.status()
        };

        if self.last.clock_mhz == Some(status.clock_mhz)
            && self.last.voltage_uv == Some(status.voltage_uv)
        {
            return Ok(());
        }

        update_current_clock_file(&self.cfg.state_file, status.clock_mhz, status.voltage_uv)?;
        self.last.clock_mhz = Some(status.clock_mhz);
        self.last.voltage_uv = Some(status.voltage_uv);
        Ok(())
    }
}
