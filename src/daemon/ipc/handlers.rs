use super::commands::Command;
use super::server::IpcHandles;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

pub const BANNER: &str = "OK G3DFREQ IPC";

const MAX_LINE: u64 = 256;

const HELP: &str = "CMDS:
        - HELP | ?
        - PING
        - QUIT
        - STATUS
        - TABLE
        - TIME_IN_STATE
        - RESET_TIME_IN_STATE
        - FORCE <mhz>   (0 = auto)
        - AUTO
        - SETLOG <DEBUG|INFO|WARN|ERROR>
        - POWER <ON|LIGHT_SLEEP|DEEP_SLEEP>
 ";

/// Handle a single IPC client connection.
pub async fn handle_client(stream: UnixStream, h: IpcHandles) -> Result<()> {
    let (r, mut w) = stream.into_split();
    let mut reader = BufReader::new(r);
    let mut buf = Vec::new();
    w.write_all(format!("{}\n", BANNER).as_bytes()).await?;

    loop {
        buf.clear();
        // One byte of slack for the newline.
        let n = (&mut reader)
            .take(MAX_LINE + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            break;
        }
        if n as u64 > MAX_LINE && buf.last() != Some(&b'\n') {
            // Drain the rest of the line in bounded chunks.
            loop {
                buf.clear();
                let m = (&mut reader)
                    .take(MAX_LINE)
                    .read_until(b'\n', &mut buf)
                    .await?;
                if m == 0 || buf.last() == Some(&b'\n') {
                    break;
                }
            }
            w.write_all(b"ERR input too long\n").await?;
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        let s = line.trim();
        if s.len() > MAX_LINE as usize {
            w.write_all(b"ERR input too long\n").await?;
            continue;
        }
        let resp = match s.parse::<Command>() {
            Ok(Command::Help) => HELP.to_string(),
            Ok(Command::Ping) => "PONG\n".into(),
            Ok(Command::Quit) => {
                w.write_all(b"BYE\n").await?;
                break;
            }
            Ok(Command::Status) => {
                let status = h.governor.lock().await.status();
                let log_level = match h.current_log_level.read() {
                    Ok(l) => l.to_upper_str().to_string(),
                    Err(_) => "UNKNOWN".to_string(),
                };
                format!("{} LOG_LEVEL={}\n", status.to_line(), log_level)
            }
            Ok(Command::Table) => {
                let steps = h.governor.lock().await.table().steps().to_vec();
                match serde_json::to_string(&steps) {
                    Ok(json) => format!("{}\n", json),
                    Err(e) => format!("ERR TABLE {:?}\n", e),
                }
            }
            Ok(Command::TimeInState) => {
                let rows = h.governor.lock().await.read_time_in_state();
                rows.iter()
                    .map(|r| format!("{} {}\n", r.clock_mhz, r.time_ms))
                    .collect::<String>()
            }
            Ok(Command::ResetTimeInState) => {
                h.governor.lock().await.reset_time_in_state();
                "OK RESET_TIME_IN_STATE\n".into()
            }
            Ok(Command::Force(mhz)) => {
                let mut gov = h.governor.lock().await;
                match gov.force_step(mhz) {
                    Some(step) => format!(
                        "OK FORCE {} STEP={} CLOCK={}\n",
                        mhz,
                        step,
                        gov.table().get(step).clock_mhz
                    ),
                    None => "OK AUTO\n".into(),
                }
            }
            Ok(Command::SetLog(lvl)) => {
                (h.set_log_level)(lvl);
                "OK SET_LOG\n".into()
            }
            Ok(Command::Power(mode)) => {
                h.governor.lock().await.set_power_mode(mode);
                debug!(target: "g3dfreq::ipc", "Power mode set to {} via IPC", mode);
                format!("OK POWER {}\n", mode.to_upper_str())
            }
            Err(e) => format!("ERR {}\n", e),
        };
        if !resp.is_empty() {
            w.write_all(resp.as_bytes()).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{LogLevel, PowerMode};
    use crate::core::dvfs::{DvfsTable, Governor, GovernorConfig};
    use crate::core::hw::mock::{self, MockHandles};
    use crate::daemon::state::{SharedGovernor, shared};
    use std::sync::{Arc, RwLock};

    fn handles() -> (IpcHandles, SharedGovernor, MockHandles) {
        let (platform, mh) = mock::platform();
        let mut gov = Governor::new(DvfsTable::default(), GovernorConfig::default(), platform);
        gov.start();
        let governor = shared(gov);
        let level = Arc::new(RwLock::new(LogLevel::Info));
        let level_clone = level.clone();
        let h = IpcHandles {
            governor: governor.clone(),
            set_log_level: Arc::new(move |lvl| {
                if let Ok(mut l) = level_clone.write() {
                    *l = lvl;
                }
            }),
            current_log_level: level,
        };
        (h, governor, mh)
    }

    async fn exchange(h: IpcHandles, script: &str) -> String {
        let (mut client, server) = UnixStream::pair().unwrap();
        let task = tokio::spawn(handle_client(server, h));
        client.write_all(script.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();
        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        task.await.unwrap().unwrap();
        out
    }

    #[tokio::test]
    async fn greets_and_answers_ping() {
        let (h, _, _) = handles();
        let out = exchange(h, "PING\nQUIT\nPING\n").await;
        assert_eq!(out, format!("{}\nPONG\nBYE\n", BANNER));
    }

    #[tokio::test]
    async fn force_then_status() {
        let (h, gov, _) = handles();
        let out = exchange(h, "FORCE 350\nSTATUS\n").await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "OK FORCE 350 STEP=2 CLOCK=340");
        assert!(lines[2].contains("FORCED=350"));
        assert!(lines[2].ends_with("LOG_LEVEL=INFO"));
        assert_eq!(gov.lock().await.forced_mhz(), 350);
    }

    #[tokio::test]
    async fn auto_clears_forced_clock() {
        let (h, gov, _) = handles();
        gov.lock().await.force_step(440);
        let out = exchange(h, "AUTO\n").await;
        assert!(out.ends_with("OK AUTO\n"));
        assert_eq!(gov.lock().await.forced_mhz(), 0);
    }

    #[tokio::test]
    async fn time_in_state_lists_every_step() {
        let (h, _, mh) = handles();
        mh.advance(std::time::Duration::from_millis(120));
        let out = exchange(h, "TIME_IN_STATE\n").await;
        let rows: Vec<&str> = out.lines().skip(1).collect();
        assert_eq!(rows, vec!["266 120", "300 0", "340 0", "440 0"]);
    }

    #[tokio::test]
    async fn reset_and_table() {
        let (h, _, mh) = handles();
        mh.advance(std::time::Duration::from_millis(500));
        let out = exchange(h, "RESET_TIME_IN_STATE\nTIME_IN_STATE\nTABLE\n").await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[1], "OK RESET_TIME_IN_STATE");
        assert_eq!(lines[2], "266 0");
        let table: Vec<serde_json::Value> = serde_json::from_str(lines[6]).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table[3]["clock_mhz"], 440);
    }

    #[tokio::test]
    async fn set_log_and_power() {
        let (h, gov, _) = handles();
        let level = h.current_log_level.clone();
        let out = exchange(h, "SETLOG warn\nPOWER LIGHT_SLEEP\n").await;
        assert!(out.contains("OK SET_LOG\n"));
        assert!(out.contains("OK POWER LIGHT_SLEEP\n"));
        assert_eq!(*level.read().unwrap(), LogLevel::Warn);
        assert_eq!(gov.lock().await.power_mode(), PowerMode::LightSleep);
    }

    #[tokio::test]
    async fn overlong_line_is_rejected_and_session_continues() {
        let (h, _, _) = handles();
        let mut script = "A".repeat(10_000);
        script.push_str("\nPING\n");
        let out = exchange(h, &script).await;
        assert_eq!(out, format!("{}\nERR input too long\nPONG\n", BANNER));
    }

    #[tokio::test]
    async fn unterminated_flood_does_not_stall() {
        let (h, _, _) = handles();
        let out = exchange(h, &"B".repeat(50_000)).await;
        assert_eq!(out, format!("{}\nERR input too long\n", BANNER));
    }

    #[tokio::test]
    async fn reports_parse_errors() {
        let (h, _, _) = handles();
        let out = exchange(h, "FORCE fast\n").await;
        assert!(out.ends_with("ERR usage: FORCE <mhz> (0 = auto)\n"));
    }
}
