use super::{app::*, client::IpcClient, output};
use crate::Result;
use crate::common::SOCKET_PATH;
use anyhow::bail;

pub async fn execute(cli: Cli) -> Result<()> {
    let socket = cli.socket.as_deref().unwrap_or(SOCKET_PATH);
    let client = IpcClient::with_path(socket);

    if !matches!(cli.command, Commands::Status | Commands::Ping) && !client.is_alive().await {
        bail!("Daemon is not running");
    }

    match cli.command {
        Commands::Status => {
            handle_status(&client).await?;
        }

        Commands::Table => {
            let resp = client.send("TABLE").await?;
            output::print_table(&resp)?;
        }

        Commands::TimeInState => {
            let resp = client.send("TIME_IN_STATE").await?;
            output::print_time_in_state(&resp);
        }

        Commands::ResetTimeInState => {
            let resp = client.send("RESET_TIME_IN_STATE").await?;
            report(&resp, "Time-in-state cleared")?;
        }

        Commands::Force { mhz } => {
            let resp = client.send(&format!("FORCE {}", mhz)).await?;
            report(&resp, &format!("Forced: {}", resp))?;
        }

        Commands::Auto => {
            let resp = client.send("AUTO").await?;
            report(&resp, "Utilization driven")?;
        }

        Commands::SetLog { level } => {
            let cmd = format!("SET_LOG {}", level.to_upper_str());
            let resp = client.send(&cmd).await?;
            report(&resp, &format!("Log level set: {}", level.to_upper_str()))?;
        }

        Commands::Power { mode } => {
            let cmd = format!("POWER {}", mode.to_upper_str());
            let resp = client.send(&cmd).await?;
            report(&resp, &format!("Power mode: {}", mode.to_upper_str()))?;
        }

        Commands::Ping => {
            if client.ping().await? {
                output::print_success("Daemon is alive (PONG)");
            } else {
                output::print_error("Daemon not responding");
            }
        }
    }

    Ok(())
}

fn report(resp: &str, success: &str) -> Result<()> {
    if let Some(err) = resp.strip_prefix("ERR ") {
        bail!("Daemon rejected command: {}", err);
    }
    output::print_success(success);
    Ok(())
}

async fn handle_status(client: &IpcClient) -> Result<()> {
    if !client.is_alive().await {
        output::print_daemon_stopped();
        return Ok(());
    }

    let response = client.send("STATUS").await?;
    output::print_status(&response);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_reply_becomes_error() {
        let err = report("ERR usage: FORCE <mhz> (0 = auto)", "ok").unwrap_err();
        assert!(err.to_string().contains("usage: FORCE"));
        assert!(report("OK AUTO", "ok").is_ok());
    }
}
