use crate::Result;
use crate::core::dvfs::OperatingPoint;
use anyhow::Context;

pub fn print_status(response: &str) {
    println!("       g3dfreq Daemon Status     ");

    if response.is_empty() {
        println!("No response from daemon\n");
        return;
    }

    println!("Daemon: Running\n");
    for line in format_status(response) {
        println!("{}", line);
    }
    println!();
}

pub(crate) fn format_status(response: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (key, value) in response
        .split_whitespace()
        .filter_map(|kv| kv.split_once('='))
    {
        match key {
            "POWER" => out.push(format!("    Power:    {}", value)),
            "STEP" => out.push(format!("    Step:     {}", value)),
            "CLOCK" => out.push(format!("    Clock:    {} MHz", value)),
            "VOLTAGE" => out.push(format!("    Voltage:  {} uV", value)),
            "FORCED" => {
                let mode = if value == "0" {
                    "auto".to_string()
                } else {
                    format!("{} MHz", value)
                };
                out.push(format!("    Forced:   {}", mode));
            }
            "STAY" => out.push(format!("    Backoff:  {} ticks", value)),
            "UTIL" => out.push(format!("    Util:     {}/255", value)),
            "CPU_LOCK" => {
                let icon = if value == "true" { "✓" } else { "✗" };
                out.push(format!("  {} CPU floor", icon));
            }
            "LOG_LEVEL" => out.push(format!("    Log:      {}", value)),
            _ => {}
        }
    }
    out
}

pub fn print_table(response: &str) -> Result<()> {
    let steps: Vec<OperatingPoint> =
        serde_json::from_str(response).context("Malformed TABLE reply")?;
    println!("  STEP   CLOCK     VOLTAGE   DOWN%  UP%");
    for (i, op) in steps.iter().enumerate() {
        println!(
            "  {:>4}  {:>4} MHz  {:>7} uV  {:>4}  {:>3}",
            i, op.clock_mhz, op.voltage_uv, op.down_threshold_pct, op.up_threshold_pct
        );
    }
    Ok(())
}

pub fn print_time_in_state(response: &str) {
    for line in response.lines() {
        if let Some((clock, ms)) = line.split_once(' ') {
            println!("  {:>4} MHz  {:>10} ms", clock, ms);
        }
    }
}

pub fn print_daemon_stopped() {
    println!("       g3dfreq Daemon Status      ");
    println!(" Daemon: Not running\n");
}

pub fn print_success(message: &str) {
    println!(" {}", message);
}

pub fn print_error(message: &str) {
    eprintln!(" Error: {}", message);
}
