use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "g3dfreqctl")]
#[command(version, about = "g3dfreq daemon control CLI")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[arg(short, long, global = true)]
    pub socket: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Current step, clock, voltage and power mode
    Status,
    /// Operating-point table
    Table,
    /// Cumulative time spent at each clock
    TimeInState,
    ResetTimeInState,

    /// Pin the highest clock at or below MHZ (0 = auto)
    Force {
        mhz: u32,
    },
    Auto,

    SetLog {
        #[arg(value_enum)]
        level: LogLevel,
    },

    Power {
        #[arg(value_enum)]
        mode: PowerMode,
    },

    Ping,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_upper_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

#[derive(Clone, ValueEnum)]
pub enum PowerMode {
    On,
    LightSleep,
    DeepSleep,
}

impl PowerMode {
    pub fn to_upper_str(&self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::LightSleep => "LIGHT_SLEEP",
            Self::DeepSleep => "DEEP_SLEEP",
        }
    }
}
