use crate::common::{LogLevel, PowerMode};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Ping,
    Quit,
    Status,
    Table,
    TimeInState,
    ResetTimeInState,
    Force(u32),
    SetLog(LogLevel),
    Power(PowerMode),
}

impl FromStr for Command {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        match parts.as_slice() {
            ["HELP"] | ["?"] => Ok(Command::Help),
            ["PING"] => Ok(Command::Ping),
            ["QUIT"] => Ok(Command::Quit),
            ["STATUS"] => Ok(Command::Status),
            ["TABLE"] | ["GET_TABLE"] => Ok(Command::Table),
            ["TIME_IN_STATE"] | ["TIMEINSTATE"] => Ok(Command::TimeInState),
            ["RESET_TIME_IN_STATE"] | ["RESETTIMEINSTATE"] => Ok(Command::ResetTimeInState),
            ["AUTO"] => Ok(Command::Force(0)),

            ["FORCE", mhz] | ["FORCE_STEP", mhz] => match mhz.parse::<u32>() {
                Ok(val) => Ok(Command::Force(val)),
                Err(_) => Err("usage: FORCE <mhz> (0 = auto)"),
            },

            ["SETLOG", level] | ["SET_LOG", level] => LogLevel::from_str_ignore_case(level)
                .map(Command::SetLog)
                .ok_or("usage: SETLOG <DEBUG|INFO|WARN|ERROR>"),

            ["POWER", mode] => PowerMode::from_str_ignore_case(mode)
                .map(Command::Power)
                .ok_or("usage: POWER <ON|LIGHT_SLEEP|DEEP_SLEEP>"),

            _ => Err("unknown command (try HELP)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_commands() {
        assert_eq!("STATUS".parse::<Command>(), Ok(Command::Status));
        assert_eq!("?".parse::<Command>(), Ok(Command::Help));
        assert_eq!("  TIME_IN_STATE ".parse::<Command>(), Ok(Command::TimeInState));
        assert_eq!("AUTO".parse::<Command>(), Ok(Command::Force(0)));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!("FORCE 340".parse::<Command>(), Ok(Command::Force(340)));
        assert_eq!(
            "SETLOG debug".parse::<Command>(),
            Ok(Command::SetLog(LogLevel::Debug))
        );
        assert_eq!(
            "POWER DEEP_SLEEP".parse::<Command>(),
            Ok(Command::Power(PowerMode::DeepSleep))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!("FORCE fast".parse::<Command>().is_err());
        assert!("FORCE".parse::<Command>().is_err());
        assert!("POWER off".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
        assert!("REBOOT".parse::<Command>().is_err());
    }
}
