//! Command-line surface

use crate::session::TimeBudget;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "urfu-vpn")]
#[command(about = "Connect UrFU VPN")]
#[command(version)]
pub struct Cli {
    /// Your UrFU login
    #[arg(value_name = "LOGIN", value_parser = parse_login)]
    pub login: String,

    /// Connect time, in minutes. Use "inf" to connect without time limit
    #[arg(long, default_value = "90", value_name = "MINUTES")]
    pub connect_time: TimeBudget,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file [default: ./urfu-vpn.toml, then ~/.urfu-vpn/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

fn parse_login(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("login cannot be empty".to_string());
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["urfu-vpn", "student"]).unwrap();

        assert_eq!(cli.login, "student");
        assert_eq!(cli.connect_time, TimeBudget::minutes(90));
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_empty_login_rejected() {
        for login in ["", "   ", "\t"] {
            assert!(
                Cli::try_parse_from(["urfu-vpn", login]).is_err(),
                "accepted {:?}",
                login
            );
        }
    }

    #[test]
    fn test_missing_login_rejected() {
        assert!(Cli::try_parse_from(["urfu-vpn"]).is_err());
    }

    #[test]
    fn test_connect_time_values() {
        let cli = Cli::try_parse_from(["urfu-vpn", "student", "--connect-time", "inf"]).unwrap();
        assert_eq!(cli.connect_time, TimeBudget::Unbounded);

        let cli = Cli::try_parse_from(["urfu-vpn", "student", "--connect-time", "0"]).unwrap();
        assert_eq!(cli.connect_time, TimeBudget::Unbounded);

        let cli = Cli::try_parse_from(["urfu-vpn", "--connect-time", "45", "student"]).unwrap();
        assert_eq!(cli.connect_time, TimeBudget::minutes(45));
    }

    #[test]
    fn test_bad_connect_time_rejected() {
        let result = Cli::try_parse_from(["urfu-vpn", "student", "--connect-time", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_and_config() {
        let cli =
            Cli::try_parse_from(["urfu-vpn", "-v", "student", "--config", "vpn.toml"]).unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("vpn.toml")));
    }
}
