//! CLI argument definitions for dockermon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/dockermon/dockermon.toml";

/// Docker container event monitor.
///
/// Watches container lifecycle events and publishes Major/Clear alarms
/// to the alarm bus.
#[derive(Parser, Debug)]
#[command(name = "dockermon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to dockermon.toml configuration file.
    ///
    /// Defaults to /etc/dockermon/dockermon.toml; a missing default file
    /// falls back to built-in defaults, a missing explicit file is an error.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Configuration path to load, and whether it was given explicitly.
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_arguments() {
        let cli = DaemonCli::try_parse_from(["dockermon"]).unwrap();
        assert!(cli.config.is_none());
        assert!(!cli.validate);
        assert_eq!(
            cli.config_path(),
            (PathBuf::from(DEFAULT_CONFIG_PATH), false)
        );
    }

    #[test]
    fn explicit_config_and_overrides() {
        let cli = DaemonCli::try_parse_from([
            "dockermon",
            "-c",
            "/tmp/dm.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ])
        .unwrap();
        assert_eq!(cli.config_path(), (PathBuf::from("/tmp/dm.toml"), true));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(DaemonCli::try_parse_from(["dockermon", "--pid-file", "x"]).is_err());
    }
}
