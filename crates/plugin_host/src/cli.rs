//! Command-line interface handling for the plugin host.
//!
//! Options given here override the matching configuration file settings.

use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for plugin directory
    pub plugin_dir: Option<PathBuf>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Whether every configured plugin must match its version exactly
    pub exact_versions: bool,
    /// Optional override for the tick interval in milliseconds
    pub tick_interval_ms: Option<u64>,
}

/// Builds the clap command describing every option.
pub fn command() -> Command {
    Command::new("Plugin Host")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Loads plugins and drives their events and services")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("plugins")
                .short('p')
                .long("plugins")
                .value_name("DIR")
                .help("Plugin directory path"),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .help("Output logs in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("exact-versions")
                .long("exact-versions")
                .help("Require every configured plugin to match its version exactly")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tick-interval")
                .long("tick-interval")
                .value_name("MS")
                .help("Milliseconds between core.tick events (0 disables ticking)")
                .value_parser(clap::value_parser!(u64)),
        )
}

impl CliArgs {
    /// Parses the process arguments. Exits with a usage message on bad input.
    pub fn parse() -> Self {
        Self::from_matches(&command().get_matches())
    }

    /// Parses an explicit argument list, program name first.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("config.toml")),
            plugin_dir: matches.get_one::<String>("plugins").map(PathBuf::from),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            exact_versions: matches.get_flag("exact-versions"),
            tick_interval_ms: matches.get_one::<u64>("tick-interval").copied(),
        }
    }
}
