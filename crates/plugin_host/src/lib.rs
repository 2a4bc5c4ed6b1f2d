//! # Plugin Host
//!
//! Standalone host for `plugin_runtime`. It reads a TOML configuration,
//! loads the listed plugin libraries from the plugin directory, drives the
//! built-in `core.tick` and `core.stats` events, and unloads everything on
//! shutdown.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration
//! plugin_host
//!
//! # Specify custom configuration
//! plugin_host --config production.toml
//!
//! # Override specific settings
//! plugin_host --plugins /opt/host/plugins --log-level debug --tick-interval 16
//!
//! # Refuse anything but the configured plugin versions
//! plugin_host --exact-versions
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [host]
//! name = "plugin_host"
//! network_role = "host"
//! tick_interval_ms = 50
//!
//! [plugins]
//! directory = "plugins"
//! delimiter = "."
//!
//! [[plugins.load]]
//! name = "greeter"
//! version = "1.0.0"
//! version_policy = "minimum"
//!
//! [logging]
//! level = "info"
//! json_format = false
//! ```
//!
//! A default file is written when the configured path does not exist.
//!
//! ## Signal Handling
//!
//! SIGINT and SIGTERM (Ctrl+C on Windows) start a graceful shutdown. A
//! second signal exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

pub use app::Application;
pub use cli::CliArgs;
pub use config::{AppConfig, HostSettings, LoggingSettings, PluginLoadSettings, PluginSettings};

/// Parses the command line, sets up logging and runs the host until shutdown.
///
/// Exits the process with status 1 on startup or runtime failure.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging needs the configured level before the application exists
    let config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();
    let mut logging_settings = config.logging;
    if let Some(level) = &args.log_level {
        logging_settings.level = level.clone();
    }

    if let Err(e) = logging::setup_logging(&logging_settings, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}
