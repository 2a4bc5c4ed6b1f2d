//! Logging system setup.
//!
//! The runtime crate only emits `tracing` events; this is where the host
//! installs the subscriber that prints them.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set. `json_format` forces
/// JSON output regardless of the configuration file.
pub fn setup_logging(
    config: &LoggingSettings,
    json_format: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = config.level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if json_format || config.json_format {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_file(false)
                    .with_line_number(false)
                    .with_thread_ids(true)
                    .with_thread_names(true),
            )
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", log_level);
    Ok(())
}

/// Logs the startup banner.
pub fn display_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("╔══════════════════════════════════════════╗");
    info!("║             🔌 PLUGIN HOST 🔌            ║");
    info!("║   host v{:<8} runtime v{:<8}       ║", version, plugin_runtime::PLUGIN_RUNTIME_VERSION);
    info!("║                                          ║");
    info!("║  📂 Dotted-name event and service trees  ║");
    info!("║  🎯 Typed calls across plugin modules    ║");
    info!("║  🔄 Version-resolved plugin loading      ║");
    info!("╚══════════════════════════════════════════╝");
}
