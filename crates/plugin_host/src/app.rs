//! Main application logic and lifecycle management.
//!
//! The `Application` owns the host context and the plugin manager. It loads
//! the configured plugins, drives `core.tick` and `core.stats` from a tokio
//! loop, and tears everything down on a shutdown signal.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown_signal, wait_for_shutdown_signal_silent},
};
use plugin_runtime::{
    ArgumentVector, HostContext, HostState, LoadReport, PluginManager, CORE_NAMESPACE,
};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

const HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Runs one host context and the plugins loaded into it.
pub struct Application {
    config: AppConfig,
    host: HostContext,
    manager: PluginManager,
    /// Forces `Exact` version resolution for every configured plugin
    exact_versions: bool,
}

impl Application {
    /// Loads the configuration, applies command-line overrides, validates the
    /// result and creates the host context.
    ///
    /// No plugin is loaded yet; that happens in [`Application::startup`].
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(plugin_dir) = args.plugin_dir {
            config.plugins.directory = plugin_dir.to_string_lossy().to_string();
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        if let Some(tick_interval_ms) = args.tick_interval_ms {
            config.host.tick_interval_ms = tick_interval_ms;
        }

        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        display_banner();

        let host = HostContext::with_config(config.to_host_config())?;
        let manager = PluginManager::new(config.to_manager_config());

        info!(
            "📂 Config: {} | Plugins: {}",
            args.config_path.display(),
            config.plugins.directory
        );

        Ok(Self {
            config,
            host,
            manager,
            exact_versions: args.exact_versions,
        })
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut HostContext {
        &mut self.host
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Loads and starts every configured plugin, then moves the host to
    /// `Running`. Plugins that fail are reported, not fatal.
    pub fn startup(&mut self) -> Result<LoadReport, Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        let entries = self.config.plugin_entries(self.exact_versions)?;
        let report = self.manager.load_all(&mut self.host, &entries);
        for (name, reason) in &report.failed {
            warn!("⚠️ Plugin {} not running: {}", name, reason);
        }

        self.host.start();
        info!(
            "✅ Host '{}' is now running with {} plugin(s)",
            self.host.name(),
            self.host.plugins().len()
        );
        Ok(report)
    }

    /// Runs until a shutdown signal arrives or something calls `core.stop`.
    pub async fn run(mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Starting plugin host application");
        self.startup()?;

        let tick_enabled = self.config.host.tick_interval_ms > 0;
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.config.host.tick_interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut health = tokio::time::interval(HEALTH_INTERVAL);
        // The first tick of an interval completes immediately
        health.tick().await;
        let mut last_events_fired = self.host.events().stats().events_fired;

        info!("🔍 Health monitoring active - stats every {}s", HEALTH_INTERVAL.as_secs());
        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let shutdown = wait_for_shutdown_signal();
        tokio::pin!(shutdown);
        let mut signalled = false;

        loop {
            tokio::select! {
                result = &mut shutdown => {
                    if let Err(e) = result {
                        error!("❌ Signal handler failed: {e}");
                    }
                    signalled = true;
                    break;
                }
                _ = ticker.tick(), if tick_enabled => {
                    self.tick();
                }
                _ = health.tick() => self.log_health(&mut last_events_fired),
            }

            if self.host.state() == HostState::Terminated {
                info!("🛑 Host exited, beginning shutdown...");
                break;
            }
        }

        if signalled {
            // merciless shutdown
            tokio::spawn(async move {
                if let Err(e) = wait_for_shutdown_signal_silent().await {
                    error!("Failed to set up merciless shutdown signal handler: {e}");
                    return;
                }

                warn!("Shutdown handler received again! I'll make this quick.");
                std::process::exit(1);
            });
        }

        self.shutdown();
        Ok(())
    }

    /// Fires `core.tick` while the host is running.
    pub fn tick(&self) -> usize {
        if !self.host.is_running() {
            return 0;
        }
        let event = self.host.full_name(CORE_NAMESPACE, "tick");
        self.host.fire(&event, &ArgumentVector::empty())
    }

    /// Fires `core.stats` and logs event throughput since the last call.
    fn log_health(&self, last_events_fired: &mut u64) {
        let event = self.host.full_name(CORE_NAMESPACE, "stats");
        self.host.fire(&event, &ArgumentVector::empty());

        let stats = self.host.events().stats();
        let events_this_period = stats.events_fired - *last_events_fired;
        *last_events_fired = stats.events_fired;

        info!(
            "📊 System Health - {} events/min | {} listeners | {} service calls | {} plugins active",
            events_this_period,
            stats.total_listeners,
            self.host.services().calls(),
            self.host.plugins().len()
        );
    }

    /// Moves the host to `Terminated` and unloads every plugin in reverse
    /// load order.
    pub fn shutdown(mut self) {
        info!("🔌 Shutting down plugins...");
        self.host.exit();
        log_final_statistics(&self.host);
        self.host.shutdown();
        info!("✅ Plugin host shutdown complete");
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🏷️ Host: {} ({:?})", self.config.host.name, self.config.host.network_role);
        info!("  🔌 Plugin directory: {}", self.config.plugins.directory);
        info!("  ✂️ Delimiter: {:?}", self.config.plugins.delimiter);
        info!("  ⏱️ Tick interval: {}ms", self.config.host.tick_interval_ms);
        info!(
            "  📦 Plugins requested: {}{}",
            self.config.plugins.load.len(),
            if self.exact_versions { " (exact versions)" } else { "" }
        );
    }
}

fn log_final_statistics(host: &HostContext) {
    let stats = host.events().stats();
    info!("📊 Final Statistics:");
    info!("  - Events fired: {}", stats.events_fired);
    info!("  - Listeners invoked: {}", stats.listeners_invoked);
    info!("  - Service calls: {}", host.services().calls());
}
