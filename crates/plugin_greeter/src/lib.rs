//! Sample plugin: greets whoever calls `greeter.greet`.
//!
//! Build it as a `cdylib`, rename the library to `greeter-1.0.0.<ext>` and
//! drop it into the host's plugin directory.

use plugin_runtime::{
    export_plugin, ArgValue, ArgumentVector, Event, HostContext, Language, Plugin, PluginInfo,
    PluginModule, Service, TypeDescriptor, Version, CORE_NAMESPACE,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

pub const PLUGIN_NAME: &str = "greeter";
pub const PLUGIN_VERSION: Version = Version::new(1, 0, 0);

/// Per-host state, kept in the host's global data under [`PLUGIN_NAME`].
#[derive(Debug, Default)]
pub struct GreeterStats {
    pub greetings: AtomicU64,
}

/// Module type exported to the host. Holds nothing; see [`GreeterStats`].
#[derive(Default)]
pub struct Greeter;

impl PluginModule for Greeter {
    fn init(&self, host: &mut HostContext) -> Option<Plugin> {
        info!("👋 GreeterPlugin: Initializing...");
        let info = PluginInfo::new(PLUGIN_NAME, PLUGIN_VERSION)
            .with_category("sample")
            .with_description("Greets callers and counts the greetings")
            .with_language(Language::Rust);
        let mut plugin = Plugin::new(info);

        host.create_event(&mut plugin, "greeted", TypeDescriptor::new("void", &["char*"]))
            .ok()?;
        host.create_service(
            &mut plugin,
            "greet",
            TypeDescriptor::new("char*", &["char*"]),
            greet,
        )
        .ok()?;
        // Last, so a failed init never leaves the stats behind
        if let Err(e) = host.add_global(PLUGIN_NAME, GreeterStats::default()) {
            warn!("👋 GreeterPlugin: {}", e);
            return None;
        }

        Some(plugin)
    }

    fn start(&self, host: &mut HostContext) -> bool {
        let stats_event = host.full_name(CORE_NAMESPACE, "stats");
        match host.register_listener(PLUGIN_NAME, &stats_event, report_greetings) {
            Ok(()) => {
                info!("👋 GreeterPlugin: ✅ Ready to greet!");
                true
            }
            Err(e) => {
                warn!("👋 GreeterPlugin: could not listen to {}: {}", stats_event, e);
                false
            }
        }
    }

    fn stop(&self, host: &mut HostContext) {
        let stats_event = host.full_name(CORE_NAMESPACE, "stats");
        if host.unregister_listener(&stats_event, report_greetings).is_err() {
            debug!("👋 GreeterPlugin: stats listener already gone");
        }
        info!("👋 GreeterPlugin: Stopped");
    }

    fn deinit(&self, host: &mut HostContext) {
        let stats = host.remove_global::<GreeterStats>(PLUGIN_NAME);
        info!(
            "👋 GreeterPlugin: Goodbye after {} greeting(s)",
            stats.map_or(0, |s| s.greetings.into_inner())
        );
    }
}

fn greet(host: &HostContext, _service: &Service, args: &ArgumentVector) -> Option<ArgValue> {
    let name = args.extract::<String>(0).ok()?;
    let greeting = format!("Hello, {name}!");

    if let Some(stats) = host.global::<GreeterStats>(PLUGIN_NAME) {
        stats.greetings.fetch_add(1, Ordering::Relaxed);
    }
    let greeted = host.full_name(PLUGIN_NAME, "greeted");
    if let Err(e) = host.fire_values(&greeted, vec![ArgValue::from(name)]) {
        warn!("👋 GreeterPlugin: could not fire {}: {}", greeted, e);
    }

    Some(ArgValue::from(greeting))
}

fn report_greetings(host: &HostContext, _event: &Event, _args: &ArgumentVector) {
    if let Some(stats) = host.global::<GreeterStats>(PLUGIN_NAME) {
        info!(
            "👋 GreeterPlugin: {} greeting(s) so far",
            stats.greetings.load(Ordering::Relaxed)
        );
    }
}

export_plugin!(Greeter);
