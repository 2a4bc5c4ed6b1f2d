//! Two plugins linked into the host: `counter` offers a service and an
//! event, `watcher` listens to it and calls the service on every tick.

use plugin_runtime::*;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
struct Total(AtomicI32);

fn counter_init(host: &mut HostContext) -> Option<Plugin> {
    let mut plugin = Plugin::new(PluginInfo::new("counter", Version::new(1, 0, 0)));
    host.add_global("counter", Total::default()).ok()?;
    host.create_event(&mut plugin, "changed", TypeDescriptor::new("void", &["int"]))
        .ok()?;
    host.create_service(
        &mut plugin,
        "add",
        TypeDescriptor::new("int", &["int"]),
        |host, _, args| {
            let amount = args.extract::<i32>(0).ok()?;
            let total = host.global::<Total>("counter")?;
            let now = total.0.fetch_add(amount, Ordering::SeqCst) + amount;
            host.fire_values("counter.changed", vec![ArgValue::from(now)])
                .ok()?;
            Some(ArgValue::from(now))
        },
    )
    .ok()?;
    Some(plugin)
}

fn counter_deinit(host: &mut HostContext) {
    host.remove_global::<Total>("counter");
}

fn watcher_init(_host: &mut HostContext) -> Option<Plugin> {
    Some(Plugin::new(PluginInfo::new("watcher", Version::new(0, 3, 0))))
}

fn watcher_start(host: &mut HostContext) -> bool {
    let changed = host
        .register_listener("watcher", "counter.changed", |_, event, args| {
            info!("👀 {} -> {:?}", event.name(), args.extract::<i32>(0));
        })
        .is_ok();
    let ticks = host
        .register_listener("watcher", "core.tick", |host, _, _| {
            if let Err(e) = host.call_values("counter.add", vec![ArgValue::from(2)]) {
                tracing::warn!("⚠️ counter.add failed: {}", e);
            }
        })
        .is_ok();
    changed && ticks
}

fn noop(_host: &mut HostContext) {}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("debug").init();

    let mut host = HostContext::new("example")?;
    let manager = PluginManager::new(PluginManagerConfig::default());

    let counter = EntryPoints {
        init: counter_init,
        start: |_| true,
        stop: noop,
        deinit: counter_deinit,
    };
    let watcher = EntryPoints {
        init: watcher_init,
        start: watcher_start,
        stop: noop,
        deinit: noop,
    };

    for (name, module) in [("counter", counter), ("watcher", watcher)] {
        manager.load_module(&mut host, name, Arc::new(module), None, None)?;
        manager.start(&mut host, name)?;
    }

    host.start();
    for _ in 0..3 {
        host.fire("core.tick", &ArgumentVector::empty());
    }

    let total = host.call_values("counter.add", vec![ArgValue::from(0)])?;
    info!("🧮 Total after three ticks: {:?}", total.as_ref().and_then(i32::from_arg));

    manager.unload_all(&mut host);
    Ok(())
}
