//! Plugin manager: resolves, loads, starts, stops and unloads plugins.
//!
//! Loaded plugins are stored in the [`HostContext`] they were loaded into;
//! the manager itself only carries where to look for plugin files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::context::HostContext;
use crate::error::PluginRuntimeError;
use crate::loader::DynamicModule;
use crate::plugin::{LoadedPlugin, PluginModule, PluginState};
use crate::utils::guard_panic;
use crate::version::{Version, VersionPolicy};
use crate::Result;

/// Where the manager looks for plugin libraries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManagerConfig {
    #[serde(default = "default_search_directory")]
    pub search_directory: PathBuf,
}

fn default_search_directory() -> PathBuf {
    PathBuf::from("plugins")
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            search_directory: default_search_directory(),
        }
    }
}

/// One plugin to load as part of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub version_policy: VersionPolicy,
}

impl PluginEntry {
    pub fn new(name: impl Into<String>, version: Version, version_policy: VersionPolicy) -> Self {
        Self {
            name: name.into(),
            version,
            version_policy,
        }
    }
}

/// Outcome of [`PluginManager::load_all`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Plugins that loaded and started, in start order
    pub started: Vec<String>,
    /// Requested name and reason for every plugin that did not make it
    pub failed: Vec<(String, String)>,
}

/// A plugin file that matched a load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub version: Version,
}

/// Drives plugin lifecycles against a host context.
#[derive(Debug, Clone, Default)]
pub struct PluginManager {
    config: PluginManagerConfig,
}

impl PluginManager {
    pub fn new(config: PluginManagerConfig) -> Self {
        Self { config }
    }

    pub fn search_directory(&self) -> &Path {
        &self.config.search_directory
    }

    /// Lists the library files whose name contains `name` and whose embedded
    /// version satisfies `policy`, ordered by file name.
    pub fn discover_candidates(
        &self,
        name: &str,
        requested: Version,
        policy: VersionPolicy,
    ) -> Result<Vec<Candidate>> {
        let dir = self.search_directory();
        if !dir.is_dir() {
            warn!("⚠️ Plugin directory does not exist: {}", dir.display());
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || !is_library(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !file_name.contains(name) {
                continue;
            }
            let Some(version) = Version::from_file_name(file_name) else {
                debug!("🔍 Skipping {}: no version in file name", file_name);
                continue;
            };
            if policy.accepts(requested, version) {
                candidates.push(Candidate { path, version });
            }
        }
        candidates.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(candidates)
    }

    /// Loads the first library that satisfies the request and runs its
    /// `init`. Returns the plugin's name.
    ///
    /// Nothing is kept when any step fails: the library is closed and the
    /// host's plugin list is unchanged.
    pub fn load(
        &self,
        host: &mut HostContext,
        name: &str,
        requested: Version,
        policy: VersionPolicy,
    ) -> Result<String> {
        if host.is_loaded(name) {
            error!("❌ Plugin {} is already loaded", name);
            return Err(PluginRuntimeError::AlreadyLoaded(name.to_string()));
        }

        let candidates = self.discover_candidates(name, requested, policy)?;
        let Some(candidate) = candidates.into_iter().next() else {
            error!(
                "❌ No plugin file for {} {} ({}) in {}",
                name,
                requested,
                policy,
                self.search_directory().display()
            );
            return Err(PluginRuntimeError::VersionResolution(format!(
                "no file satisfies {name} {requested} ({policy})"
            )));
        };

        info!("🔄 Loading plugin from: {}", candidate.path.display());
        let module = DynamicModule::open(&candidate.path)?;
        self.load_module(
            host,
            name,
            Arc::new(module),
            Some(candidate.version),
            Some(candidate.path),
        )
    }

    /// Runs `init` on an already available module and registers the
    /// resulting plugin with the host as `name`. `expected` is cross-checked
    /// against the version the plugin reports.
    ///
    /// On failure every event, service and listener that appeared during
    /// `init` is removed again before the module is dropped.
    pub fn load_module(
        &self,
        host: &mut HostContext,
        name: &str,
        module: Arc<dyn PluginModule>,
        expected: Option<Version>,
        path: Option<PathBuf>,
    ) -> Result<String> {
        if host.is_loaded(name) {
            error!("❌ Plugin {} is already loaded", name);
            return Err(PluginRuntimeError::AlreadyLoaded(name.to_string()));
        }

        let before = Registrations::capture(host);
        let Some(plugin) = guard_panic("plugin init", || module.init(host)).flatten() else {
            error!("❌ Plugin {} failed to initialize", name);
            before.roll_back(host, &[name]);
            return Err(PluginRuntimeError::LoadingFailed(format!(
                "{name}: init did not return a plugin"
            )));
        };

        if plugin.name() != name {
            error!("❌ Plugin {} reports its name as {}", name, plugin.name());
            discard(host, module.as_ref(), &before, &[name, plugin.name()]);
            return Err(PluginRuntimeError::LoadingFailed(format!(
                "{name} reports its name as {}",
                plugin.name()
            )));
        }

        if let Some(expected) = expected {
            if plugin.version() != expected {
                error!(
                    "❌ Plugin {} reports version {}, file name says {}",
                    name,
                    plugin.version(),
                    expected
                );
                discard(host, module.as_ref(), &before, &[name]);
                return Err(PluginRuntimeError::VersionResolution(format!(
                    "{name} reports {} but was resolved as {expected}",
                    plugin.version()
                )));
            }
        }

        info!("✅ Plugin loaded: {} v{}", name, plugin.version());
        host.plugins.push(LoadedPlugin::new(plugin, module, path));
        Ok(name.to_string())
    }

    /// Calls the plugin's `start`. Only a freshly loaded plugin can start.
    pub fn start(&self, host: &mut HostContext, name: &str) -> Result<()> {
        let module = loaded_module(host, name)?;
        let state = host.plugin(name).map(LoadedPlugin::state);
        if state != Some(PluginState::Loaded) {
            warn!("⚠️ Plugin {} cannot start from state {:?}", name, state);
            return Err(PluginRuntimeError::InvalidState(format!(
                "{name} is {state:?}, expected Loaded"
            )));
        }

        info!("🚀 Starting plugin: {}", name);
        let started = guard_panic("plugin start", || module.start(host)).unwrap_or(false);
        if let Some(record) = record_mut(host, name) {
            record.started_successfully = started;
            if started {
                record.state = PluginState::Started;
            }
        }
        if started {
            Ok(())
        } else {
            error!("❌ Plugin {} failed to start", name);
            Err(PluginRuntimeError::StartFailed(name.to_string()))
        }
    }

    /// Calls the plugin's `stop`. Plugins that never started are left alone.
    pub fn stop(&self, host: &mut HostContext, name: &str) -> Result<()> {
        stop_plugin(host, name)
    }

    /// Tears a plugin down and closes its module.
    pub fn unload(&self, host: &mut HostContext, name: &str) -> Result<()> {
        unload_plugin(host, name)
    }

    /// Unloads every plugin in reverse load order.
    pub fn unload_all(&self, host: &mut HostContext) {
        host.shutdown();
    }

    /// Loads every entry, then starts every plugin that loaded. Plugins that
    /// fail to start are unloaded again.
    pub fn load_all(&self, host: &mut HostContext, entries: &[PluginEntry]) -> LoadReport {
        let mut report = LoadReport::default();
        let mut loaded = Vec::new();

        for entry in entries {
            match self.load(host, &entry.name, entry.version, entry.version_policy) {
                Ok(name) => loaded.push(name),
                Err(e) => {
                    error!("❌ Failed to load plugin {}: {}", entry.name, e);
                    report.failed.push((entry.name.clone(), e.to_string()));
                }
            }
        }

        for name in loaded {
            match self.start(host, &name) {
                Ok(()) => report.started.push(name),
                Err(e) => {
                    if let Err(unload_err) = unload_plugin(host, &name) {
                        error!("❌ Failed to unload plugin {}: {}", name, unload_err);
                    }
                    report.failed.push((name, e.to_string()));
                }
            }
        }

        info!(
            "🎉 Plugin loading complete: {}/{} plugins started",
            report.started.len(),
            entries.len()
        );
        report
    }
}

fn is_library(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(std::env::consts::DLL_EXTENSION))
}

fn loaded_module(host: &HostContext, name: &str) -> Result<Arc<dyn PluginModule>> {
    host.plugin(name)
        .and_then(|p| p.module.clone())
        .ok_or_else(|| {
            warn!("⚠️ Plugin {} is not loaded", name);
            PluginRuntimeError::NotFound(name.to_string())
        })
}

fn record_mut<'a>(host: &'a mut HostContext, name: &str) -> Option<&'a mut LoadedPlugin> {
    host.plugins.iter_mut().find(|p| p.name() == name)
}

/// Tears down a plugin object that never made it onto the plugin list.
/// Event and service names present before a module's `init` ran.
struct Registrations {
    events: HashSet<String>,
    services: HashSet<String>,
}

impl Registrations {
    fn capture(host: &HostContext) -> Self {
        Self {
            events: host.events().names().into_iter().collect(),
            services: host.services().names().into_iter().collect(),
        }
    }

    /// Destroys everything created since [`Registrations::capture`] and the
    /// listeners registered under `name_spaces`.
    fn roll_back(&self, host: &mut HostContext, name_spaces: &[&str]) {
        for service in host.services().names() {
            if self.services.contains(&service) {
                continue;
            }
            let owner = host.get_service(&service).map(|s| s.owner().to_string());
            if let Some(owner) = owner {
                if let Err(e) = host.destroy_service(&owner, &service) {
                    warn!("⚠️ Could not destroy service {}: {}", service, e);
                }
            }
        }
        for event in host.events().names() {
            if self.events.contains(&event) {
                continue;
            }
            let owner = host.get_event(&event).map(|e| e.owner().to_string());
            if let Some(owner) = owner {
                if let Err(e) = host.destroy_event(&owner, &event) {
                    warn!("⚠️ Could not destroy event {}: {}", event, e);
                }
            }
        }
        for name_space in name_spaces {
            host.unregister_namespace_listeners(name_space);
        }
    }
}

/// Tears down a plugin whose `init` succeeded but which is not kept.
fn discard(
    host: &mut HostContext,
    module: &dyn PluginModule,
    before: &Registrations,
    name_spaces: &[&str],
) {
    guard_panic("plugin deinit", || module.deinit(host));
    before.roll_back(host, name_spaces);
}

pub(crate) fn stop_plugin(host: &mut HostContext, name: &str) -> Result<()> {
    let module = loaded_module(host, name)?;
    let should_stop = host
        .plugin(name)
        .is_some_and(|p| p.state() == PluginState::Started && p.started_successfully());
    if !should_stop {
        debug!("🔇 Plugin {} is not running, nothing to stop", name);
        return Ok(());
    }

    info!("🛑 Stopping plugin: {}", name);
    guard_panic("plugin stop", || module.stop(host));
    if let Some(record) = record_mut(host, name) {
        record.state = PluginState::Stopped;
    }
    Ok(())
}

/// Stop, destroy services, destroy events, drop listeners, deinit, close
/// the module, forget the plugin. The module is closed only once nothing
/// in the host can still call into it.
pub(crate) fn unload_plugin(host: &mut HostContext, name: &str) -> Result<()> {
    if !host.is_loaded(name) {
        warn!("⚠️ Cannot unload {}: not loaded", name);
        return Err(PluginRuntimeError::NotFound(name.to_string()));
    }
    info!("🛑 Unloading plugin: {}", name);

    stop_plugin(host, name)?;

    let (services, events) = host
        .plugin(name)
        .map(|p| (p.plugin().services().to_vec(), p.plugin().events().to_vec()))
        .unwrap_or_default();
    for service in &services {
        if host.services().contains(service) {
            if let Err(e) = host.destroy_service(name, service) {
                warn!("⚠️ Could not destroy service {}: {}", service, e);
            }
        }
    }
    for event in &events {
        if host.events().contains(event) {
            if let Err(e) = host.destroy_event(name, event) {
                warn!("⚠️ Could not destroy event {}: {}", event, e);
            }
        }
    }
    let dropped = host.unregister_namespace_listeners(name);
    debug!("🔌 Dropped {} listeners registered by {}", dropped, name);

    if let Ok(module) = loaded_module(host, name) {
        guard_panic("plugin deinit", || module.deinit(host));
    }
    if let Some(record) = record_mut(host, name) {
        drop(record.module.take());
    }
    host.plugins.retain(|p| p.name() != name);

    info!("✅ Plugin unloaded successfully: {}", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::marshal::{ArgValue, ArgumentVector, FromArg, TypeDescriptor};
    use crate::plugin::{EntryPoints, Plugin, PluginInfo};
    use crate::service::Service;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn a_add(_: &HostContext, _: &Service, args: &ArgumentVector) -> Option<ArgValue> {
        let x: i32 = args.extract(0).ok()?;
        let y: i32 = args.extract(1).ok()?;
        Some(ArgValue::from(x + y))
    }

    /// Owns `A.tick` and `A.add`
    #[derive(Default)]
    struct PluginA;

    impl PluginModule for PluginA {
        fn init(&self, host: &mut HostContext) -> Option<Plugin> {
            let mut plugin = Plugin::new(PluginInfo::new("A", Version::new(1, 2, 0)));
            host.create_event(&mut plugin, "tick", TypeDescriptor::void()).ok()?;
            host.create_service(
                &mut plugin,
                "add",
                TypeDescriptor::new("int", &["int", "int"]),
                a_add,
            )
            .ok()?;
            Some(plugin)
        }

        fn start(&self, _host: &mut HostContext) -> bool {
            true
        }

        fn stop(&self, _host: &mut HostContext) {}

        fn deinit(&self, _host: &mut HostContext) {}
    }

    static B_TICKS: AtomicUsize = AtomicUsize::new(0);

    fn b_on_tick(_: &HostContext, _: &Event, _: &ArgumentVector) {
        B_TICKS.fetch_add(1, Ordering::SeqCst);
    }

    #[derive(Debug, PartialEq)]
    struct Observed(i32);

    /// Listens to `A.tick` and calls `A.add` when started
    #[derive(Default)]
    struct PluginB;

    impl PluginModule for PluginB {
        fn init(&self, _host: &mut HostContext) -> Option<Plugin> {
            Some(Plugin::new(PluginInfo::new("B", Version::new(0, 1, 0))))
        }

        fn start(&self, host: &mut HostContext) -> bool {
            if host.register_listener("B", "A.tick", b_on_tick).is_err() {
                return false;
            }
            let sum = host
                .call_values("A.add", crate::args![2, 3])
                .ok()
                .flatten()
                .and_then(|v| i32::from_arg(&v));
            match sum {
                Some(sum) => host.add_global("B", Observed(sum)).is_ok(),
                None => false,
            }
        }

        fn stop(&self, _host: &mut HostContext) {}

        fn deinit(&self, host: &mut HostContext) {
            host.remove_global::<Observed>("B");
        }
    }

    fn host() -> HostContext {
        HostContext::new("manager_test").unwrap()
    }

    #[test_log::test]
    fn test_end_to_end_scenario() {
        let manager = PluginManager::default();
        let mut host = host();

        manager.load_module(&mut host, "A", Arc::new(PluginA), None, None).unwrap();
        manager.load_module(&mut host, "B", Arc::new(PluginB), None, None).unwrap();
        manager.start(&mut host, "A").unwrap();
        manager.start(&mut host, "B").unwrap();

        assert_eq!(host.global::<Observed>("B"), Some(&Observed(5)));
        assert_eq!(host.get_event("A.tick").unwrap().listener_count(), 1);
        assert_eq!(host.fire("A.tick", &ArgumentVector::empty()), 1);
        assert_eq!(B_TICKS.load(Ordering::SeqCst), 1);

        manager.unload(&mut host, "A").unwrap();
        assert!(host.get_event("A.tick").is_none());
        assert!(host.get_service("A.add").is_none());
        assert_eq!(host.fire("A.tick", &ArgumentVector::empty()), 0);
        assert_eq!(B_TICKS.load(Ordering::SeqCst), 1);
        assert!(host.is_loaded("B"));
        assert!(!host.is_loaded("A"));

        manager.unload(&mut host, "B").unwrap();
        assert!(host.plugins().is_empty());
        assert!(host.global::<Observed>("B").is_none());
    }

    fn fail_init(_: &mut HostContext) -> Option<Plugin> {
        None
    }
    fn noop_start(_: &mut HostContext) -> bool {
        true
    }
    fn refuse_start(_: &mut HostContext) -> bool {
        false
    }
    fn noop(_: &mut HostContext) {}

    fn versioned_init(host: &mut HostContext) -> Option<Plugin> {
        let mut plugin = Plugin::new(PluginInfo::new("versioned", Version::new(2, 0, 0)));
        host.create_event(&mut plugin, "changed", TypeDescriptor::void()).ok()?;
        host.create_service(&mut plugin, "query", TypeDescriptor::void(), |_, _, _| None)
            .ok()?;
        Some(plugin)
    }

    fn module(
        init: fn(&mut HostContext) -> Option<Plugin>,
        start: fn(&mut HostContext) -> bool,
    ) -> Arc<dyn PluginModule> {
        Arc::new(EntryPoints {
            init,
            start,
            stop: noop,
            deinit: noop,
        })
    }

    #[test]
    fn test_failed_init_adds_nothing() {
        let manager = PluginManager::default();
        let mut host = host();
        assert!(matches!(
            manager.load_module(&mut host, "failing", module(fail_init, noop_start), None, None),
            Err(PluginRuntimeError::LoadingFailed(_))
        ));
        assert!(host.plugins().is_empty());
    }

    fn on_any(_: &HostContext, _: &Event, _: &ArgumentVector) {}

    fn half_init(host: &mut HostContext) -> Option<Plugin> {
        let mut plugin = Plugin::new(PluginInfo::new("half", Version::new(1, 0, 0)));
        host.create_event(&mut plugin, "evt", TypeDescriptor::void()).ok()?;
        host.create_service(&mut plugin, "svc", TypeDescriptor::void(), |_, _, _| None)
            .ok()?;
        host.register_listener("half", "core.tick", on_any).ok()?;
        None
    }

    #[test_log::test]
    fn test_failed_init_is_rolled_back() {
        let manager = PluginManager::default();
        let mut host = host();
        let events_before = host.events().len();

        assert!(matches!(
            manager.load_module(&mut host, "half", module(half_init, noop_start), None, None),
            Err(PluginRuntimeError::LoadingFailed(_))
        ));
        assert!(host.get_service("half.svc").is_none());
        assert!(host.get_event("half.evt").is_none());
        assert!(!host.get_event("core.tick").unwrap().has_listener(on_any));
        assert_eq!(host.events().len(), events_before);
        assert!(host.plugins().is_empty());
    }

    #[test]
    fn test_reported_name_must_match() {
        let manager = PluginManager::default();
        let mut host = host();
        assert!(matches!(
            manager.load_module(&mut host, "other", module(versioned_init, noop_start), None, None),
            Err(PluginRuntimeError::LoadingFailed(_))
        ));
        assert!(host.get_event("versioned.changed").is_none());
        assert!(host.get_service("versioned.query").is_none());
        assert!(host.plugins().is_empty());
    }

    #[test]
    fn test_version_mismatch_tears_down() {
        let manager = PluginManager::default();
        let mut host = host();
        let result = manager.load_module(
            &mut host,
            "versioned",
            module(versioned_init, noop_start),
            Some(Version::new(1, 0, 0)),
            None,
        );
        assert!(matches!(result, Err(PluginRuntimeError::VersionResolution(_))));
        assert!(host.get_event("versioned.changed").is_none());
        assert!(host.get_service("versioned.query").is_none());
        assert!(host.plugins().is_empty());

        let name = manager
            .load_module(
                &mut host,
                "versioned",
                module(versioned_init, noop_start),
                Some(Version::new(2, 0, 0)),
                None,
            )
            .unwrap();
        assert_eq!(name, "versioned");
    }

    #[test]
    fn test_duplicate_plugin_keeps_first() {
        let manager = PluginManager::default();
        let mut host = host();
        manager
            .load_module(&mut host, "versioned", module(versioned_init, noop_start), None, None)
            .unwrap();
        assert!(matches!(
            manager.load_module(&mut host, "versioned", module(versioned_init, noop_start), None, None),
            Err(PluginRuntimeError::AlreadyLoaded(_))
        ));
        assert_eq!(host.plugins().len(), 1);
        assert!(host.get_event("versioned.changed").is_some());
        assert!(host.get_service("versioned.query").is_some());

        // A library load is refused before any file is looked at
        assert!(matches!(
            manager.load(&mut host, "versioned", Version::new(2, 0, 0), VersionPolicy::Minimum),
            Err(PluginRuntimeError::AlreadyLoaded(_))
        ));
    }

    #[test]
    fn test_start_and_stop_gating() {
        let manager = PluginManager::default();
        let mut host = host();
        manager.load_module(&mut host, "A", Arc::new(PluginA), None, None).unwrap();

        // Stopping a plugin that never started is a no-op.
        manager.stop(&mut host, "A").unwrap();
        assert_eq!(host.plugin("A").unwrap().state(), PluginState::Loaded);

        manager.start(&mut host, "A").unwrap();
        assert!(host.plugin("A").unwrap().started_successfully());
        assert!(matches!(
            manager.start(&mut host, "A"),
            Err(PluginRuntimeError::InvalidState(_))
        ));
        manager.stop(&mut host, "A").unwrap();
        assert_eq!(host.plugin("A").unwrap().state(), PluginState::Stopped);
        assert!(matches!(
            manager.start(&mut host, "missing"),
            Err(PluginRuntimeError::NotFound(_))
        ));
    }

    fn refusing_init(_: &mut HostContext) -> Option<Plugin> {
        Some(Plugin::new(PluginInfo::new("refuser", Version::new(1, 0, 0))))
    }

    #[test]
    fn test_failed_start_is_reported() {
        let manager = PluginManager::default();
        let mut host = host();
        manager
            .load_module(&mut host, "refuser", module(refusing_init, refuse_start), None, None)
            .unwrap();
        assert!(matches!(
            manager.start(&mut host, "refuser"),
            Err(PluginRuntimeError::StartFailed(_))
        ));
        let record = host.plugin("refuser").unwrap();
        assert!(!record.started_successfully());
        assert_eq!(record.state(), PluginState::Loaded);
    }

    #[derive(Default)]
    struct Panicky;

    impl PluginModule for Panicky {
        fn init(&self, host: &mut HostContext) -> Option<Plugin> {
            let mut plugin = Plugin::new(PluginInfo::new("panicky", Version::new(1, 0, 0)));
            host.create_service(&mut plugin, "boom", TypeDescriptor::void(), |_, _, _| None)
                .ok()?;
            panic!("init exploded");
        }
        fn start(&self, _host: &mut HostContext) -> bool {
            true
        }
        fn stop(&self, _host: &mut HostContext) {}
        fn deinit(&self, _host: &mut HostContext) {}
    }

    #[test]
    fn test_panicking_init_is_a_load_failure() {
        let manager = PluginManager::default();
        let mut host = host();
        assert!(manager
            .load_module(&mut host, "panicky", Arc::new(Panicky), None, None)
            .is_err());
        assert!(host.plugins().is_empty());
        assert!(host.get_service("panicky.boom").is_none());
    }

    #[test]
    fn test_shutdown_unloads_in_reverse() {
        let manager = PluginManager::default();
        let mut host = host();
        manager.load_module(&mut host, "A", Arc::new(PluginA), None, None).unwrap();
        manager
            .load_module(&mut host, "versioned", module(versioned_init, noop_start), None, None)
            .unwrap();
        manager.unload_all(&mut host);
        assert!(host.plugins().is_empty());
        assert!(host.get_event("A.tick").is_none());
        assert!(host.get_event("versioned.changed").is_none());
        assert!(host.get_event("core.tick").is_some());
    }

    static PARALLEL_HITS: AtomicUsize = AtomicUsize::new(0);

    fn parallel_listener(_: &HostContext, _: &Event, args: &ArgumentVector) {
        let n: i32 = args.extract(0).unwrap_or_default();
        PARALLEL_HITS.fetch_add(n as usize, Ordering::SeqCst);
    }

    fn counter_init(host: &mut HostContext) -> Option<Plugin> {
        let mut plugin = Plugin::new(PluginInfo::new("counter", Version::new(1, 0, 0)));
        host.create_event(&mut plugin, "bump", TypeDescriptor::new("void", &["int"]))
            .ok()?;
        Some(plugin)
    }

    #[test]
    fn test_concurrent_fire() {
        let manager = PluginManager::default();
        let mut host = host();
        manager
            .load_module(&mut host, "counter", module(counter_init, noop_start), None, None)
            .unwrap();
        host.register_listener("observer", "counter.bump", parallel_listener)
            .unwrap();

        let host = &host;
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(move || {
                    for _ in 0..100 {
                        host.fire_values("counter.bump", crate::args![1]).unwrap();
                    }
                });
            }
        });
        assert_eq!(PARALLEL_HITS.load(Ordering::SeqCst), 400);
        assert_eq!(host.events().stats().listeners_invoked, 400);
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"not a real library").unwrap();
    }

    fn lib(stem: &str) -> String {
        format!("{stem}.{}", std::env::consts::DLL_EXTENSION)
    }

    #[test]
    fn test_candidate_discovery() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &lib("libplugin_foo-1-1-9"));
        touch(dir.path(), &lib("libplugin_foo-1-2-0"));
        touch(dir.path(), &lib("libplugin_foo-1-3-0"));
        touch(dir.path(), &lib("libplugin_bar-1-2-0"));
        touch(dir.path(), &lib("libplugin_foo"));
        touch(dir.path(), "libplugin_foo-1-2-0.txt");

        let manager = PluginManager::new(PluginManagerConfig {
            search_directory: dir.path().to_path_buf(),
        });
        let requested = Version::new(1, 2, 0);

        let minimum = manager
            .discover_candidates("foo", requested, VersionPolicy::Minimum)
            .unwrap();
        let versions: Vec<Version> = minimum.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![Version::new(1, 2, 0), Version::new(1, 3, 0)]);

        let exact = manager
            .discover_candidates("foo", requested, VersionPolicy::Exact)
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].version, requested);

        assert!(manager
            .discover_candidates("baz", requested, VersionPolicy::Minimum)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_load_resolution_failures() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), &lib("libplugin_foo-1-2-0"));
        let manager = PluginManager::new(PluginManagerConfig {
            search_directory: dir.path().to_path_buf(),
        });
        let mut host = host();

        assert!(matches!(
            manager.load(&mut host, "foo", Version::new(2, 0, 0), VersionPolicy::Minimum),
            Err(PluginRuntimeError::VersionResolution(_))
        ));
        // The file qualifies but is not a loadable library.
        assert!(matches!(
            manager.load(&mut host, "foo", Version::new(1, 0, 0), VersionPolicy::Minimum),
            Err(PluginRuntimeError::LibraryError(_))
        ));
        assert!(host.plugins().is_empty());
    }

    #[test]
    fn test_load_all_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let manager = PluginManager::new(PluginManagerConfig {
            search_directory: dir.path().to_path_buf(),
        });
        let mut host = host();
        let report = manager.load_all(
            &mut host,
            &[PluginEntry::new("ghost", Version::new(1, 0, 0), VersionPolicy::Exact)],
        );
        assert!(report.started.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "ghost");
    }

    #[test]
    fn test_entry_deserialization() {
        let entry: PluginEntry = toml::from_str("name = \"greeter\"\nversion = \"0.1.0\"\n").unwrap();
        assert_eq!(entry.version_policy, VersionPolicy::Minimum);
        assert_eq!(entry.version, Version::new(0, 1, 0));
    }
}
