//! Host context: the per-instance owner of every event, service, loaded
//! plugin and per-plugin global.
//!
//! Several contexts can live in one process (a client and a server, for
//! example); nothing in this crate keeps state outside of them.

use std::any::Any;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::container::SortedVec;
use crate::error::PluginRuntimeError;
use crate::event::{Event, EventBus, EventListener};
use crate::manager;
use crate::marshal::{ArgType, ArgValue, ArgumentVector, MarshalError, TypeDescriptor};
use crate::namespace::DEFAULT_DELIMITER;
use crate::plugin::{Language, LoadedPlugin, Plugin, PluginInfo};
use crate::service::{Service, ServiceBus, ServiceHandler};
use crate::utils::hash_str;
use crate::version::Version;
use crate::Result;

/// Namespace reserved for the host's own events and services.
pub const CORE_NAMESPACE: &str = "core";

/// Run state of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum HostState {
    Terminated = 0,
    Paused = 1,
    Running = 2,
}

impl HostState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Paused,
            2 => Self::Running,
            _ => Self::Terminated,
        }
    }
}

/// Which side of a networked session this host plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkRole {
    Client,
    #[default]
    Host,
}

/// Construction parameters for a [`HostContext`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub name: String,
    pub network_role: NetworkRole,
    /// Separator of dotted names in both namespace trees
    pub delimiter: char,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            name: "host".to_string(),
            network_role: NetworkRole::Host,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// One running instance of the plugin runtime.
pub struct HostContext {
    name: String,
    network_role: NetworkRole,
    state: AtomicU8,
    core: Plugin,
    events: EventBus,
    services: ServiceBus,
    pub(crate) plugins: Vec<LoadedPlugin>,
    global_data: SortedVec<u32, Box<dyn Any + Send + Sync>>,
}

const BUILTIN_EVENTS: [&str; 6] = ["start", "pause", "exit", "tick", "render", "stats"];
const NOTIFICATION_EVENTS: [&str; 4] = [
    "event.created",
    "event.destroyed",
    "service.created",
    "service.destroyed",
];

impl HostContext {
    /// Creates a host with the default configuration and the given name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_config(HostConfig {
            name: name.into(),
            ..HostConfig::default()
        })
    }

    /// Creates a host and registers the built-in `core` events and services.
    pub fn with_config(config: HostConfig) -> Result<Self> {
        let delimiter = config.delimiter;
        if delimiter.is_ascii_alphanumeric() || delimiter == '_' || delimiter.is_whitespace() {
            return Err(PluginRuntimeError::InvalidName(format!(
                "{delimiter:?} cannot be used as a delimiter"
            )));
        }

        let core_info = PluginInfo::new(CORE_NAMESPACE, version_of_crate())
            .with_category("core")
            .with_description("Built-in host events and services")
            .with_language(Language::Rust);

        let mut host = Self {
            name: config.name,
            network_role: config.network_role,
            state: AtomicU8::new(HostState::Paused as u8),
            core: Plugin::new(core_info),
            events: EventBus::new(delimiter),
            services: ServiceBus::new(delimiter),
            plugins: Vec::new(),
            global_data: SortedVec::new(),
        };
        host.register_builtins()?;
        info!("🔧 Host '{}' created ({:?})", host.name, host.network_role);
        Ok(host)
    }

    // Built-ins are created before anyone could listen, so no notifications fire.
    fn register_builtins(&mut self) -> Result<()> {
        for name in BUILTIN_EVENTS {
            self.create_core_event(name, TypeDescriptor::void())?;
        }
        let notification = TypeDescriptor::new("void", &["char*"]);
        for name in NOTIFICATION_EVENTS {
            self.create_core_event(name, notification.clone())?;
        }

        let services: [(&str, ServiceHandler); 3] = [
            ("start", |host, _, _| {
                host.start();
                None
            }),
            ("pause", |host, _, _| {
                host.pause();
                None
            }),
            ("stop", |host, _, _| {
                host.exit();
                None
            }),
        ];
        for (name, handler) in services {
            let full = self.full_name(CORE_NAMESPACE, name);
            self.services
                .create(CORE_NAMESPACE, full.clone(), TypeDescriptor::void(), handler)?;
            self.core.services.push(full);
        }
        Ok(())
    }

    fn create_core_event(&mut self, name: &str, descriptor: TypeDescriptor) -> Result<()> {
        let full = self.core_event(name);
        self.events.create(CORE_NAMESPACE, full.clone(), descriptor)?;
        self.core.events.push(full);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn network_role(&self) -> NetworkRole {
        self.network_role
    }

    pub fn delimiter(&self) -> char {
        self.events.delimiter()
    }

    /// The host's own plugin record, owner of everything under `core`.
    pub fn core(&self) -> &Plugin {
        &self.core
    }

    /// Joins a plugin name and a short name with the delimiter.
    pub fn full_name(&self, plugin: &str, name: &str) -> String {
        format!("{plugin}{}{name}", self.delimiter())
    }

    // Built-in short names are written with '.' and follow the configured delimiter.
    fn core_event(&self, name: &str) -> String {
        let name = name.replace('.', self.delimiter().encode_utf8(&mut [0; 4]));
        self.full_name(CORE_NAMESPACE, &name)
    }

    // ---- host state ----

    pub fn state(&self) -> HostState {
        HostState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == HostState::Running
    }

    /// Switches to `Running` and fires `core.start`.
    pub fn start(&self) {
        self.transition(HostState::Running, "start");
    }

    /// Switches to `Paused` and fires `core.pause`.
    pub fn pause(&self) {
        self.transition(HostState::Paused, "pause");
    }

    /// Switches to `Terminated` and fires `core.exit`.
    pub fn exit(&self) {
        self.transition(HostState::Terminated, "exit");
    }

    fn transition(&self, state: HostState, event: &str) {
        let previous = HostState::from_u8(self.state.swap(state as u8, Ordering::AcqRel));
        debug!("🔄 Host '{}' {:?} -> {:?}", self.name, previous, state);
        self.fire(&self.core_event(event), &ArgumentVector::empty());
    }

    // ---- events ----

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Creates `<plugin>.<name>`, records it on `plugin` and fires
    /// `core.event.created`. Returns the full name.
    pub fn create_event(
        &mut self,
        plugin: &mut Plugin,
        name: &str,
        descriptor: TypeDescriptor,
    ) -> Result<String> {
        let full = self.full_name(plugin.name(), name);
        self.events.create(plugin.name(), full.clone(), descriptor)?;
        plugin.events.push(full.clone());
        self.notify("event.created", &full);
        Ok(full)
    }

    /// Destroys an event on behalf of `owner`. The event's listeners go with it.
    pub fn destroy_event(&mut self, owner: &str, full_name: &str) -> Result<()> {
        self.events.destroy(owner, full_name)?;
        if let Some(record) = self.plugin_record_mut(owner) {
            record.events.retain(|name| name != full_name);
        }
        self.notify("event.destroyed", full_name);
        Ok(())
    }

    /// Destroys `<owner>.<name>`.
    pub fn destroy_plugin_event(&mut self, owner: &str, name: &str) -> Result<()> {
        let full = self.full_name(owner, name);
        self.destroy_event(owner, &full)
    }

    pub fn get_event(&self, full_name: &str) -> Option<&Event> {
        self.events.get(full_name)
    }

    pub fn register_listener(
        &mut self,
        name_space: &str,
        event: &str,
        callback: EventListener,
    ) -> Result<()> {
        self.events.register_listener(name_space, event, callback)
    }

    pub fn unregister_listener(&mut self, event: &str, callback: EventListener) -> Result<()> {
        self.events.unregister_listener(event, callback)
    }

    /// Removes every listener of `event`; returns how many were removed.
    pub fn unregister_all_listeners(&mut self, event: &str) -> Result<usize> {
        self.events.unregister_all_listeners(event)
    }

    /// Removes every listener registered by `prefix` or a namespace below
    /// it, across all events.
    pub fn unregister_namespace_listeners(&mut self, prefix: &str) -> usize {
        self.events.unregister_namespace_listeners(prefix)
    }

    /// Delivers `args` to every listener of `event`. Returns the number of
    /// listeners invoked; a missing event invokes none.
    pub fn fire(&self, event: &str, args: &ArgumentVector) -> usize {
        self.events.fire(self, event, args)
    }

    /// Builds the payload from `values` using the event's descriptor, then fires.
    pub fn fire_values(&self, event: &str, values: Vec<ArgValue>) -> Result<usize> {
        let descriptor = self
            .events
            .get(event)
            .map(|e| e.descriptor().clone())
            .ok_or_else(|| PluginRuntimeError::NotFound(event.to_string()))?;
        let args = ArgumentVector::from_values(&descriptor, values)?;
        Ok(self.fire(event, &args))
    }

    fn notify(&self, which: &str, full_name: &str) {
        let event = self.core_event(which);
        let Some(descriptor) = self.events.get(&event).map(|e| e.descriptor().clone()) else {
            return;
        };
        match ArgumentVector::from_values(&descriptor, [ArgValue::from(full_name)]) {
            Ok(args) => {
                self.fire(&event, &args);
            }
            Err(e) => warn!("⚠️ Could not build '{}' payload: {}", event, e),
        }
    }

    // ---- services ----

    pub fn services(&self) -> &ServiceBus {
        &self.services
    }

    /// Creates `<plugin>.<name>`, records it on `plugin` and fires
    /// `core.service.created`. Returns the full name.
    pub fn create_service(
        &mut self,
        plugin: &mut Plugin,
        name: &str,
        descriptor: TypeDescriptor,
        handler: ServiceHandler,
    ) -> Result<String> {
        let full = self.full_name(plugin.name(), name);
        self.services
            .create(plugin.name(), full.clone(), descriptor, handler)?;
        plugin.services.push(full.clone());
        self.notify("service.created", &full);
        Ok(full)
    }

    pub fn destroy_service(&mut self, owner: &str, full_name: &str) -> Result<()> {
        self.services.destroy(owner, full_name)?;
        if let Some(record) = self.plugin_record_mut(owner) {
            record.services.retain(|name| name != full_name);
        }
        self.notify("service.destroyed", full_name);
        Ok(())
    }

    /// Destroys `<owner>.<name>`.
    pub fn destroy_plugin_service(&mut self, owner: &str, name: &str) -> Result<()> {
        let full = self.full_name(owner, name);
        self.destroy_service(owner, &full)
    }

    pub fn get_service(&self, full_name: &str) -> Option<&Service> {
        self.services.get(full_name)
    }

    /// Invokes a service and stores its result in `ret`.
    ///
    /// A missing service is logged and skipped with `ret` left untouched.
    /// The handler's value is converted to the declared return type; nothing
    /// is written for services declared `void`.
    pub fn call(
        &self,
        service: &str,
        ret: &mut Option<ArgValue>,
        args: &ArgumentVector,
    ) -> Result<()> {
        let Some(target) = self.services.get(service) else {
            warn!("⚠️ Service '{}' does not exist, call skipped", service);
            return Err(PluginRuntimeError::NotFound(service.to_string()));
        };
        let descriptor = target.descriptor();
        if args.len() != descriptor.argc() {
            warn!(
                "⚠️ Service '{}' takes {} arguments, {} given",
                service,
                descriptor.argc(),
                args.len()
            );
            return Err(MarshalError::ArgumentCount {
                expected: descriptor.argc(),
                provided: args.len(),
            }
            .into());
        }

        self.services.record_call();
        let Some(value) = target.invoke(self, args) else {
            return Ok(());
        };
        match descriptor.ret() {
            ArgType::None => {
                debug!("🔇 Service '{}' is void, discarding its return value", service);
            }
            ty => *ret = Some(value.coerce(ty, 0)?),
        }
        Ok(())
    }

    /// Builds the arguments from Rust values and calls the service.
    pub fn call_values(&self, service: &str, values: Vec<ArgValue>) -> Result<Option<ArgValue>> {
        let args = self.service_args(service, |descriptor| {
            ArgumentVector::from_values(descriptor, values)
        })?;
        let mut ret = None;
        self.call(service, &mut ret, &args)?;
        Ok(ret)
    }

    /// Parses one token per argument with the service's descriptor and calls it.
    pub fn call_with_strings<S: AsRef<str>>(
        &self,
        service: &str,
        tokens: &[S],
    ) -> Result<Option<ArgValue>> {
        let args = self.service_args(service, |descriptor| {
            ArgumentVector::from_strings(descriptor, tokens)
        })?;
        let mut ret = None;
        self.call(service, &mut ret, &args)?;
        Ok(ret)
    }

    fn service_args(
        &self,
        service: &str,
        build: impl FnOnce(&TypeDescriptor) -> std::result::Result<ArgumentVector, MarshalError>,
    ) -> Result<ArgumentVector> {
        let Some(target) = self.services.get(service) else {
            warn!("⚠️ Service '{}' does not exist, call skipped", service);
            return Err(PluginRuntimeError::NotFound(service.to_string()));
        };
        build(target.descriptor()).map_err(|e| {
            warn!("⚠️ Bad arguments for service '{}': {}", service, e);
            e.into()
        })
    }

    // ---- global data ----

    /// Stores a per-plugin singleton under the hash of `plugin_name`.
    pub fn add_global<T: Any + Send + Sync>(&mut self, plugin_name: &str, value: T) -> Result<()> {
        let key = hash_str(plugin_name);
        self.global_data
            .insert(key, Box::new(value))
            .map_err(|_| {
                warn!("⚠️ Global data for '{}' already exists", plugin_name);
                PluginRuntimeError::DuplicateName(plugin_name.to_string())
            })
    }

    pub fn global<T: Any>(&self, plugin_name: &str) -> Option<&T> {
        self.global_data
            .get(hash_str(plugin_name))
            .and_then(|value| value.downcast_ref())
    }

    pub fn global_mut<T: Any>(&mut self, plugin_name: &str) -> Option<&mut T> {
        self.global_data
            .get_mut(hash_str(plugin_name))
            .and_then(|value| value.downcast_mut())
    }

    /// Takes a plugin's global back out. Leaves it in place if it is not a `T`.
    pub fn remove_global<T: Any>(&mut self, plugin_name: &str) -> Option<T> {
        let key = hash_str(plugin_name);
        if !self.global_data.get(key)?.is::<T>() {
            return None;
        }
        self.global_data
            .remove(key)
            .and_then(|value| value.downcast().ok())
            .map(|boxed| *boxed)
    }

    // ---- plugins ----

    pub fn plugin(&self, name: &str) -> Option<&LoadedPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Loaded plugins in load order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugin(name).is_some()
    }

    fn plugin_record_mut(&mut self, owner: &str) -> Option<&mut Plugin> {
        if owner == CORE_NAMESPACE {
            return Some(&mut self.core);
        }
        self.plugins
            .iter_mut()
            .find(|p| p.name() == owner)
            .map(|p| &mut p.plugin)
    }

    /// Unloads every plugin, most recently loaded first.
    pub fn shutdown(&mut self) {
        if self.plugins.is_empty() {
            return;
        }
        info!("🛑 Shutting down {} plugins", self.plugins.len());
        self.unload_remaining();
        info!("🧹 Plugin cleanup completed");
    }

    fn unload_remaining(&mut self) {
        while let Some(name) = self.plugins.last().map(|p| p.name().to_string()) {
            if let Err(e) = manager::unload_plugin(self, &name) {
                error!("❌ Failed to unload plugin {}: {}", name, e);
                self.plugins.retain(|p| p.name() != name);
            }
        }
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        self.events.clear();
        self.services.clear();
        self.unload_remaining();
        self.global_data.clear();
        debug!("🧹 Host '{}' destroyed", self.name);
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("name", &self.name)
            .field("network_role", &self.network_role)
            .field("state", &self.state())
            .field("events", &self.events.len())
            .field("services", &self.services.len())
            .field("plugins", &self.plugins.len())
            .field("global_data", &self.global_data.len())
            .finish()
    }
}

fn version_of_crate() -> Version {
    crate::PLUGIN_RUNTIME_VERSION.parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::FromArg;
    use std::sync::Mutex;

    fn host() -> HostContext {
        HostContext::new("test").unwrap()
    }

    fn plugin(name: &str) -> Plugin {
        Plugin::new(PluginInfo::new(name, Version::new(1, 0, 0)))
    }

    #[test]
    fn test_builtins_registered() {
        let host = host();
        for name in [
            "core.start",
            "core.pause",
            "core.exit",
            "core.tick",
            "core.render",
            "core.stats",
            "core.event.created",
            "core.service.destroyed",
        ] {
            assert!(host.get_event(name).is_some(), "{name}");
        }
        for name in ["core.start", "core.pause", "core.stop"] {
            assert!(host.get_service(name).is_some(), "{name}");
        }
        assert_eq!(host.core().events().len(), 10);
        assert_eq!(host.core().services().len(), 3);
        assert_eq!(host.state(), HostState::Paused);
    }

    #[test]
    fn test_rejects_word_delimiter() {
        let config = HostConfig {
            delimiter: 'x',
            ..HostConfig::default()
        };
        assert!(matches!(
            HostContext::with_config(config),
            Err(PluginRuntimeError::InvalidName(_))
        ));
    }

    #[test]
    fn test_custom_delimiter() {
        let mut host = HostContext::with_config(HostConfig {
            name: "slashy".into(),
            network_role: NetworkRole::Client,
            delimiter: '/',
        })
        .unwrap();
        assert!(host.get_event("core/tick").is_some());
        assert!(host.get_event("core/event/created").is_some());
        let mut p = plugin("net");
        let full = host.create_event(&mut p, "packet", TypeDescriptor::void()).unwrap();
        assert_eq!(full, "net/packet");
        assert_eq!(host.network_role(), NetworkRole::Client);
    }

    static CREATED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    fn on_created(_: &HostContext, _: &Event, args: &ArgumentVector) {
        let name: String = args.extract(0).unwrap();
        CREATED.lock().unwrap().push(name);
    }

    #[test_log::test]
    fn test_create_notifies_and_records() {
        let mut host = host();
        host.register_listener("watcher", "core.event.created", on_created)
            .unwrap();
        let mut p = plugin("notifier");
        host.create_event(&mut p, "ping", TypeDescriptor::void()).unwrap();
        assert_eq!(p.events(), ["notifier.ping".to_string()]);
        assert!(CREATED
            .lock()
            .unwrap()
            .contains(&"notifier.ping".to_string()));

        assert!(matches!(
            host.create_event(&mut p, "ping", TypeDescriptor::void()),
            Err(PluginRuntimeError::DuplicateName(_))
        ));
        assert!(matches!(
            host.create_event(&mut p, "bad name", TypeDescriptor::void()),
            Err(PluginRuntimeError::InvalidName(_))
        ));
        assert_eq!(p.events().len(), 1);
    }

    #[test]
    fn test_destroy_event_ownership() {
        let mut host = host();
        let mut p = plugin("owner");
        host.create_event(&mut p, "thing", TypeDescriptor::void()).unwrap();
        assert!(matches!(
            host.destroy_event("intruder", "owner.thing"),
            Err(PluginRuntimeError::OwnershipViolation(_))
        ));
        assert!(host.get_event("owner.thing").is_some());
        assert!(matches!(
            host.destroy_event("owner", "core.tick"),
            Err(PluginRuntimeError::OwnershipViolation(_))
        ));
        host.destroy_plugin_event("owner", "thing").unwrap();
        assert!(host.get_event("owner.thing").is_none());
    }

    #[test]
    fn test_destroy_event_spares_nested_names() {
        let mut host = host();
        let mut a = plugin("A");
        host.create_event(&mut a, "tick", TypeDescriptor::void()).unwrap();
        host.create_event(&mut a, "tick.fast", TypeDescriptor::void()).unwrap();
        for bad in ["", "x..y", "tick."] {
            assert!(matches!(
                host.create_event(&mut a, bad, TypeDescriptor::void()),
                Err(PluginRuntimeError::InvalidName(_))
            ));
        }

        host.destroy_event("A", "A.tick").unwrap();
        assert!(host.get_event("A.tick").is_none());
        assert_eq!(host.get_event("A.tick.fast").map(Event::owner), Some("A"));
    }

    fn add(_: &HostContext, _: &Service, args: &ArgumentVector) -> Option<ArgValue> {
        let a: i32 = args.extract(0).ok()?;
        let b: i32 = args.extract(1).ok()?;
        Some(ArgValue::from(a + b))
    }

    fn wide_add(_: &HostContext, _: &Service, args: &ArgumentVector) -> Option<ArgValue> {
        let a: i32 = args.extract(0).ok()?;
        Some(ArgValue::from(i64::from(a) * 2))
    }

    #[test]
    fn test_call_paths() {
        let mut host = host();
        let mut p = plugin("math");
        host.create_service(&mut p, "add", TypeDescriptor::new("int", &["int", "int"]), add)
            .unwrap();
        host.create_service(&mut p, "double", TypeDescriptor::new("int", &["int"]), wide_add)
            .unwrap();

        let args = ArgumentVector::from_values(
            host.get_service("math.add").unwrap().descriptor(),
            crate::args![2, 3],
        )
        .unwrap();
        let mut ret = None;
        host.call("math.add", &mut ret, &args).unwrap();
        assert_eq!(ret.as_ref().and_then(i32::from_arg), Some(5));

        // Return values are narrowed to the declared type.
        let doubled = host.call_values("math.double", crate::args![21]).unwrap();
        assert_eq!(doubled.as_ref().and_then(i32::from_arg), Some(42));

        let parsed = host.call_with_strings("math.add", &["40", "2"]).unwrap();
        assert_eq!(parsed.as_ref().and_then(i32::from_arg), Some(42));
        assert!(matches!(
            host.call_with_strings("math.add", &["forty", "2"]),
            Err(PluginRuntimeError::Marshaling(MarshalError::Parse { .. }))
        ));
        assert_eq!(host.services().calls(), 3);
    }

    #[test]
    fn test_missing_service_leaves_slot() {
        let host = host();
        let mut ret = Some(ArgValue::from(7));
        let result = host.call("nobody.home", &mut ret, &ArgumentVector::empty());
        assert!(matches!(result, Err(PluginRuntimeError::NotFound(_))));
        assert_eq!(ret.as_ref().and_then(i32::from_arg), Some(7));
    }

    #[test]
    fn test_builtin_services_drive_state() {
        let host = host();
        host.call_values("core.start", vec![]).unwrap();
        assert!(host.is_running());
        host.call_values("core.pause", vec![]).unwrap();
        assert_eq!(host.state(), HostState::Paused);
        host.call_values("core.stop", vec![]).unwrap();
        assert_eq!(host.state(), HostState::Terminated);
    }

    #[derive(Debug, PartialEq)]
    struct Counter(u32);

    #[test]
    fn test_global_data() {
        let mut host = host();
        host.add_global("counter", Counter(1)).unwrap();
        assert!(matches!(
            host.add_global("counter", Counter(2)),
            Err(PluginRuntimeError::DuplicateName(_))
        ));
        host.global_mut::<Counter>("counter").unwrap().0 += 1;
        assert_eq!(host.global::<Counter>("counter"), Some(&Counter(2)));
        assert!(host.global::<String>("counter").is_none());
        assert!(host.remove_global::<String>("counter").is_none());
        assert_eq!(host.remove_global::<Counter>("counter"), Some(Counter(2)));
        assert!(host.global::<Counter>("counter").is_none());
    }

    #[test]
    fn test_independent_hosts() {
        let mut server = HostContext::new("server").unwrap();
        let client = HostContext::new("client").unwrap();
        let mut p = plugin("world");
        server.create_event(&mut p, "spawn", TypeDescriptor::void()).unwrap();
        assert!(server.get_event("world.spawn").is_some());
        assert!(client.get_event("world.spawn").is_none());
    }
}
