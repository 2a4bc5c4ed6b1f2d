//! Event bus: named broadcast channels stored in a namespace tree.
//!
//! Every event belongs to the plugin that created it and lives at
//! `<plugin>.<name>` in the host's event tree. Listeners are plain function
//! pointers; two registrations are the same listener exactly when they point
//! at the same function.

use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::context::HostContext;
use crate::error::PluginRuntimeError;
use crate::marshal::{ArgumentVector, TypeDescriptor};
use crate::namespace::{is_valid_path, NamespaceTree, NodeValue};
use crate::Result;

/// Listener callback. Receives the firing host, the event and the payload.
pub type EventListener = fn(host: &HostContext, event: &Event, args: &ArgumentVector);

/// One registered listener
#[derive(Clone, Copy)]
struct Listener {
    callback: EventListener,
}

impl Listener {
    fn is(&self, callback: EventListener) -> bool {
        self.callback as usize == callback as usize
    }
}

/// A named broadcast channel
pub struct Event {
    owner: String,
    name: String,
    descriptor: TypeDescriptor,
    listeners: SmallVec<[Listener; 4]>,
    /// Namespace of the plugin that registered each listener, index-aligned with `listeners`
    listener_namespaces: SmallVec<[String; 4]>,
}

impl Event {
    fn new(owner: &str, name: String, descriptor: TypeDescriptor) -> Self {
        Self {
            owner: owner.to_string(),
            name,
            descriptor,
            listeners: SmallVec::new(),
            listener_namespaces: SmallVec::new(),
        }
    }

    /// Name of the owning plugin.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Full dotted name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn has_listener(&self, callback: EventListener) -> bool {
        self.listeners.iter().any(|l| l.is(callback))
    }

    /// Removes the listener at `index` by moving the last listener into its
    /// slot. Delivery order afterwards is storage order, not registration order.
    fn swap_remove(&mut self, index: usize) {
        self.listeners.swap_remove(index);
        self.listener_namespaces.swap_remove(index);
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn in_namespace(name_space: &str, prefix: &str, delimiter: char) -> bool {
    name_space
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(delimiter))
}

/// Statistics for event system monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStats {
    pub events_fired: u64,
    pub listeners_invoked: u64,
    pub total_events: usize,
    pub total_listeners: usize,
}

/// All events of one host, addressed by full dotted name.
pub struct EventBus {
    tree: NamespaceTree<Event>,
    events_fired: AtomicU64,
    listeners_invoked: AtomicU64,
}

impl EventBus {
    pub fn new(delimiter: char) -> Self {
        Self {
            tree: NamespaceTree::with_delimiter(delimiter),
            events_fired: AtomicU64::new(0),
            listeners_invoked: AtomicU64::new(0),
        }
    }

    pub fn delimiter(&self) -> char {
        self.tree.delimiter()
    }

    /// Inserts a new event under `full_name`.
    pub(crate) fn create(
        &mut self,
        owner: &str,
        full_name: String,
        descriptor: TypeDescriptor,
    ) -> Result<()> {
        if !is_valid_path(&full_name, self.delimiter()) {
            warn!("⚠️ Invalid event name: '{}'", full_name);
            return Err(PluginRuntimeError::InvalidName(full_name));
        }
        if self.tree.get(&full_name).is_some() {
            warn!("⚠️ Event '{}' already exists", full_name);
            return Err(PluginRuntimeError::DuplicateName(full_name));
        }
        let event = Event::new(owner, full_name.clone(), descriptor);
        self.tree.set(&full_name, NodeValue::owned(event))?;
        debug!("📝 Registered event '{}'", full_name);
        Ok(())
    }

    pub fn get(&self, full_name: &str) -> Option<&Event> {
        self.tree.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.get(full_name).is_some()
    }

    /// Removes an event after checking that `owner` really owns it.
    pub(crate) fn destroy(&mut self, owner: &str, full_name: &str) -> Result<Event> {
        let event = self.tree.get(full_name).ok_or_else(|| {
            warn!("⚠️ Destroying event '{}' that is not registered with this host", full_name);
            PluginRuntimeError::NotFound(full_name.to_string())
        })?;
        if event.owner != owner {
            warn!(
                "⚠️ '{}' tried to destroy event '{}' owned by '{}'",
                owner, full_name, event.owner
            );
            return Err(PluginRuntimeError::OwnershipViolation(format!(
                "event '{full_name}' is owned by '{}', not '{owner}'",
                event.owner
            )));
        }
        let removed = self.tree.remove_value(full_name)?;
        removed
            .and_then(NodeValue::into_owned)
            .ok_or_else(|| PluginRuntimeError::NotFound(full_name.to_string()))
    }

    /// Adds `callback` to an event's listeners. `name_space` identifies the
    /// registering plugin for bulk removal.
    pub(crate) fn register_listener(
        &mut self,
        name_space: &str,
        event_name: &str,
        callback: EventListener,
    ) -> Result<()> {
        let Some(event) = self.tree.get_mut(event_name) else {
            warn!(
                "⚠️ '{}' tried to listen to event '{}', but the event does not exist",
                name_space, event_name
            );
            return Err(PluginRuntimeError::NotFound(event_name.to_string()));
        };
        if event.has_listener(callback) {
            warn!("⚠️ '{}' is already listening to event '{}'", name_space, event_name);
            return Err(PluginRuntimeError::DuplicateName(format!(
                "listener on {event_name}"
            )));
        }
        event.listeners.push(Listener { callback });
        event.listener_namespaces.push(name_space.to_string());
        debug!("📝 '{}' listens to '{}'", name_space, event_name);
        Ok(())
    }

    pub(crate) fn unregister_listener(
        &mut self,
        event_name: &str,
        callback: EventListener,
    ) -> Result<()> {
        let event = self
            .tree
            .get_mut(event_name)
            .ok_or_else(|| PluginRuntimeError::NotFound(event_name.to_string()))?;
        let index = event
            .listeners
            .iter()
            .position(|l| l.is(callback))
            .ok_or_else(|| PluginRuntimeError::NotFound(format!("listener on {event_name}")))?;
        event.swap_remove(index);
        Ok(())
    }

    /// Drops every listener of one event.
    pub(crate) fn unregister_all_listeners(&mut self, event_name: &str) -> Result<usize> {
        let event = self
            .tree
            .get_mut(event_name)
            .ok_or_else(|| PluginRuntimeError::NotFound(event_name.to_string()))?;
        let count = event.listeners.len();
        event.listeners.clear();
        event.listener_namespaces.clear();
        Ok(count)
    }

    /// Drops, on every event, the listeners registered by `prefix` or by any
    /// namespace below it.
    pub(crate) fn unregister_namespace_listeners(&mut self, prefix: &str) -> usize {
        let delimiter = self.delimiter();
        let mut removed = 0;
        for event in self.tree.values_mut() {
            let mut index = 0;
            while index < event.listeners.len() {
                if in_namespace(&event.listener_namespaces[index], prefix, delimiter) {
                    event.swap_remove(index);
                    removed += 1;
                } else {
                    index += 1;
                }
            }
        }
        removed
    }

    /// Invokes every listener once with the same arguments, in storage order.
    pub(crate) fn fire(&self, host: &HostContext, event_name: &str, args: &ArgumentVector) -> usize {
        let Some(event) = self.get(event_name) else {
            debug!("🔇 Event '{}' does not exist, nothing fired", event_name);
            return 0;
        };
        self.events_fired.fetch_add(1, Ordering::Relaxed);
        for listener in &event.listeners {
            (listener.callback)(host, event, args);
        }
        let count = event.listeners.len();
        self.listeners_invoked
            .fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Full names of every registered event.
    pub fn names(&self) -> Vec<String> {
        self.tree.entries().into_iter().map(|(path, _)| path).collect()
    }

    pub fn len(&self) -> usize {
        self.tree.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn tree(&self) -> &NamespaceTree<Event> {
        &self.tree
    }

    pub fn stats(&self) -> EventStats {
        let entries = self.tree.entries();
        EventStats {
            events_fired: self.events_fired.load(Ordering::Relaxed),
            listeners_invoked: self.listeners_invoked.load(Ordering::Relaxed),
            total_events: entries.len(),
            total_listeners: entries.iter().map(|(_, e)| e.listener_count()).sum(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.tree.clear();
    }
}
