//! Service bus: named typed callables, one handler each.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::context::HostContext;
use crate::error::PluginRuntimeError;
use crate::marshal::{ArgValue, ArgumentVector, TypeDescriptor};
use crate::namespace::{is_valid_path, NamespaceTree, NodeValue};
use crate::Result;

/// Service implementation. Returns `None` for services declared `void`.
pub type ServiceHandler =
    fn(host: &HostContext, service: &Service, args: &ArgumentVector) -> Option<ArgValue>;

/// A named callable with a fixed type descriptor
pub struct Service {
    owner: String,
    name: String,
    descriptor: TypeDescriptor,
    handler: ServiceHandler,
}

impl Service {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub(crate) fn invoke(&self, host: &HostContext, args: &ArgumentVector) -> Option<ArgValue> {
        (self.handler)(host, self, args)
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

/// All services of one host, addressed by full dotted name.
pub struct ServiceBus {
    tree: NamespaceTree<Service>,
    calls: AtomicU64,
}

impl ServiceBus {
    pub fn new(delimiter: char) -> Self {
        Self {
            tree: NamespaceTree::with_delimiter(delimiter),
            calls: AtomicU64::new(0),
        }
    }

    pub fn delimiter(&self) -> char {
        self.tree.delimiter()
    }

    pub(crate) fn create(
        &mut self,
        owner: &str,
        full_name: String,
        descriptor: TypeDescriptor,
        handler: ServiceHandler,
    ) -> Result<()> {
        if !is_valid_path(&full_name, self.delimiter()) {
            warn!("⚠️ Invalid service name: '{}'", full_name);
            return Err(PluginRuntimeError::InvalidName(full_name));
        }
        if self.tree.get(&full_name).is_some() {
            warn!("⚠️ Service '{}' already exists", full_name);
            return Err(PluginRuntimeError::DuplicateName(full_name));
        }
        let service = Service {
            owner: owner.to_string(),
            name: full_name.clone(),
            descriptor,
            handler,
        };
        self.tree.set(&full_name, NodeValue::owned(service))?;
        debug!("📝 Registered service '{}'", full_name);
        Ok(())
    }

    pub fn get(&self, full_name: &str) -> Option<&Service> {
        self.tree.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.get(full_name).is_some()
    }

    /// Removes a service after checking that `owner` really owns it.
    pub(crate) fn destroy(&mut self, owner: &str, full_name: &str) -> Result<Service> {
        let service = self.tree.get(full_name).ok_or_else(|| {
            warn!("⚠️ Destroying service '{}' that is not registered with this host", full_name);
            PluginRuntimeError::NotFound(full_name.to_string())
        })?;
        if service.owner != owner {
            warn!(
                "⚠️ '{}' tried to destroy service '{}' owned by '{}'",
                owner, full_name, service.owner
            );
            return Err(PluginRuntimeError::OwnershipViolation(format!(
                "service '{full_name}' is owned by '{}', not '{owner}'",
                service.owner
            )));
        }
        self.tree
            .remove_value(full_name)?
            .and_then(NodeValue::into_owned)
            .ok_or_else(|| PluginRuntimeError::NotFound(full_name.to_string()))
    }

    pub(crate) fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of calls dispatched so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn names(&self) -> Vec<String> {
        self.tree.entries().into_iter().map(|(path, _)| path).collect()
    }

    pub fn len(&self) -> usize {
        self.tree.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn tree(&self) -> &NamespaceTree<Service> {
        &self.tree
    }

    pub(crate) fn clear(&mut self) {
        self.tree.clear();
    }
}
