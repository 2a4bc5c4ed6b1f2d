//! # Plugin Runtime
//!
//! A process-local plugin runtime. A host loads independently compiled
//! plugins at run time and lets them find and call each other by name,
//! without any compile-time linkage between them.
//!
//! ## Key Features
//!
//! - **Namespace Tree**: dotted-path directory of everything plugins publish
//! - **Typed Calls**: type descriptors and tagged argument vectors for calls across the boundary
//! - **Event Bus**: broadcast channels with function-pointer listeners
//! - **Service Bus**: named synchronous callables with a single handler
//! - **Lifecycle Management**: version-resolved loading, start/stop, ordered teardown
//! - **Safety**: all `unsafe` lives in the loader; panics never cross plugin entry points
//!
//! ## Architecture
//!
//! - **HostContext**: one running instance; owns both trees, the plugin list
//!   and per-plugin global data. Several can coexist in a process.
//! - **PluginModule**: the four lifecycle entry points (`init`, `start`,
//!   `stop`, `deinit`) as a trait. Libraries opened by the loader implement
//!   it through [`DynamicModule`]; linked-in plugins implement it directly.
//! - **PluginManager**: finds plugin files, resolves versions and sequences
//!   lifecycles against a host.
//!
//! ## Usage Example
//!
//! ```rust
//! use plugin_runtime::*;
//!
//! fn add(_: &HostContext, _: &Service, args: &ArgumentVector) -> Option<ArgValue> {
//!     let a: i32 = args.extract(0).ok()?;
//!     let b: i32 = args.extract(1).ok()?;
//!     Some(ArgValue::from(a + b))
//! }
//!
//! fn init(host: &mut HostContext) -> Option<Plugin> {
//!     let mut plugin = Plugin::new(PluginInfo::new("math", Version::new(1, 0, 0)));
//!     host.create_service(&mut plugin, "add", TypeDescriptor::new("int", &["int", "int"]), add)
//!         .ok()?;
//!     Some(plugin)
//! }
//!
//! fn start(_: &mut HostContext) -> bool { true }
//! fn noop(_: &mut HostContext) {}
//!
//! let mut host = HostContext::new("example")?;
//! let manager = PluginManager::default();
//! let module = EntryPoints { init, start, stop: noop, deinit: noop };
//! manager.load_module(&mut host, "math", std::sync::Arc::new(module), None, None)?;
//! manager.start(&mut host, "math")?;
//!
//! let sum = host.call_values("math.add", args![2, 3])?;
//! assert_eq!(sum.as_ref().and_then(i32::from_arg), Some(5));
//! # Ok::<(), PluginRuntimeError>(())
//! ```

pub mod container;
pub mod context;
pub mod error;
pub mod event;
pub mod loader;
pub mod macros;
pub mod manager;
pub mod marshal;
pub mod namespace;
pub mod plugin;
pub mod service;
pub mod utils;
pub mod version;

// Re-exports for convenience
pub use container::{HashedVec, SortedVec};
pub use context::{HostConfig, HostContext, HostState, NetworkRole, CORE_NAMESPACE};
pub use error::PluginRuntimeError;
pub use event::{Event, EventBus, EventListener, EventStats};
pub use loader::{DynamicModule, ABI_VERSION};
pub use manager::{Candidate, LoadReport, PluginEntry, PluginManager, PluginManagerConfig};
pub use marshal::{ArgType, ArgValue, ArgumentVector, FromArg, MarshalError, TypeDescriptor};
pub use namespace::{
    is_valid_name, is_valid_path, NamespaceError, NamespaceTree, NodeId, NodeValue,
};
pub use plugin::{
    EntryPoints, Language, LoadedPlugin, Plugin, PluginInfo, PluginModule, PluginState,
};
pub use service::{Service, ServiceBus, ServiceHandler};
pub use version::{ParseVersionError, Version, VersionPolicy};

/// Version of this crate. Plugin libraries must be built against the same one.
pub const PLUGIN_RUNTIME_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the runtime
pub type Result<T> = std::result::Result<T, PluginRuntimeError>;
