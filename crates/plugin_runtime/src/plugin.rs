//! Plugin metadata, the module interface and loaded-plugin records

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::HostContext;
use crate::version::Version;

/// Language a plugin was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Unset,
    C,
    Cpp,
    D,
    Rust,
}

/// Self-reported plugin metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name, also the namespace prefix of everything it registers
    pub name: String,
    pub category: String,
    pub author: String,
    pub description: String,
    pub website: String,
    pub language: Language,
    pub version: Version,
}

impl PluginInfo {
    /// Create new plugin metadata
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            category: String::new(),
            author: String::new(),
            description: String::new(),
            website: String::new(),
            language: Language::Unset,
            version,
        }
    }

    /// Set category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set website
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }

    /// Set programming language
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

/// Plugin object handed back by a module's `init` entry point.
///
/// It records the full name of every event and service the plugin created
/// so they can all be torn down when the plugin unloads.
#[derive(Debug, Clone)]
pub struct Plugin {
    info: PluginInfo,
    pub(crate) events: Vec<String>,
    pub(crate) services: Vec<String>,
}

impl Plugin {
    pub fn new(info: PluginInfo) -> Self {
        Self {
            info,
            events: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn version(&self) -> Version {
        self.info.version
    }

    /// Full names of the events this plugin created.
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Full names of the services this plugin created.
    pub fn services(&self) -> &[String] {
        &self.services
    }
}

/// The four lifecycle entry points of a plugin module.
///
/// Dynamic libraries are adapted to this trait by the loader; statically
/// linked plugins implement it directly.
pub trait PluginModule: Send + Sync {
    /// Registers the plugin's events and services and returns its plugin
    /// object, or `None` on failure.
    fn init(&self, host: &mut HostContext) -> Option<Plugin>;

    /// Called once every plugin of a batch has been initialised. Listener
    /// registration belongs here.
    fn start(&self, host: &mut HostContext) -> bool;

    fn stop(&self, host: &mut HostContext);

    /// Last call before the module is released.
    fn deinit(&self, host: &mut HostContext);
}

/// Entry points given as plain functions, for plugins linked into the host.
#[derive(Clone, Copy)]
pub struct EntryPoints {
    pub init: fn(&mut HostContext) -> Option<Plugin>,
    pub start: fn(&mut HostContext) -> bool,
    pub stop: fn(&mut HostContext),
    pub deinit: fn(&mut HostContext),
}

impl PluginModule for EntryPoints {
    fn init(&self, host: &mut HostContext) -> Option<Plugin> {
        (self.init)(host)
    }

    fn start(&self, host: &mut HostContext) -> bool {
        (self.start)(host)
    }

    fn stop(&self, host: &mut HostContext) {
        (self.stop)(host)
    }

    fn deinit(&self, host: &mut HostContext) {
        (self.deinit)(host)
    }
}

/// Lifecycle state of a loaded plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Loaded,
    Started,
    Stopped,
}

/// A plugin held by a host context, together with the module that backs it.
pub struct LoadedPlugin {
    pub(crate) plugin: Plugin,
    pub(crate) module: Option<Arc<dyn PluginModule>>,
    pub(crate) state: PluginState,
    pub(crate) started_successfully: bool,
    pub(crate) path: Option<PathBuf>,
}

impl LoadedPlugin {
    pub(crate) fn new(plugin: Plugin, module: Arc<dyn PluginModule>, path: Option<PathBuf>) -> Self {
        Self {
            plugin,
            module: Some(module),
            state: PluginState::Loaded,
            started_successfully: false,
            path,
        }
    }

    pub fn plugin(&self) -> &Plugin {
        &self.plugin
    }

    pub fn info(&self) -> &PluginInfo {
        self.plugin.info()
    }

    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn started_successfully(&self) -> bool {
        self.started_successfully
    }

    /// File the plugin was loaded from; `None` for linked-in modules.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("plugin", &self.plugin)
            .field("state", &self.state)
            .field("started_successfully", &self.started_successfully)
            .field("path", &self.path)
            .finish()
    }
}
