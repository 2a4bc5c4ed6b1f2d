//! Dynamic library boundary.
//!
//! This is the only place that touches `libloading` or raw entry points. A
//! plugin library exports five C-ABI symbols (see [`export_plugin!`]); they
//! are resolved once and wrapped in a [`DynamicModule`] that the rest of the
//! runtime drives through the safe [`PluginModule`] trait.
//!
//! [`export_plugin!`]: crate::export_plugin

use std::ffi::{c_char, CStr};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{debug, error};

use crate::context::HostContext;
use crate::error::PluginRuntimeError;
use crate::plugin::{Plugin, PluginModule};
use crate::Result;

pub const INIT_SYMBOL: &[u8] = b"plugin_init\0";
pub const START_SYMBOL: &[u8] = b"plugin_start\0";
pub const STOP_SYMBOL: &[u8] = b"plugin_stop\0";
pub const DEINIT_SYMBOL: &[u8] = b"plugin_deinit\0";
pub const VERSION_SYMBOL: &[u8] = b"plugin_runtime_version\0";

/// Runtime version a plugin library was built against, NUL terminated.
/// Libraries built against another version are refused, since `HostContext`
/// and `Plugin` cross the boundary by pointer.
pub const ABI_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

pub type InitFn = unsafe extern "C" fn(host: *mut HostContext) -> *mut Plugin;
pub type StartFn = unsafe extern "C" fn(host: *mut HostContext) -> bool;
pub type StopFn = unsafe extern "C" fn(host: *mut HostContext);
pub type DeinitFn = unsafe extern "C" fn(host: *mut HostContext);
pub type VersionFn = unsafe extern "C" fn() -> *const c_char;

/// A plugin library opened from disk.
///
/// The entry points stay valid for as long as `library` is alive; dropping
/// the module closes the library.
pub struct DynamicModule {
    init: InitFn,
    start: StartFn,
    stop: StopFn,
    deinit: DeinitFn,
    path: PathBuf,
    _library: Library,
}

impl DynamicModule {
    /// Opens `path`, checks its runtime version and resolves the four
    /// lifecycle entry points.
    pub fn open(path: &Path) -> Result<Self> {
        let library = unsafe {
            Library::new(path).map_err(|e| {
                error!("❌ Failed to open {}: {}", path.display(), e);
                PluginRuntimeError::LibraryError(format!("Failed to load library: {e}"))
            })?
        };

        let built_against = unsafe {
            let version: Symbol<VersionFn> = library.get(VERSION_SYMBOL).map_err(|e| {
                PluginRuntimeError::LoadingFailed(format!(
                    "Plugin does not export 'plugin_runtime_version': {e}"
                ))
            })?;
            let ptr = version();
            if ptr.is_null() {
                return Err(PluginRuntimeError::LoadingFailed(
                    "Plugin returned null runtime version".to_string(),
                ));
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        };
        let expected = ABI_VERSION.trim_end_matches('\0');
        if built_against != expected {
            error!(
                "❌ {} was built against plugin_runtime {}, host runs {}",
                path.display(),
                built_against,
                expected
            );
            return Err(PluginRuntimeError::LoadingFailed(format!(
                "runtime version mismatch: plugin {built_against}, host {expected}"
            )));
        }

        let (init, start, stop, deinit) = unsafe {
            (
                *resolve::<InitFn>(&library, INIT_SYMBOL)?,
                *resolve::<StartFn>(&library, START_SYMBOL)?,
                *resolve::<StopFn>(&library, STOP_SYMBOL)?,
                *resolve::<DeinitFn>(&library, DEINIT_SYMBOL)?,
            )
        };
        debug!("📚 Opened plugin library {}", path.display());

        Ok(Self {
            init,
            start,
            stop,
            deinit,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

unsafe fn resolve<'lib, T>(library: &'lib Library, symbol: &[u8]) -> Result<Symbol<'lib, T>> {
    library.get(symbol).map_err(|e| {
        let name = String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol));
        PluginRuntimeError::LoadingFailed(format!("Plugin does not export '{name}': {e}"))
    })
}

impl PluginModule for DynamicModule {
    fn init(&self, host: &mut HostContext) -> Option<Plugin> {
        let raw = unsafe { (self.init)(host) };
        if raw.is_null() {
            return None;
        }
        // The plugin object was allocated by `export_plugin!` with Box::into_raw.
        Some(*unsafe { Box::from_raw(raw) })
    }

    fn start(&self, host: &mut HostContext) -> bool {
        unsafe { (self.start)(host) }
    }

    fn stop(&self, host: &mut HostContext) {
        unsafe { (self.stop)(host) }
    }

    fn deinit(&self, host: &mut HostContext) {
        unsafe { (self.deinit)(host) }
    }
}

impl Drop for DynamicModule {
    fn drop(&mut self) {
        debug!("📚 Closing plugin library {}", self.path.display());
    }
}

impl std::fmt::Debug for DynamicModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicModule").field("path", &self.path).finish()
    }
}
