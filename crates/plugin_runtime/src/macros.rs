//! Macros for plugin development

/// Exports the C-ABI entry points a host looks for in a plugin library.
///
/// `$plugin_type` must implement [`PluginModule`](crate::PluginModule) and
/// `Default`. A fresh value is built for every entry point call, so the type
/// carries no state of its own; per-host state belongs in the host's global
/// data. Panics never cross the boundary: a panicking `init` reports failure
/// with a null plugin, a panicking `start` reports `false`.
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Greeter;
///
/// impl plugin_runtime::PluginModule for Greeter { /* ... */ }
///
/// plugin_runtime::export_plugin!(Greeter);
/// ```
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        /// Runtime version this library was built against
        #[no_mangle]
        pub extern "C" fn plugin_runtime_version() -> *const ::std::ffi::c_char {
            $crate::loader::ABI_VERSION.as_ptr().cast()
        }

        #[no_mangle]
        pub unsafe extern "C" fn plugin_init(
            host: *mut $crate::HostContext,
        ) -> *mut $crate::Plugin {
            let Some(host) = (unsafe { host.as_mut() }) else {
                return ::std::ptr::null_mut();
            };
            match ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                $crate::PluginModule::init(&<$plugin_type as Default>::default(), host)
            })) {
                Ok(Some(plugin)) => Box::into_raw(Box::new(plugin)),
                Ok(None) => ::std::ptr::null_mut(),
                Err(panic_info) => {
                    eprintln!("Plugin init panicked: {:?}", panic_info);
                    ::std::ptr::null_mut()
                }
            }
        }

        #[no_mangle]
        pub unsafe extern "C" fn plugin_start(host: *mut $crate::HostContext) -> bool {
            let Some(host) = (unsafe { host.as_mut() }) else {
                return false;
            };
            ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                $crate::PluginModule::start(&<$plugin_type as Default>::default(), host)
            }))
            .unwrap_or_else(|panic_info| {
                eprintln!("Plugin start panicked: {:?}", panic_info);
                false
            })
        }

        #[no_mangle]
        pub unsafe extern "C" fn plugin_stop(host: *mut $crate::HostContext) {
            if let Some(host) = unsafe { host.as_mut() } {
                let _ = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                    $crate::PluginModule::stop(&<$plugin_type as Default>::default(), host)
                }));
            }
        }

        #[no_mangle]
        pub unsafe extern "C" fn plugin_deinit(host: *mut $crate::HostContext) {
            if let Some(host) = unsafe { host.as_mut() } {
                let _ = ::std::panic::catch_unwind(::std::panic::AssertUnwindSafe(|| {
                    $crate::PluginModule::deinit(&<$plugin_type as Default>::default(), host)
                }));
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::context::HostContext;
    use crate::marshal::TypeDescriptor;
    use crate::plugin::{Plugin, PluginInfo, PluginModule};
    use crate::version::Version;

    #[derive(Default)]
    struct Exported;

    impl PluginModule for Exported {
        fn init(&self, host: &mut HostContext) -> Option<Plugin> {
            let mut plugin = Plugin::new(PluginInfo::new("exported", Version::new(0, 1, 0)));
            host.create_event(&mut plugin, "ready", TypeDescriptor::void()).ok()?;
            Some(plugin)
        }

        fn start(&self, _host: &mut HostContext) -> bool {
            panic!("start blew up");
        }

        fn stop(&self, _host: &mut HostContext) {}

        fn deinit(&self, _host: &mut HostContext) {}
    }

    mod exported {
        crate::export_plugin!(super::Exported);
    }

    #[test]
    fn test_exported_entry_points() {
        let mut host = HostContext::new("macro").unwrap();
        let raw = unsafe { exported::plugin_init(&mut host) };
        assert!(!raw.is_null());
        let plugin = unsafe { Box::from_raw(raw) };
        assert_eq!(plugin.name(), "exported");
        assert!(host.get_event("exported.ready").is_some());

        // A panicking start is reported as a failed start.
        assert!(!unsafe { exported::plugin_start(&mut host) });
        assert!(unsafe { exported::plugin_init(std::ptr::null_mut()) }.is_null());

        let version = unsafe { std::ffi::CStr::from_ptr(exported::plugin_runtime_version()) };
        assert_eq!(version.to_str().unwrap(), crate::PLUGIN_RUNTIME_VERSION);
    }
}
