//! Utility functions and helpers

/// Jenkins one-at-a-time hash over raw bytes.
pub fn jenkins_one_at_a_time(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0;
    for &byte in bytes {
        hash = hash.wrapping_add(u32::from(byte));
        hash = hash.wrapping_add(hash << 10);
        hash ^= hash >> 6;
    }
    hash = hash.wrapping_add(hash << 3);
    hash ^= hash >> 11;
    hash.wrapping_add(hash << 15)
}

/// Hash a string key the way every string-keyed container in this crate does
/// unless a container was built with its own hasher.
pub fn hash_str(key: &str) -> u32 {
    jenkins_one_at_a_time(key.as_bytes())
}

/// Run a closure coming from plugin code, turning a panic into `None`.
pub(crate) fn guard_panic<R>(what: &str, f: impl FnOnce() -> R) -> Option<R> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("💥 {} panicked: {}", what, message);
            None
        }
    }
}
