//! Environment variable helpers for tests that read process configuration.

use std::ffi::OsString;

/// RAII guard that sets (or removes) an environment variable and restores
/// the original value on drop.
///
/// # Safety
/// This modifies the process environment. Tests using this should be marked
/// with `#[serial]`.
pub struct EnvGuard {
    name: &'static str,
    original: Option<OsString>,
}

impl EnvGuard {
    pub fn set(name: &'static str, value: &str) -> Self {
        let original = std::env::var_os(name);
        // SAFETY: Tests using this should be marked #[serial] to ensure single-threaded access
        unsafe { std::env::set_var(name, value) };
        Self { name, original }
    }

    pub fn remove(name: &'static str) -> Self {
        let original = std::env::var_os(name);
        // SAFETY: Tests using this should be marked #[serial] to ensure single-threaded access
        unsafe { std::env::remove_var(name) };
        Self { name, original }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: Drop runs during test teardown. Tests using EnvGuard should be
        // marked #[serial] to ensure single-threaded access to environment variables.
        match &self.original {
            Some(val) => unsafe { std::env::set_var(self.name, val) },
            None => unsafe { std::env::remove_var(self.name) },
        }
    }
}
