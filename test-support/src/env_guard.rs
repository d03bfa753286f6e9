//! Scoped environment variables for tests.
//!
//! Mutating the process environment is only sound while no other thread reads
//! it, so every test using [`EnvVarGuard`] must run under
//! `#[serial_test::serial]`.

use std::ffi::OsString;

/// Sets or removes a variable and restores the previous state on drop.
#[derive(Debug)]
pub struct EnvVarGuard {
    key: String,
    original: Option<OsString>,
}

impl EnvVarGuard {
    /// Set `key` to `value` until the guard is dropped.
    pub fn set(key: &str, value: &str) -> Self {
        let guard = Self::capture(key);
        set_env_var(key, value);
        guard
    }

    /// Remove `key` until the guard is dropped.
    pub fn remove(key: &str) -> Self {
        let guard = Self::capture(key);
        remove_env_var(key);
        guard
    }

    fn capture(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            original: std::env::var_os(key),
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match self.original.take() {
            Some(v) => set_env_var(&self.key, v),
            None => remove_env_var(&self.key),
        }
    }
}

pub(crate) fn set_env_var(key: &str, value: impl AsRef<std::ffi::OsStr>) {
    // SAFETY: callers hold the serial test lock.
    unsafe { std::env::set_var(key, value) };
}

pub(crate) fn remove_env_var(key: &str) {
    // SAFETY: callers hold the serial test lock.
    unsafe { std::env::remove_var(key) };
}
