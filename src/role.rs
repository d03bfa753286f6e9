//! Role selection from the process environment.

use std::collections::HashMap;

/// Environment variable present (as `1`) only in the background server.
pub const MARKER_VAR: &str = "BLINK_CHILD";

/// Environment variable enabling debug behaviour when set to `1`.
pub const DEBUG_VAR: &str = "DEBUG";

/// Read-only view of environment variables.
pub trait EnvSource {
    /// Value of `key`, if set and valid Unicode.
    fn var(&self, key: &str) -> Option<String>;

    /// Whether `key` is set to exactly `1`.
    fn flag(&self, key: &str) -> bool {
        self.var(key).is_some_and(|v| v == "1")
    }
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Which half of the protocol this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Foreground: spawn the server, print its URL, forward interrupts.
    Supervisor,
    /// Background: serve the content until idle.
    Server,
}

impl Role {
    /// Determine the role from `env`.
    ///
    /// # Examples
    ///
    /// ```
    /// use blink_lib::{MARKER_VAR, Role};
    /// use std::collections::HashMap;
    ///
    /// let env = HashMap::from([(MARKER_VAR.to_owned(), "1".to_owned())]);
    /// assert_eq!(Role::detect(&env), Role::Server);
    /// assert_eq!(Role::detect(&HashMap::new()), Role::Supervisor);
    /// ```
    pub fn detect(env: &impl EnvSource) -> Self {
        if env.flag(MARKER_VAR) {
            Self::Server
        } else {
            Self::Supervisor
        }
    }
}

/// Whether `DEBUG=1` is set in `env`.
pub fn debug_enabled(env: &impl EnvSource) -> bool {
    env.flag(DEBUG_VAR)
}
