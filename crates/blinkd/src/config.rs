//! Configuration loading for Blink.
//!
//! Every value has a built-in default and may be overridden by an
//! environment variable using the `BLINK_` prefix, e.g.
//! `BLINK_IDLE_TIMEOUT_SECS=60`.

use figment::Figment;
use figment::providers::Env;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default idle window in seconds before the server shuts itself down.
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 15 * 60;
/// Default time in seconds in-flight responses get once the window elapses.
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
/// Default listening address.
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// How the supervisor starts the server role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMode {
    /// Re-execute this binary as a detached session leader.
    #[default]
    Process,
    /// Run the server as a task inside the supervisor process.
    InProcess,
}

/// Runtime configuration shared by both roles.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
pub struct Config {
    /// Idle window in seconds; every request restarts it.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Grace period in seconds for in-flight responses after the window.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
    /// Loopback address to listen on.
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Process or in-process server.
    #[serde(default)]
    pub launch: LaunchMode,
    /// Return as soon as the URL is printed instead of supervising.
    #[serde(default)]
    pub detach: bool,
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_shutdown_grace_secs() -> u64 {
    DEFAULT_SHUTDOWN_GRACE_SECS
}

fn default_host() -> IpAddr {
    DEFAULT_HOST
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            shutdown_grace_secs: DEFAULT_SHUTDOWN_GRACE_SECS,
            host: DEFAULT_HOST,
            launch: LaunchMode::default(),
            detach: false,
        }
    }
}

impl Config {
    /// Prefix of the environment variables read by [`Config::load`].
    pub const ENV_PREFIX: &'static str = "BLINK_";

    /// Load the configuration from `BLINK_*` environment variables.
    ///
    /// # Errors
    /// Fails when a variable cannot be parsed or a value is out of range.
    #[expect(clippy::result_large_err, reason = "propagate figment errors")]
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_figment(Figment::new().merge(Env::prefixed(Self::ENV_PREFIX)))
    }

    /// Extract and validate a configuration from `figment`.
    ///
    /// # Errors
    /// See [`Config::load`].
    #[expect(clippy::result_large_err, reason = "propagate figment errors")]
    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        let cfg: Self = figment.extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    #[expect(clippy::result_large_err, reason = "propagate figment errors")]
    fn validate(&self) -> Result<(), figment::Error> {
        use serde::de::Error as _;
        if self.idle_timeout_secs == 0 {
            return Err(figment::Error::custom("idle_timeout_secs must be positive"));
        }
        if !self.host.is_loopback() {
            return Err(figment::Error::custom(format!(
                "host {} is not a loopback address",
                self.host
            )));
        }
        Ok(())
    }

    /// The idle window as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// The shutdown grace period as a [`Duration`].
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
