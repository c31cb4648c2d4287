//! Bridge configuration, read once from the environment.
//!
//! Everything the runner and resolver need from the process environment
//! lives in [`BridgeConfig`]. Call sites never read environment variables
//! themselves, so tests can inject any configuration they like through
//! [`BridgeConfig::from_lookup`] or the `with_*` setters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::consts::{
    BINARY_OVERRIDE_VARS, DEFAULT_COMMAND_TIMEOUT, DEFAULT_HOME_DIR, DEFAULT_KILL_GRACE, HOME_VAR,
    TIMEOUT_OVERRIDE_VAR,
};

/// Settings shared by every invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Explicit engine path. Only used if it exists on disk.
    pub binary_override: Option<PathBuf>,
    /// Root that debug/release/packaged candidates are resolved against.
    pub install_root: PathBuf,
    /// State directory handed to the engine.
    pub home: PathBuf,
    /// Applied when a request does not carry its own timeout.
    pub command_timeout: Duration,
    /// Delay between the graceful signal and the forceful kill.
    pub kill_grace: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            binary_override: None,
            install_root: default_install_root(),
            home: default_home(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }
}

impl BridgeConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let binary_override = BINARY_OVERRIDE_VARS
            .iter()
            .find_map(|key| non_empty(key))
            .map(PathBuf::from);

        let command_timeout = non_empty(TIMEOUT_OVERRIDE_VAR)
            .and_then(|value| parse_timeout_ms(&value))
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT);

        let home = non_empty(HOME_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_home);

        Self {
            binary_override,
            command_timeout,
            home,
            ..Self::default()
        }
    }

    pub fn with_binary_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_override = Some(path.into());
        self
    }

    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = root.into();
        self
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Directory the engine writes its hook execution log into.
    pub fn logs_dir(&self) -> PathBuf {
        self.home.join(crate::consts::LOGS_DIR)
    }
}

/// Parse a millisecond count. Anything that is not a finite number above
/// zero is ignored.
pub fn parse_timeout_ms(value: &str) -> Option<Duration> {
    let millis: f64 = value.trim().parse().ok()?;
    if millis.is_finite() && millis > 0.0 {
        Some(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
    } else {
        None
    }
}

/// `~/.codex`, or a relative `.codex` when the home directory is unknown.
pub fn default_home() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_HOME_DIR))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME_DIR))
}

/// The directory above the one holding the running executable.
fn default_install_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
