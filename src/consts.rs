//! Project-wide constants.

use std::time::Duration;

/// Environment variables consulted, in order, for an explicit engine path.
pub const BINARY_OVERRIDE_VARS: &[&str] =
    &["CODEX_CLI_BIN", "CODEX_CLI_BINARY", "CODEX_DEV_CLI_BIN"];

/// Milliseconds; must parse as a finite number greater than zero.
pub const TIMEOUT_OVERRIDE_VAR: &str = "CODEX_AGENTS_TIMEOUT_MS";

/// State directory override. Also exported to the child.
pub const HOME_VAR: &str = "CODEX_HOME";

/// Flags telling the engine it is driven programmatically.
pub const MANAGED_FLAGS: &[(&str, &str)] = &[
    ("CODEX_MANAGED_BY_NPM", "1"),
    ("CODEX_NON_INTERACTIVE", "1"),
];

/// Default state directory name under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".codex";

/// Subdirectory of the state directory the engine writes logs into.
pub const LOGS_DIR: &str = "logs";

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Time between the graceful termination signal and the forceful kill.
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(5);

/// Exit code reported when the process ended without one (killed by a signal).
pub const SIGNAL_EXIT_CODE: i32 = 1;

/// Engine executable name for the running platform.
pub fn binary_name() -> &'static str {
    if cfg!(windows) { "codex.exe" } else { "codex" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_are_non_empty() {
        assert!(!BINARY_OVERRIDE_VARS.is_empty());
        assert!(!TIMEOUT_OVERRIDE_VAR.is_empty());
        assert!(!DEFAULT_HOME_DIR.is_empty());
        assert_eq!(MANAGED_FLAGS.len(), 2);
    }

    #[test]
    fn defaults_are_positive() {
        assert!(DEFAULT_COMMAND_TIMEOUT > Duration::ZERO);
        assert!(DEFAULT_KILL_GRACE > Duration::ZERO);
        assert_ne!(SIGNAL_EXIT_CODE, 0);
    }

    #[test]
    fn binary_name_matches_platform() {
        if cfg!(windows) {
            assert!(binary_name().ends_with(".exe"));
        } else {
            assert_eq!(binary_name(), "codex");
        }
    }
}
