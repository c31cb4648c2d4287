//! Locating the engine executable and preparing its state directory.
//!
//! Resolution order, first existing path wins:
//!
//! 1. the explicit override from [`BridgeConfig::binary_override`];
//! 2. `<root>/../codex-rs/target/debug/codex`;
//! 3. `<root>/../codex-rs/target/release/codex`;
//! 4. `<root>/bin/codex-<target triple>` for the running OS/CPU.
//!
//! Nothing is cached: every invocation resolves again, so a changed
//! override takes effect on the next call.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::BridgeConfig;
use crate::consts::binary_name;
use crate::error::BridgeError;

/// Map an OS family and CPU architecture (as spelled by
/// [`std::env::consts`]) to the packaged binary suffix.
pub fn target_triple(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux" | "android", "x86_64") => Some("x86_64-unknown-linux-musl"),
        ("linux" | "android", "aarch64") => Some("aarch64-unknown-linux-musl"),
        ("macos", "x86_64") => Some("x86_64-apple-darwin"),
        ("macos", "aarch64") => Some("aarch64-apple-darwin"),
        ("windows", "x86_64") => Some("x86_64-pc-windows-msvc.exe"),
        ("windows", "aarch64") => Some("aarch64-pc-windows-msvc.exe"),
        _ => None,
    }
}

/// Every candidate after the override, in precedence order.
pub fn candidates(install_root: &Path, os: &str, arch: &str) -> Vec<PathBuf> {
    let workspace = install_root
        .parent()
        .unwrap_or(install_root)
        .join("codex-rs")
        .join("target");

    let mut paths = vec![
        workspace.join("debug").join(binary_name()),
        workspace.join("release").join(binary_name()),
    ];
    if let Some(triple) = target_triple(os, arch) {
        paths.push(install_root.join("bin").join(format!("codex-{triple}")));
    }
    paths
}

/// Resolve the engine binary for the running platform.
pub fn resolve_binary(config: &BridgeConfig) -> Result<PathBuf, BridgeError> {
    resolve_binary_for(config, std::env::consts::OS, std::env::consts::ARCH)
}

/// Resolve the engine binary as if running on `os`/`arch`.
pub fn resolve_binary_for(
    config: &BridgeConfig,
    os: &str,
    arch: &str,
) -> Result<PathBuf, BridgeError> {
    let mut searched = Vec::new();

    if let Some(path) = &config.binary_override {
        if path.exists() {
            debug!(path = %path.display(), "using engine binary override");
            return Ok(path.clone());
        }
        searched.push(path.clone());
    }

    for path in candidates(&config.install_root, os, arch) {
        if path.exists() {
            debug!(path = %path.display(), "resolved engine binary");
            return Ok(path);
        }
        searched.push(path);
    }

    Err(BridgeError::BinaryNotFound { searched })
}

/// Make sure the state directory exists, plus `logs/` when asked.
/// Creating a directory that already exists is not an error.
pub fn ensure_home(config: &BridgeConfig, with_logs: bool) -> Result<(), BridgeError> {
    create_dir(&config.home)?;
    if with_logs {
        create_dir(&config.logs_dir())?;
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), BridgeError> {
    if path.is_dir() {
        return Ok(());
    }
    match std::fs::create_dir_all(path) {
        Ok(()) => {
            info!(path = %path.display(), "created codex state directory");
            Ok(())
        }
        // Another invocation may have created it in the meantime.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(BridgeError::StateDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}
