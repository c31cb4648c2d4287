use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use codex_bridge::config::BridgeConfig;
use codex_bridge::error::ErrorKind;
use codex_bridge::resolver::{ensure_home, resolve_binary_for};
use tempfile::TempDir;

/// `<tmp>/cli` is the install root; the dev workspace sits beside it.
fn layout() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("cli");
    fs::create_dir_all(&root).unwrap();
    (dir, root)
}

fn touch(path: &Path) -> PathBuf {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "").unwrap();
    path.to_path_buf()
}

fn dev_build(dir: &TempDir, profile: &str) -> PathBuf {
    touch(&dir.path().join("codex-rs/target").join(profile).join("codex"))
}

#[test]
fn override_wins_over_everything() {
    let (dir, root) = layout();
    dev_build(&dir, "debug");
    let custom = touch(&dir.path().join("custom/codex"));
    let config = BridgeConfig::default()
        .with_install_root(&root)
        .with_binary_override(&custom);

    assert_eq!(resolve_binary_for(&config, "linux", "x86_64").unwrap(), custom);
}

#[test]
fn missing_override_falls_through() {
    let (dir, root) = layout();
    let release = dev_build(&dir, "release");
    let config = BridgeConfig::default()
        .with_install_root(&root)
        .with_binary_override(dir.path().join("gone"));

    assert_eq!(resolve_binary_for(&config, "linux", "x86_64").unwrap(), release);
}

#[test]
fn debug_build_preferred_over_release() {
    let (dir, root) = layout();
    let debug = dev_build(&dir, "debug");
    dev_build(&dir, "release");
    let config = BridgeConfig::default().with_install_root(&root);

    assert_eq!(resolve_binary_for(&config, "macos", "aarch64").unwrap(), debug);
}

#[test]
fn packaged_binary_for_platform() {
    let (_dir, root) = layout();
    let packaged = touch(&root.join("bin/codex-aarch64-apple-darwin"));
    touch(&root.join("bin/codex-x86_64-unknown-linux-musl"));
    let config = BridgeConfig::default().with_install_root(&root);

    assert_eq!(resolve_binary_for(&config, "macos", "aarch64").unwrap(), packaged);
}

#[test]
fn unsupported_platform_without_dev_build_is_not_found() {
    let (_dir, root) = layout();
    touch(&root.join("bin/codex-x86_64-unknown-linux-musl"));
    let config = BridgeConfig::default().with_install_root(&root);

    let err = resolve_binary_for(&config, "linux", "riscv64").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BinaryNotFound);
    assert!(err.to_string().contains("CODEX_CLI_BIN"));
}

#[test]
fn resolution_is_not_cached() {
    let (dir, root) = layout();
    let config = BridgeConfig::default().with_install_root(&root);

    assert!(resolve_binary_for(&config, "linux", "x86_64").is_err());
    let release = dev_build(&dir, "release");
    assert_eq!(resolve_binary_for(&config, "linux", "x86_64").unwrap(), release);
}

#[test]
fn config_from_lookup_reads_overrides_in_order() {
    let config = BridgeConfig::from_lookup(|key| match key {
        "CODEX_CLI_BIN" => Some("  ".to_string()),
        "CODEX_CLI_BINARY" => Some("/opt/codex/bin/codex".to_string()),
        "CODEX_DEV_CLI_BIN" => Some("/dev/codex".to_string()),
        "CODEX_AGENTS_TIMEOUT_MS" => Some("2500".to_string()),
        "CODEX_HOME" => Some("/var/lib/codex".to_string()),
        _ => None,
    });

    assert_eq!(config.binary_override, Some(PathBuf::from("/opt/codex/bin/codex")));
    assert_eq!(config.command_timeout, Duration::from_millis(2500));
    assert_eq!(config.home, PathBuf::from("/var/lib/codex"));
    assert_eq!(config.logs_dir(), PathBuf::from("/var/lib/codex/logs"));
}

#[test]
fn invalid_timeout_falls_back_to_default() {
    for raw in ["0", "-5", "abc", "NaN", "inf"] {
        let config = BridgeConfig::from_lookup(|key| {
            (key == "CODEX_AGENTS_TIMEOUT_MS").then(|| raw.to_string())
        });
        assert_eq!(config.command_timeout, Duration::from_secs(120), "value {raw:?}");
    }
}

#[test]
fn state_dir_and_logs_created_on_demand() {
    let dir = TempDir::new().unwrap();
    let config = BridgeConfig::default().with_home(dir.path().join("nested/home"));

    ensure_home(&config, true).unwrap();

    assert!(dir.path().join("nested/home/logs").is_dir());
}
