//! Integration tests for config load/save/merge flows

use mediabridge_config::{Config, ConfigManager};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_full_roundtrip_preserves_all_sections() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manager = ConfigManager::with_path(temp_dir.path().join("config.toml"));

    let mut config = Config::default();
    config.engine.suppress_video = false;
    config.engine.extra_flags = vec!["--no-xlib".to_string()];
    config.discovery.media_dirs = vec![temp_dir.path().to_path_buf()];
    config.discovery.find_timeout_secs = 45;
    config.player.default_volume = 0.7;
    config.player.equalizer_preset = Some("Rock".to_string());
    config.logging.level = "debug".to_string();

    manager.save(&config).expect("save failed");
    let loaded = manager.load().expect("load failed");
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[player]\ndefault_volume = 0.25\n").expect("write failed");

    let manager = ConfigManager::with_path(path);
    let config = manager.load().expect("load failed");

    assert_eq!(config.player.default_volume, 0.25);
    // Everything unspecified falls back to defaults
    assert_eq!(config.discovery.renderer_service, "microdns_renderer");
    assert_eq!(config.logging.level, "info");
    assert!(config.engine.suppress_video);
}

#[test]
fn test_unknown_keys_are_tolerated() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        "[engine]\nquiet = false\n\n[future_section]\nsetting = 1\n",
    )
    .expect("write failed");

    let manager = ConfigManager::with_path(path);
    let config = manager.load().expect("load failed");
    assert!(!config.engine.quiet);
}

#[test]
fn test_saved_file_is_readable_toml() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("config.toml");
    let manager = ConfigManager::with_path(path.clone());

    manager.save(&Config::default()).expect("save failed");

    let raw = fs::read_to_string(&path).expect("read failed");
    assert!(raw.contains("[engine]"));
    assert!(raw.contains("[discovery]"));
    assert!(raw.contains("[player]"));
    assert!(raw.contains("[logging]"));
}
