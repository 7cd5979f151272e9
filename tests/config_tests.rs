// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use recallkeep::cache::RecallLimits;
use recallkeep::config::Settings;
use tempfile::TempDir;

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert!(settings.recall.enabled);
    assert_eq!(settings.recall.ring_capacity, 200);
    assert_eq!(settings.recall.flush_threshold, 500);
    assert_eq!(settings.recall.max_resident_segments, 5);
    assert!(settings.recall.persist_to_disk);
    assert!(!settings.recall.redirect_pictures);
    assert!(!settings.recall.intercept_self_recall);
    assert_eq!(settings.image.request_timeout_secs, 30);
}

#[test]
fn test_settings_serialization() {
    let json = serde_json::to_string(&Settings::default()).expect("Should serialize to JSON");

    assert!(json.contains("ring_capacity"));
    assert!(json.contains("flush_threshold"));
    assert!(json.contains("data_dir"));
    // Unset optional keys stay visible for `config get`
    assert!(json.contains("\"rkey_server_url\":null"));
}

#[test]
fn test_settings_deserialization() {
    let json = r#"{
        "recall": {
            "ring_capacity": 50,
            "intercept_self_recall": true
        },
        "image": {
            "rkey_server_url": "https://rkey.example.com/rkeys"
        },
        "storage": {
            "data_dir": "/var/lib/recallkeep"
        }
    }"#;

    let settings: Settings = serde_json::from_str(json).expect("Should deserialize");
    assert_eq!(settings.recall.ring_capacity, 50);
    assert!(settings.recall.intercept_self_recall);
    assert_eq!(settings.recall.flush_threshold, 500);
    assert_eq!(
        settings.user_store_dir("u1"),
        std::path::PathBuf::from("/var/lib/recallkeep/u1")
    );
    assert!(settings.validate().is_ok());
}

#[test]
fn test_legacy_keys_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, r#"{"preventSelfMsg": true, "redirectPicPath": true}"#).unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert!(settings.recall.intercept_self_recall);
    assert!(settings.recall.redirect_pictures);
}

#[test]
fn test_load_rejects_invalid_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Settings::load_from(&path).is_err());
}

#[test]
fn test_limits_follow_settings() {
    let mut settings = Settings::default();
    settings.recall.flush_threshold = 3;
    settings.recall.persist_to_disk = false;

    let limits = RecallLimits::from(&settings.recall);
    assert_eq!(limits.flush_threshold, 3);
    assert!(!limits.persist_to_disk);
    assert_eq!(limits.ring_capacity, 200);
}

#[test]
fn test_validate_rejects_zero_ring() {
    let mut settings = Settings::default();
    settings.recall.ring_capacity = 0;

    let err = settings.validate().unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_set_key_then_save_keeps_other_content() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"preventSelfMsg": true, "theme": "dark", "recall": {"ring_capacity": 10}}"#,
    )
    .unwrap();

    let mut settings = Settings::load_from(&path).unwrap();
    settings.set_key("recall.flush_threshold", "20").unwrap();
    settings.save_to(&path).unwrap();

    let reloaded = Settings::load_from(&path).unwrap();
    assert_eq!(reloaded.recall.flush_threshold, 20);
    assert_eq!(reloaded.recall.ring_capacity, 10);
    assert!(reloaded.recall.intercept_self_recall);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["theme"], "dark");
}

#[test]
fn test_reset_overwrites_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("settings.json");
    std::fs::write(&path, r#"{"theme": "dark", "recall": {"flush_threshold": 3}}"#).unwrap();

    Settings::default().save_to_clean(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw.get("theme").is_none());
    assert_eq!(Settings::load_from(&path).unwrap().recall.flush_threshold, 500);
}
