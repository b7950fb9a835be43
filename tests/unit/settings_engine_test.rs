//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface:
//! default loading, dot-path updates, persistence, reset and env overrides.

use std::collections::HashMap;

use rstest::rstest;
use serde_json::json;
use smart_bookmark::services::settings_engine::{SettingsEngine, SettingsEngineTrait, DATABASE_FILE};
use smart_bookmark::types::errors::SettingsError;
use smart_bookmark::types::settings::{AppSettings, REDACTED};
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let settings = engine.load().unwrap();

    assert_eq!(settings, AppSettings::default());
    assert_eq!(settings.server.bind_address, "127.0.0.1:3000");
    assert_eq!(settings.categorization.timeout_secs, 30);
    assert_eq!(settings.auth.oauth_provider, "google");
}

#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();

    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine
            .set_value("categorization.endpoint", json!("https://categorize.example.com"))
            .unwrap();
        engine.set_value("categorization.timeout_secs", json!(5)).unwrap();
    }

    let mut reloaded = engine_in_temp(&dir);
    let loaded = reloaded.load().unwrap();
    assert_eq!(
        loaded.categorization.endpoint.as_deref(),
        Some("https://categorize.example.com")
    );
    assert_eq!(loaded.categorization.timeout_secs, 5);
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine.set_value("server.bind_address", json!("0.0.0.0:9000")).unwrap();

    engine.reset().unwrap();
    assert_eq!(engine.get_settings(), &AppSettings::default());

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap(), AppSettings::default());
}

#[rstest]
#[case("", "empty key")]
#[case("server.port", "unknown leaf")]
#[case("nonexistent.field", "unknown section")]
#[case("server.bind_address.host", "leaf is not an object")]
fn test_set_value_rejects_bad_keys(#[case] key: &str, #[case] _why: &str) {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(matches!(
        engine.set_value(key, json!("x")),
        Err(SettingsError::InvalidKey(_))
    ));
}

#[test]
fn test_set_value_rejects_wrong_type() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let result = engine.set_value("categorization.timeout_secs", json!("soon"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert_eq!(engine.get_settings().categorization.timeout_secs, 30);
}

#[test]
fn test_malformed_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
    let mut engine = engine_in_temp(&dir);

    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_overrides_are_not_saved() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let vars: HashMap<&str, &str> = [
        ("SMART_BOOKMARK_CATEGORIZE_URL", "https://categorize.example.com"),
        ("SMART_BOOKMARK_CATEGORIZE_KEY", "secret"),
        ("SMART_BOOKMARK_AUTH_ANON_KEY", "anon"),
    ]
    .into_iter()
    .collect();
    engine.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

    let s = engine.get_settings();
    assert_eq!(s.categorization.api_key.as_deref(), Some("secret"));
    assert_eq!(s.auth.anon_key.as_deref(), Some("anon"));
    assert!(!dir.path().join("settings.json").exists());

    // a later write saves only the file-backed values
    engine.set_value("categorization.timeout_secs", json!(10)).unwrap();
    let written = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
    assert!(!written.contains("secret"));
    assert!(!written.contains("anon"));
    assert!(!written.contains("categorize.example.com"));

    let mut reloaded = engine_in_temp(&dir);
    let on_disk = reloaded.load().unwrap();
    assert_eq!(on_disk.categorization.timeout_secs, 10);
    assert_eq!(on_disk.categorization.api_key, None);

    // the overrides still apply on top
    let s = engine.get_settings();
    assert_eq!(s.categorization.timeout_secs, 10);
    assert_eq!(s.categorization.api_key.as_deref(), Some("secret"));
}

#[test]
fn test_overrides_survive_reset_and_reload() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.apply_overrides(|name| (name == "SMART_BOOKMARK_CATEGORIZE_KEY").then(|| "secret".to_string()));

    engine.reset().unwrap();
    assert_eq!(engine.get_settings().categorization.api_key.as_deref(), Some("secret"));
    let written = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
    assert!(!written.contains("secret"));

    engine.load().unwrap();
    assert_eq!(engine.get_settings().categorization.api_key.as_deref(), Some("secret"));
}

#[test]
fn test_redacted_masks_configured_keys() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.apply_overrides(|name| (name == "SMART_BOOKMARK_AUTH_ANON_KEY").then(|| "anon".to_string()));

    let shown = engine.get_settings().redacted();
    assert_eq!(shown.auth.anon_key.as_deref(), Some(REDACTED));
    assert_eq!(shown.categorization.api_key, None);
    assert_eq!(shown.server, engine.get_settings().server);
}

#[test]
fn test_data_dir_override_sets_database_path() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    let data_dir = dir.path().join("data");
    let data_dir_str = data_dir.to_string_lossy().to_string();

    engine.apply_overrides(|name| (name == "SMART_BOOKMARK_DATA_DIR").then(|| data_dir_str.clone()));

    assert_eq!(engine.database_path(), data_dir.join(DATABASE_FILE));
}

#[test]
fn test_get_config_path_matches_override() {
    let dir = TempDir::new().unwrap();
    let engine = engine_in_temp(&dir);
    assert!(engine.get_config_path().ends_with("settings.json"));
}
