// Smart Bookmark Settings Engine
// Manages app settings: loading, saving, updating individual values, resetting to defaults,
// and layering SMART_BOOKMARK_* environment overrides on top of the file.
// Settings are stored as a JSON file at the platform-specific config path.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::AppSettings;

/// File name of the database inside the data directory.
pub const DATABASE_FILE: &str = "bookmarks.db";

/// Environment variables layered over the settings file.
pub const OVERRIDE_VARS: [&str; 7] = [
    "SMART_BOOKMARK_DATA_DIR",
    "SMART_BOOKMARK_BIND",
    "SMART_BOOKMARK_APP_ORIGIN",
    "SMART_BOOKMARK_AUTH_URL",
    "SMART_BOOKMARK_AUTH_ANON_KEY",
    "SMART_BOOKMARK_CATEGORIZE_URL",
    "SMART_BOOKMARK_CATEGORIZE_KEY",
];

/// Trait defining the settings engine interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<AppSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &AppSettings;
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

/// Settings engine implementation that persists settings as JSON on disk.
///
/// `stored` mirrors the file; `settings` is `stored` with the overrides on top
/// and is what the rest of the app reads. Only `stored` is ever written.
pub struct SettingsEngine {
    config_path: String,
    stored: AppSettings,
    settings: AppSettings,
    overrides: HashMap<&'static str, String>,
}

impl SettingsEngine {
    /// Creates a new SettingsEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses the platform-specific config directory with `settings.json`.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_config_dir()
                .join("settings.json")
                .to_string_lossy()
                .to_string(),
        };

        Self {
            config_path,
            stored: AppSettings::default(),
            settings: AppSettings::default(),
            overrides: HashMap::new(),
        }
    }

    /// Applies `SMART_BOOKMARK_*` variables from the process environment.
    ///
    /// Overrides only touch the in-memory settings; they are never saved, and
    /// they survive later `load`, `set_value` and `reset` calls.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in OVERRIDE_VARS {
            if let Some(value) = lookup(name) {
                self.overrides.insert(name, value);
            }
        }
        self.refresh_effective();
        debug!(count = self.overrides.len(), "environment overrides applied");
    }

    /// Rebuilds the effective settings from the stored copy and the overrides.
    fn refresh_effective(&mut self) {
        let mut effective = self.stored.clone();
        let lookup = |name: &str| self.overrides.get(name).cloned();
        let s = &mut effective;
        if let Some(dir) = lookup("SMART_BOOKMARK_DATA_DIR") {
            s.storage.database_path = Some(
                PathBuf::from(dir).join(DATABASE_FILE).to_string_lossy().to_string(),
            );
        }
        if let Some(bind) = lookup("SMART_BOOKMARK_BIND") {
            s.server.bind_address = bind;
        }
        if let Some(origin) = lookup("SMART_BOOKMARK_APP_ORIGIN") {
            s.auth.app_origin = origin.clone();
            s.extension.app_origin = origin;
        }
        if let Some(url) = lookup("SMART_BOOKMARK_AUTH_URL") {
            s.auth.provider_url = Some(url);
        }
        if let Some(key) = lookup("SMART_BOOKMARK_AUTH_ANON_KEY") {
            s.auth.anon_key = Some(key);
        }
        if let Some(url) = lookup("SMART_BOOKMARK_CATEGORIZE_URL") {
            s.categorization.endpoint = Some(url);
        }
        if let Some(key) = lookup("SMART_BOOKMARK_CATEGORIZE_KEY") {
            s.categorization.api_key = Some(key);
        }
        self.settings = effective;
    }

    /// Database location: the configured path, else `bookmarks.db` in the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        match &self.settings.storage.database_path {
            Some(p) => PathBuf::from(p),
            None => platform::get_data_dir().join(DATABASE_FILE),
        }
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns default settings.
    /// If the file exists but is malformed, returns a serialization error.
    fn load(&mut self) -> Result<AppSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.stored = AppSettings::default();
            self.refresh_effective();
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read config file: {}", e)))?;

        let settings: AppSettings = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.stored = settings;
        self.refresh_effective();
        Ok(self.settings.clone())
    }

    /// Saves the file-backed settings to the JSON config file, creating parent directories.
    ///
    /// Environment overrides are not part of what gets written.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.stored).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Updates an individual setting by dot-notation key path and saves.
    ///
    /// # Examples
    /// - `"server.bind_address"` → updates `settings.server.bind_address`
    /// - `"categorization.timeout_secs"` → updates `settings.categorization.timeout_secs`
    fn set_value(&mut self, key: &str, value: serde_json::Value) -> Result<(), SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        let parts: Vec<&str> = key.split('.').collect();

        let mut json_value = serde_json::to_value(&self.stored).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        {
            let mut current = &mut json_value;
            for (i, part) in parts.iter().enumerate() {
                if i == parts.len() - 1 {
                    match current {
                        serde_json::Value::Object(map) => {
                            if !map.contains_key(*part) {
                                return Err(SettingsError::InvalidKey(format!(
                                    "Key '{}' not found in settings",
                                    key
                                )));
                            }
                            map.insert(part.to_string(), value.clone());
                        }
                        _ => {
                            return Err(SettingsError::InvalidKey(format!(
                                "Cannot navigate to key '{}': intermediate value is not an object",
                                key
                            )));
                        }
                    }
                } else {
                    current = match current.get_mut(*part) {
                        Some(v) => v,
                        None => {
                            return Err(SettingsError::InvalidKey(format!(
                                "Key '{}' not found in settings",
                                key
                            )));
                        }
                    };
                }
            }
        }

        // round-trip through the typed struct to validate the new value
        let new_settings: AppSettings = serde_json::from_value(json_value).map_err(|e| {
            SettingsError::InvalidValue(format!("Invalid value for key '{}': {}", key, e))
        })?;

        self.stored = new_settings;
        self.save()?;
        self.refresh_effective();
        Ok(())
    }

    /// Resets all settings to defaults and saves to disk.
    fn reset(&mut self) -> Result<(), SettingsError> {
        self.stored = AppSettings::default();
        self.save()?;
        self.refresh_effective();
        Ok(())
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
