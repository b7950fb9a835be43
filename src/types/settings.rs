use serde::{Deserialize, Serialize};

/// Top-level application settings container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub auth: AuthSettings,
    pub categorization: CategorizationSettings,
    pub extension: ExtensionSettings,
}

/// Placeholder shown to clients in place of a configured secret.
pub const REDACTED: &str = "********";

impl AppSettings {
    /// Copy safe to hand to clients: configured keys are masked.
    pub fn redacted(&self) -> AppSettings {
        let mask = |key: &Option<String>| key.as_ref().map(|_| REDACTED.to_string());
        let mut copy = self.clone();
        copy.auth.anon_key = mask(&self.auth.anon_key);
        copy.categorization.api_key = mask(&self.categorization.api_key);
        copy
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Where the bookmark database lives. `None` means the platform data dir.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub database_path: Option<String>,
}

/// Identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    /// Base URL of the auth provider; unset means sign-in is unavailable.
    pub provider_url: Option<String>,
    pub anon_key: Option<String>,
    pub oauth_provider: String,
    /// Public origin of this app, used to build the OAuth callback URL.
    pub app_origin: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            provider_url: None,
            anon_key: None,
            oauth_provider: "google".to_string(),
            app_origin: "http://localhost:3000".to_string(),
        }
    }
}

/// Categorization service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorizationSettings {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CategorizationSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Settings consumed when building the browser-extension handoff link.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtensionSettings {
    pub app_origin: String,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            app_origin: "http://localhost:3000".to_string(),
        }
    }
}
