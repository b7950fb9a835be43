// Smart Bookmark Categorizer
// Asks the external categorization service for a folder name and tags for a page.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::types::categorize::{CategorizeRequest, Suggestions};
use crate::types::errors::CategorizeError;
use crate::types::settings::CategorizationSettings;

/// Trait defining the categorization service.
#[async_trait]
pub trait Categorizer: Send + Sync {
    /// Suggests a folder and tags for the page described by `request`.
    async fn categorize(&self, request: &CategorizeRequest) -> Result<Suggestions, CategorizeError>;
}

/// Payload sent to the service.
#[derive(Debug, Serialize)]
struct ServicePayload<'a> {
    bookmark_id: Option<&'a str>,
    url: &'a str,
    title: &'a str,
    description: Option<&'a str>,
}

/// Categorizer calling a JSON endpoint with bearer auth.
#[derive(Debug, Clone)]
pub struct HttpCategorizer {
    client: reqwest::Client,
    endpoint: Option<String>,
    api_key: Option<String>,
}

impl HttpCategorizer {
    pub fn from_settings(settings: &CategorizationSettings) -> Result<Self, CategorizeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[async_trait]
impl Categorizer for HttpCategorizer {
    #[instrument(skip_all, fields(url = %request.url()))]
    async fn categorize(&self, request: &CategorizeRequest) -> Result<Suggestions, CategorizeError> {
        request.validate()?;
        let endpoint = self.endpoint.as_deref().ok_or(CategorizeError::NotConfigured)?;

        let payload = ServicePayload {
            bookmark_id: request.bookmark_id.as_deref(),
            url: request.url(),
            title: request.title(),
            description: request.description.as_deref(),
        };
        let mut builder = self.client.post(endpoint).json(&payload);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "categorization service returned an error");
            return Err(CategorizeError::Service(format!("{}: {}", status, detail)));
        }

        let suggestions: Suggestions = response.json().await?;
        debug!(folder = %suggestions.folder_name, tags = suggestions.tags.len(), "categorized");
        Ok(suggestions)
    }
}
