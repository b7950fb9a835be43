use serde::{Deserialize, Serialize};

use super::errors::CategorizeError;

/// Request body accepted by the categorization endpoint.
///
/// `url` and `title` may arrive missing or `null`; `validate` rejects both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    #[serde(default)]
    pub bookmark_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CategorizeRequest {
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// Both `url` and `title` must be present and non-empty.
    pub fn validate(&self) -> Result<(), CategorizeError> {
        if self.url().trim().is_empty() || self.title().trim().is_empty() {
            return Err(CategorizeError::Validation(
                "URL and title are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Folder and tag names suggested by the categorization service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestions {
    #[serde(alias = "folder_name")]
    pub folder_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
