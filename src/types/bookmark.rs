use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use super::errors::LinkError;

/// Represents a saved bookmark owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub folder_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a bookmark.
///
/// `tag_ids` are written as association rows right after the bookmark itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBookmark {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

/// Partial update for a bookmark.
///
/// `description` and `folder_id` distinguish "leave unchanged" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookmarkPatch {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub folder_id: Option<Option<String>>,
}

impl BookmarkPatch {
    /// A patch that only moves the bookmark (or clears its folder).
    pub fn move_to(folder_id: Option<&str>) -> Self {
        Self {
            folder_id: Some(folder_id.map(str::to_string)),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.folder_id.is_none()
    }
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Parses `raw` as an absolute `http`/`https` URL.
pub fn parse_web_url(raw: &str) -> Result<Url, LinkError> {
    let parsed = Url::parse(raw.trim()).map_err(|e| LinkError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(LinkError::UnsupportedScheme(other.to_string())),
    }
}
