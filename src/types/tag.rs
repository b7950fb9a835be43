use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colours handed out to tags created without an explicit one.
pub const TAG_COLORS: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#FFA07A", "#98D8C8", "#F7DC6F", "#BB8FCE", "#85C1E2",
];

/// Represents a coloured tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update for a tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Association row linking a bookmark to a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkTag {
    pub bookmark_id: String,
    pub tag_id: String,
    pub created_at: DateTime<Utc>,
}

impl BookmarkTag {
    /// Composite key of the association; unique per pair.
    pub fn key(&self) -> String {
        format!("{}:{}", self.bookmark_id, self.tag_id)
    }
}

/// Returns true if `color` is a `#RRGGBB` hex colour.
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}
