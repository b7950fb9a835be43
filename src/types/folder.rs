use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a folder for organizing bookmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
