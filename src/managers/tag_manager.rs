//! Tag Manager for Smart Bookmark.
//!
//! Mirrors the signed-in user's tags. Tags created without a colour get one
//! from [`TAG_COLORS`].

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::mirror::{LocalMirror, SyncedTable};
use super::report;
use crate::database::Database;
use crate::services::crypto_service;
use crate::services::notifier::Notifier;
use crate::types::errors::TagError;
use crate::types::tag::{is_hex_color, Tag, TagPatch, TAG_COLORS};

/// Trait defining tag management operations.
pub trait TagManagerTrait {
    fn load(&mut self, user_id: Option<&str>) -> Result<(), TagError>;
    fn create(&self, name: &str, color: Option<&str>) -> Result<(), TagError>;
    fn update(&self, id: &str, patch: &TagPatch) -> Result<(), TagError>;
    fn delete(&self, id: &str) -> Result<(), TagError>;
    fn sync(&mut self) -> usize;
    fn teardown(&mut self);
    fn tags(&self) -> &[Tag];
    fn mirror(&self) -> &LocalMirror<Tag>;
}

/// Picks a palette colour at random.
pub fn pick_color() -> &'static str {
    TAG_COLORS[crypto_service::random_index(TAG_COLORS.len())]
}

/// Tag manager backed by the shared store.
pub struct TagManager {
    db: Arc<Database>,
    notifier: Notifier,
    user_id: Option<String>,
    table: SyncedTable<Tag>,
}

impl TagManager {
    pub fn new(db: Arc<Database>, notifier: Notifier) -> Self {
        Self {
            db,
            notifier,
            user_id: None,
            table: SyncedTable::new(),
        }
    }

    fn require_user(&self) -> Result<&str, TagError> {
        self.user_id.as_deref().ok_or(TagError::NotAuthenticated)
    }

    fn validate_name(name: &str) -> Result<&str, TagError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagError::Validation("name is required".to_string()));
        }
        Ok(name)
    }

    fn validate_color(color: &str) -> Result<(), TagError> {
        if !is_hex_color(color) {
            return Err(TagError::Validation(format!("color must be #RRGGBB, got {}", color)));
        }
        Ok(())
    }

    fn insert(&self, name: &str, color: Option<&str>) -> Result<(), TagError> {
        let user_id = self.require_user()?;
        let name = Self::validate_name(name)?;
        let color = match color {
            Some(c) => {
                Self::validate_color(c)?;
                c
            }
            None => pick_color(),
        };
        let tag = self.db.insert_tag(user_id, name, color)?;
        debug!(id = %tag.id, color = %tag.color, "tag created");
        Ok(())
    }

    fn patch(&self, id: &str, patch: &TagPatch) -> Result<(), TagError> {
        let user_id = self.require_user()?;
        let mut patch = patch.clone();
        if let Some(name) = &patch.name {
            patch.name = Some(Self::validate_name(name)?.to_string());
        }
        if let Some(color) = &patch.color {
            Self::validate_color(color)?;
        }
        self.db.update_tag(user_id, id, &patch)?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), TagError> {
        let user_id = self.require_user()?;
        if let Err(e) = self.db.delete_bookmark_tags_for_tag(user_id, id) {
            warn!(tag_id = id, error = %e, "failed to clear tag associations before delete");
        }
        self.db.delete_tag(user_id, id)?;
        Ok(())
    }
}

impl TagManagerTrait for TagManager {
    fn load(&mut self, user_id: Option<&str>) -> Result<(), TagError> {
        self.table.release();
        self.user_id = user_id.map(str::to_string);
        let Some(user_id) = user_id else {
            return Ok(());
        };

        let subscription = self.db.feed().tags.subscribe(user_id);
        match self.db.select_tags(user_id) {
            Ok(rows) => {
                self.table.install(subscription, rows);
                Ok(())
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to load tags");
                self.notifier.error("Failed to load tags");
                Err(e.into())
            }
        }
    }

    fn create(&self, name: &str, color: Option<&str>) -> Result<(), TagError> {
        report(&self.notifier, self.insert(name, color), "Tag created!", "Failed to create tag")
    }

    fn update(&self, id: &str, patch: &TagPatch) -> Result<(), TagError> {
        report(&self.notifier, self.patch(id, patch), "Tag updated!", "Failed to update tag")
    }

    /// Detaches the tag from every bookmark, then deletes it.
    fn delete(&self, id: &str) -> Result<(), TagError> {
        report(&self.notifier, self.remove(id), "Tag deleted!", "Failed to delete tag")
    }

    fn sync(&mut self) -> usize {
        self.table.sync()
    }

    fn teardown(&mut self) {
        self.table.release();
        self.user_id = None;
    }

    fn tags(&self) -> &[Tag] {
        self.table.mirror().rows()
    }

    fn mirror(&self) -> &LocalMirror<Tag> {
        self.table.mirror()
    }
}
