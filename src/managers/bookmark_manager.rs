//! Bookmark Manager for Smart Bookmark.
//!
//! Implements `BookmarkManagerTrait`: a live mirror of the signed-in user's
//! bookmarks plus create/update/delete operations. Mutations never touch the
//! mirror; it only moves when the store's change feed is synced.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::mirror::{LocalMirror, SyncedTable};
use super::report;
use crate::database::Database;
use crate::services::notifier::Notifier;
use crate::types::bookmark::{parse_web_url, Bookmark, BookmarkPatch, NewBookmark};
use crate::types::errors::BookmarkError;

/// Trait defining bookmark management operations.
pub trait BookmarkManagerTrait {
    /// Switches the mirror to `user_id`. `None` empties it.
    fn load(&mut self, user_id: Option<&str>) -> Result<(), BookmarkError>;
    fn create(&self, new: NewBookmark) -> Result<(), BookmarkError>;
    fn update(&self, id: &str, patch: &BookmarkPatch) -> Result<(), BookmarkError>;
    fn delete(&self, id: &str) -> Result<(), BookmarkError>;
    fn sync(&mut self) -> usize;
    fn teardown(&mut self);
    fn bookmarks(&self) -> &[Bookmark];
    fn mirror(&self) -> &LocalMirror<Bookmark>;
}

/// Bookmark manager backed by the shared store.
pub struct BookmarkManager {
    db: Arc<Database>,
    notifier: Notifier,
    user_id: Option<String>,
    table: SyncedTable<Bookmark>,
}

impl BookmarkManager {
    pub fn new(db: Arc<Database>, notifier: Notifier) -> Self {
        Self {
            db,
            notifier,
            user_id: None,
            table: SyncedTable::new(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn require_user(&self) -> Result<&str, BookmarkError> {
        self.user_id.as_deref().ok_or(BookmarkError::NotAuthenticated)
    }

    fn validate_url(url: &str) -> Result<(), BookmarkError> {
        parse_web_url(url)
            .map(|_| ())
            .map_err(|e| BookmarkError::Validation(e.to_string()))
    }

    fn validate_title(title: &str) -> Result<(), BookmarkError> {
        if title.trim().is_empty() {
            return Err(BookmarkError::Validation("title is required".to_string()));
        }
        Ok(())
    }

    fn insert(&self, new: NewBookmark) -> Result<(), BookmarkError> {
        let user_id = self.require_user()?;
        Self::validate_url(&new.url)?;
        Self::validate_title(&new.title)?;

        let bookmark = self.db.insert_bookmark(user_id, &new)?;
        for tag_id in &new.tag_ids {
            // the bookmark itself is saved; a bad tag only loses that association
            if let Err(e) = self.db.insert_bookmark_tag(user_id, &bookmark.id, tag_id) {
                warn!(bookmark_id = %bookmark.id, tag_id, error = %e, "failed to tag new bookmark");
            }
        }
        debug!(id = %bookmark.id, tags = new.tag_ids.len(), "bookmark created");
        Ok(())
    }

    fn patch(&self, id: &str, patch: &BookmarkPatch) -> Result<(), BookmarkError> {
        let user_id = self.require_user()?;
        if let Some(url) = &patch.url {
            Self::validate_url(url)?;
        }
        if let Some(title) = &patch.title {
            Self::validate_title(title)?;
        }
        self.db.update_bookmark(user_id, id, patch)?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), BookmarkError> {
        let user_id = self.require_user()?;
        if let Err(e) = self.db.delete_bookmark_tags_for_bookmark(user_id, id) {
            warn!(bookmark_id = id, error = %e, "failed to clear bookmark tags before delete");
        }
        self.db.delete_bookmark(user_id, id)?;
        Ok(())
    }
}

impl BookmarkManagerTrait for BookmarkManager {
    /// Subscribes before taking the snapshot so no change is lost in between.
    fn load(&mut self, user_id: Option<&str>) -> Result<(), BookmarkError> {
        self.table.release();
        self.user_id = user_id.map(str::to_string);
        let Some(user_id) = user_id else {
            return Ok(());
        };

        let subscription = self.db.feed().bookmarks.subscribe(user_id);
        match self.db.select_bookmarks(user_id) {
            Ok(rows) => {
                debug!(user_id, count = rows.len(), "bookmarks loaded");
                self.table.install(subscription, rows);
                Ok(())
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to load bookmarks");
                self.notifier.error("Failed to load bookmarks");
                Err(e.into())
            }
        }
    }

    fn create(&self, new: NewBookmark) -> Result<(), BookmarkError> {
        report(
            &self.notifier,
            self.insert(new),
            "Bookmark saved successfully!",
            "Failed to save bookmark",
        )
    }

    fn update(&self, id: &str, patch: &BookmarkPatch) -> Result<(), BookmarkError> {
        report(
            &self.notifier,
            self.patch(id, patch),
            "Bookmark updated!",
            "Failed to update bookmark",
        )
    }

    /// Deletes the bookmark's tag associations, then the bookmark.
    fn delete(&self, id: &str) -> Result<(), BookmarkError> {
        report(
            &self.notifier,
            self.remove(id),
            "Bookmark deleted!",
            "Failed to delete bookmark",
        )
    }

    fn sync(&mut self) -> usize {
        self.table.sync()
    }

    fn teardown(&mut self) {
        self.table.release();
        self.user_id = None;
    }

    fn bookmarks(&self) -> &[Bookmark] {
        self.table.mirror().rows()
    }

    fn mirror(&self) -> &LocalMirror<Bookmark> {
        self.table.mirror()
    }
}
