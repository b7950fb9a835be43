//! Bookmark/tag association manager.
//!
//! Mirrors every association row of the signed-in user's bookmarks. The
//! bookmark-to-tags map used for filtering is derived from this mirror.

use std::sync::Arc;

use tracing::error;

use super::mirror::{LocalMirror, SyncedTable};
use super::report;
use crate::database::Database;
use crate::services::notifier::Notifier;
use crate::types::errors::BookmarkError;
use crate::types::tag::BookmarkTag;

/// Trait defining association operations.
pub trait BookmarkTagManagerTrait {
    fn load(&mut self, user_id: Option<&str>) -> Result<(), BookmarkError>;
    /// Links a bookmark to a tag. Linking an already-linked pair is a no-op.
    fn attach(&self, bookmark_id: &str, tag_id: &str) -> Result<(), BookmarkError>;
    fn detach(&self, bookmark_id: &str, tag_id: &str) -> Result<(), BookmarkError>;
    fn sync(&mut self) -> usize;
    fn teardown(&mut self);
    fn associations(&self) -> &[BookmarkTag];
    fn mirror(&self) -> &LocalMirror<BookmarkTag>;
}

pub struct BookmarkTagManager {
    db: Arc<Database>,
    notifier: Notifier,
    user_id: Option<String>,
    table: SyncedTable<BookmarkTag>,
}

impl BookmarkTagManager {
    pub fn new(db: Arc<Database>, notifier: Notifier) -> Self {
        Self {
            db,
            notifier,
            user_id: None,
            table: SyncedTable::new(),
        }
    }

    fn require_user(&self) -> Result<&str, BookmarkError> {
        self.user_id.as_deref().ok_or(BookmarkError::NotAuthenticated)
    }

    fn link(&self, bookmark_id: &str, tag_id: &str) -> Result<(), BookmarkError> {
        let user_id = self.require_user()?;
        self.db.insert_bookmark_tag(user_id, bookmark_id, tag_id)?;
        Ok(())
    }

    fn unlink(&self, bookmark_id: &str, tag_id: &str) -> Result<(), BookmarkError> {
        let user_id = self.require_user()?;
        if !self.db.delete_bookmark_tag(user_id, bookmark_id, tag_id)? {
            return Err(BookmarkError::TagNotFound(tag_id.to_string()));
        }
        Ok(())
    }
}

impl BookmarkTagManagerTrait for BookmarkTagManager {
    fn load(&mut self, user_id: Option<&str>) -> Result<(), BookmarkError> {
        self.table.release();
        self.user_id = user_id.map(str::to_string);
        let Some(user_id) = user_id else {
            return Ok(());
        };

        let subscription = self.db.feed().bookmark_tags.subscribe(user_id);
        match self.db.select_bookmark_tags(user_id) {
            Ok(rows) => {
                self.table.install(subscription, rows);
                Ok(())
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to load bookmark tags");
                self.notifier.error("Failed to load bookmark tags");
                Err(e.into())
            }
        }
    }

    fn attach(&self, bookmark_id: &str, tag_id: &str) -> Result<(), BookmarkError> {
        report(&self.notifier, self.link(bookmark_id, tag_id), "Tag added!", "Failed to add tag")
    }

    fn detach(&self, bookmark_id: &str, tag_id: &str) -> Result<(), BookmarkError> {
        report(
            &self.notifier,
            self.unlink(bookmark_id, tag_id),
            "Tag removed!",
            "Failed to remove tag",
        )
    }

    fn sync(&mut self) -> usize {
        self.table.sync()
    }

    fn teardown(&mut self) {
        self.table.release();
        self.user_id = None;
    }

    fn associations(&self) -> &[BookmarkTag] {
        self.table.mirror().rows()
    }

    fn mirror(&self) -> &LocalMirror<BookmarkTag> {
        self.table.mirror()
    }
}
