//! Folder Manager for Smart Bookmark.
//!
//! Mirrors the signed-in user's folders, ordered by name.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::mirror::{LocalMirror, SyncedTable};
use super::report;
use crate::database::Database;
use crate::services::notifier::Notifier;
use crate::types::errors::FolderError;
use crate::types::folder::Folder;

/// Trait defining folder management operations.
pub trait FolderManagerTrait {
    fn load(&mut self, user_id: Option<&str>) -> Result<(), FolderError>;
    fn create(&self, name: &str) -> Result<(), FolderError>;
    fn rename(&self, id: &str, name: &str) -> Result<(), FolderError>;
    fn delete(&self, id: &str) -> Result<(), FolderError>;
    fn sync(&mut self) -> usize;
    fn teardown(&mut self);
    fn folders(&self) -> &[Folder];
    fn mirror(&self) -> &LocalMirror<Folder>;
}

/// Folder manager backed by the shared store.
pub struct FolderManager {
    db: Arc<Database>,
    notifier: Notifier,
    user_id: Option<String>,
    table: SyncedTable<Folder>,
}

impl FolderManager {
    pub fn new(db: Arc<Database>, notifier: Notifier) -> Self {
        Self {
            db,
            notifier,
            user_id: None,
            table: SyncedTable::new(),
        }
    }

    fn require_user(&self) -> Result<&str, FolderError> {
        self.user_id.as_deref().ok_or(FolderError::NotAuthenticated)
    }

    fn validate_name(name: &str) -> Result<&str, FolderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FolderError::Validation("name is required".to_string()));
        }
        Ok(name)
    }

    fn insert(&self, name: &str) -> Result<(), FolderError> {
        let user_id = self.require_user()?;
        let folder = self.db.insert_folder(user_id, Self::validate_name(name)?)?;
        debug!(id = %folder.id, "folder created");
        Ok(())
    }

    fn set_name(&self, id: &str, name: &str) -> Result<(), FolderError> {
        let user_id = self.require_user()?;
        self.db.rename_folder(user_id, id, Self::validate_name(name)?)?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), FolderError> {
        let user_id = self.require_user()?;
        if let Err(e) = self.db.clear_folder_references(user_id, id) {
            warn!(folder_id = id, error = %e, "failed to clear folder references before delete");
        }
        self.db.delete_folder(user_id, id)?;
        Ok(())
    }
}

impl FolderManagerTrait for FolderManager {
    fn load(&mut self, user_id: Option<&str>) -> Result<(), FolderError> {
        self.table.release();
        self.user_id = user_id.map(str::to_string);
        let Some(user_id) = user_id else {
            return Ok(());
        };

        let subscription = self.db.feed().folders.subscribe(user_id);
        match self.db.select_folders(user_id) {
            Ok(rows) => {
                self.table.install(subscription, rows);
                Ok(())
            }
            Err(e) => {
                error!(user_id, error = %e, "failed to load folders");
                self.notifier.error("Failed to load folders");
                Err(e.into())
            }
        }
    }

    fn create(&self, name: &str) -> Result<(), FolderError> {
        report(&self.notifier, self.insert(name), "Folder created!", "Failed to create folder")
    }

    fn rename(&self, id: &str, name: &str) -> Result<(), FolderError> {
        report(&self.notifier, self.set_name(id, name), "Folder renamed!", "Failed to rename folder")
    }

    /// Moves the folder's bookmarks out of it first; they are kept.
    fn delete(&self, id: &str) -> Result<(), FolderError> {
        report(&self.notifier, self.remove(id), "Folder deleted!", "Failed to delete folder")
    }

    fn sync(&mut self) -> usize {
        self.table.sync()
    }

    fn teardown(&mut self) {
        self.table.release();
        self.user_id = None;
    }

    fn folders(&self) -> &[Folder] {
        self.table.mirror().rows()
    }

    fn mirror(&self) -> &LocalMirror<Folder> {
        self.table.mirror()
    }
}
