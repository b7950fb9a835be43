//! App Core for Smart Bookmark.
//!
//! Central struct holding the store, the session context, the data managers
//! and the filter engine for one process. Surfaces share it behind a
//! `tokio::sync::Mutex`; the async sign-in helpers at the bottom of this file
//! release that lock while they wait on the identity provider.

use std::collections::{BTreeSet, HashMap};
use std::error::Error;
use std::fs;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::database::Database;
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::bookmark_tag_manager::{BookmarkTagManager, BookmarkTagManagerTrait};
use crate::managers::folder_manager::{FolderManager, FolderManagerTrait};
use crate::managers::session_manager::SessionContext;
use crate::managers::tag_manager::{TagManager, TagManagerTrait};
use crate::services::auth_provider::{AuthProvider, HttpAuthProvider};
use crate::services::categorizer::{Categorizer, HttpCategorizer};
use crate::services::filter_engine::{FilterCriteria, FilterEngine};
use crate::services::notifier::Notifier;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::bookmark::{Bookmark, BookmarkPatch};
use crate::types::categorize::Suggestions;
use crate::types::errors::{AuthError, BookmarkError};
use crate::types::session::User;

/// Central application struct holding all managers and services.
pub struct App {
    pub db: Arc<Database>,
    pub notifier: Notifier,
    pub session: SessionContext,
    pub bookmarks: BookmarkManager,
    pub folders: FolderManager,
    pub tags: TagManager,
    pub bookmark_tags: BookmarkTagManager,
    pub filter: FilterEngine,
    pub settings_engine: SettingsEngine,
    pub categorizer: Arc<dyn Categorizer>,
    session_rx: watch::Receiver<Option<User>>,
}

impl App {
    /// Creates an App from loaded settings: opens the database and builds the
    /// HTTP clients for the identity provider and the categorization service.
    pub fn new(settings_engine: SettingsEngine) -> Result<Self, Box<dyn Error>> {
        let db_path = settings_engine.database_path();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let db = Arc::new(Database::open(&db_path)?);

        let settings = settings_engine.get_settings().clone();
        let auth: Option<Arc<dyn AuthProvider>> = match HttpAuthProvider::from_settings(&settings.auth) {
            Ok(provider) => Some(Arc::new(provider)),
            Err(AuthError::NotConfigured) => {
                info!("no auth provider configured; sign-in is disabled");
                None
            }
            Err(e) => {
                warn!(error = %e, "auth provider settings are invalid; sign-in is disabled");
                None
            }
        };
        let categorizer = Arc::new(HttpCategorizer::from_settings(&settings.categorization)?);

        Ok(Self::with_services(db, settings_engine, auth, categorizer))
    }

    /// Creates an App around an open database and explicit collaborators.
    pub fn with_services(
        db: Arc<Database>,
        settings_engine: SettingsEngine,
        auth: Option<Arc<dyn AuthProvider>>,
        categorizer: Arc<dyn Categorizer>,
    ) -> Self {
        let notifier = Notifier::new();
        let session = SessionContext::new(auth, &settings_engine.get_settings().auth.app_origin);
        let session_rx = session.subscribe();

        Self {
            bookmarks: BookmarkManager::new(db.clone(), notifier.clone()),
            folders: FolderManager::new(db.clone(), notifier.clone()),
            tags: TagManager::new(db.clone(), notifier.clone()),
            bookmark_tags: BookmarkTagManager::new(db.clone(), notifier.clone()),
            filter: FilterEngine::new(),
            db,
            notifier,
            session,
            settings_engine,
            categorizer,
            session_rx,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session.current_user().map(|u| u.id.as_str())
    }

    /// Reloads every manager for `user` and resets the view filters.
    pub fn on_session_change(&mut self, user: Option<User>) {
        let user_id = user.as_ref().map(|u| u.id.as_str());
        info!(user_id = user_id.unwrap_or("-"), "reloading data for session change");

        // load failures already produced a notice; the mirror stays empty
        let _ = self.bookmarks.load(user_id);
        let _ = self.folders.load(user_id);
        let _ = self.tags.load(user_id);
        let _ = self.bookmark_tags.load(user_id);
        self.filter.set_criteria(FilterCriteria::default());
    }

    /// Follows session changes, then drains every change feed into the mirrors.
    /// Returns the number of change events applied.
    pub fn sync(&mut self) -> usize {
        if self.session_rx.has_changed().unwrap_or(false) {
            let user = self.session_rx.borrow_and_update().clone();
            self.on_session_change(user);
        }
        self.bookmarks.sync() + self.folders.sync() + self.tags.sync() + self.bookmark_tags.sync()
    }

    /// The bookmarks passing the current filters.
    pub fn visible(&mut self) -> Vec<Bookmark> {
        let bookmarks = self.bookmarks.mirror();
        let associations = self.bookmark_tags.mirror();
        self.filter
            .visible(
                bookmarks.rows(),
                bookmarks.revision(),
                associations.rows(),
                associations.revision(),
            )
            .to_vec()
    }

    /// Bookmark id to its sorted tag ids.
    pub fn tag_map(&mut self) -> HashMap<String, Vec<String>> {
        let associations = self.bookmark_tags.mirror();
        self.filter
            .tag_index(associations.rows(), associations.revision())
            .iter()
            .map(|(bookmark_id, tags)| {
                let sorted: BTreeSet<&String> = tags.iter().collect();
                (bookmark_id.clone(), sorted.into_iter().cloned().collect())
            })
            .collect()
    }

    /// Files the bookmark under the suggested folder and attaches the suggested
    /// tags, creating any folder or tag that does not exist yet. Names match
    /// case-insensitively.
    pub fn apply_suggestions(&mut self, bookmark_id: &str, suggestions: &Suggestions) -> Result<(), BookmarkError> {
        if self.user_id().is_none() {
            return Err(BookmarkError::NotAuthenticated);
        }
        self.sync();
        if self.bookmarks.mirror().get(bookmark_id).is_none() {
            return Err(BookmarkError::NotFound(bookmark_id.to_string()));
        }

        let folder_name = suggestions.folder_name.trim();
        if !folder_name.is_empty() {
            let folder_id = self.find_or_create_folder(folder_name)?;
            self.bookmarks.update(bookmark_id, &BookmarkPatch::move_to(Some(&folder_id)))?;
        }

        let mut seen = BTreeSet::new();
        for name in suggestions.tags.iter().map(|t| t.trim()) {
            if name.is_empty() || !seen.insert(name.to_lowercase()) {
                continue;
            }
            let tag_id = self.find_or_create_tag(name)?;
            self.bookmark_tags.attach(bookmark_id, &tag_id)?;
        }

        self.sync();
        Ok(())
    }

    fn find_or_create_folder(&mut self, name: &str) -> Result<String, BookmarkError> {
        let find = |folders: &FolderManager| {
            folders
                .folders()
                .iter()
                .find(|f| f.name.to_lowercase() == name.to_lowercase())
                .map(|f| f.id.clone())
        };
        if let Some(id) = find(&self.folders) {
            return Ok(id);
        }
        self.folders
            .create(name)
            .map_err(|e| BookmarkError::Suggestion(e.to_string()))?;
        self.folders.sync();
        find(&self.folders).ok_or_else(|| BookmarkError::Suggestion(format!("folder '{}' was not created", name)))
    }

    fn find_or_create_tag(&mut self, name: &str) -> Result<String, BookmarkError> {
        let find = |tags: &TagManager| {
            tags.tags()
                .iter()
                .find(|t| t.name.to_lowercase() == name.to_lowercase())
                .map(|t| t.id.clone())
        };
        if let Some(id) = find(&self.tags) {
            return Ok(id);
        }
        self.tags
            .create(name, None)
            .map_err(|e| BookmarkError::Suggestion(e.to_string()))?;
        self.tags.sync();
        find(&self.tags).ok_or_else(|| BookmarkError::Suggestion(format!("tag '{}' was not created", name)))
    }

    /// Releases every change-feed subscription.
    pub fn shutdown(&mut self) {
        self.bookmarks.teardown();
        self.folders.teardown();
        self.tags.teardown();
        self.bookmark_tags.teardown();
        info!("app shut down");
    }
}

/// Exchanges an OAuth code for a session and switches the app to its user.
pub async fn complete_sign_in(app: &Mutex<App>, code: &str) -> Result<User, AuthError> {
    let (provider, verifier) = {
        let mut guard = app.lock().await;
        let provider = guard.session.provider().ok_or(AuthError::NotConfigured)?;
        let verifier = guard.session.take_pending_verifier()?;
        (provider, verifier)
    };

    let session = provider.exchange_code(code, &verifier).await?;
    let user = session.user.clone();

    let mut guard = app.lock().await;
    guard.session.install(session);
    guard.sync();
    Ok(user)
}

/// Clears the local session, then revokes it with the provider.
///
/// The local sign-out always happens; a failed revocation is only logged.
pub async fn sign_out(app: &Mutex<App>) -> Result<(), AuthError> {
    let (provider, previous) = {
        let mut guard = app.lock().await;
        let previous = guard.session.clear().ok_or(AuthError::NoSession)?;
        guard.sync();
        (guard.session.provider(), previous)
    };

    if let Some(provider) = provider {
        if let Err(e) = provider.sign_out(&previous.access_token).await {
            warn!(error = %e, "provider sign-out failed");
        }
    }
    Ok(())
}

/// Refreshes the session if it has expired. A failed refresh signs the user out.
pub async fn ensure_fresh_session(app: &Mutex<App>) -> Result<(), AuthError> {
    let (provider, refresh_token) = {
        let guard = app.lock().await;
        match guard.session.refresh_token_if_expired(Utc::now()) {
            Some(token) => (guard.session.provider().ok_or(AuthError::NotConfigured)?, token),
            None => return Ok(()),
        }
    };

    match provider.refresh(&refresh_token).await {
        Ok(session) => {
            let mut guard = app.lock().await;
            guard.session.install(session);
            guard.sync();
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "session refresh failed; signing out");
            let mut guard = app.lock().await;
            guard.session.clear();
            guard.sync();
            Err(e)
        }
    }
}
