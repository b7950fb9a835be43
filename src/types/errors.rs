use thiserror::Error;

// === StoreError ===

/// Errors raised by the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite operation failed.
    #[error("Store database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// No row with the given ID is visible to the current user.
    #[error("Row not found: {0}")]
    NotFound(String),
    /// The referenced folder does not exist for the current user.
    #[error("Referenced folder not found: {0}")]
    FolderNotFound(String),
    /// The referenced tag does not exist for the current user.
    #[error("Referenced tag not found: {0}")]
    TagNotFound(String),
}

// === BookmarkError ===

/// Errors related to bookmark operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// No user is signed in.
    #[error("User not authenticated")]
    NotAuthenticated,
    /// A required field is missing or malformed.
    #[error("Invalid bookmark: {0}")]
    Validation(String),
    /// Bookmark with the given ID was not found.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// The target folder was not found.
    #[error("Bookmark folder not found: {0}")]
    FolderNotFound(String),
    /// The tag to attach was not found.
    #[error("Bookmark tag not found: {0}")]
    TagNotFound(String),
    /// A suggested folder or tag could not be found or created.
    #[error("Could not apply suggestion: {0}")]
    Suggestion(String),
    /// The store rejected the operation.
    #[error("Bookmark store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for BookmarkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => BookmarkError::NotFound(id),
            StoreError::FolderNotFound(id) => BookmarkError::FolderNotFound(id),
            StoreError::TagNotFound(id) => BookmarkError::TagNotFound(id),
            other => BookmarkError::Store(other),
        }
    }
}

// === FolderError ===

/// Errors related to folder operations.
#[derive(Debug, Error)]
pub enum FolderError {
    /// No user is signed in.
    #[error("User not authenticated")]
    NotAuthenticated,
    /// A required field is missing or malformed.
    #[error("Invalid folder: {0}")]
    Validation(String),
    /// Folder with the given ID was not found.
    #[error("Folder not found: {0}")]
    NotFound(String),
    /// The store rejected the operation.
    #[error("Folder store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for FolderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) | StoreError::FolderNotFound(id) => FolderError::NotFound(id),
            other => FolderError::Store(other),
        }
    }
}

// === TagError ===

/// Errors related to tag operations.
#[derive(Debug, Error)]
pub enum TagError {
    /// No user is signed in.
    #[error("User not authenticated")]
    NotAuthenticated,
    /// A required field is missing or malformed.
    #[error("Invalid tag: {0}")]
    Validation(String),
    /// Tag with the given ID was not found.
    #[error("Tag not found: {0}")]
    NotFound(String),
    /// The store rejected the operation.
    #[error("Tag store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for TagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) | StoreError::TagNotFound(id) => TagError::NotFound(id),
            other => TagError::Store(other),
        }
    }
}

// === AuthError ===

/// Errors related to sign-in and session handling.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No identity provider has been configured.
    #[error("Auth provider is not configured")]
    NotConfigured,
    /// No session is active.
    #[error("No active session")]
    NoSession,
    /// No sign-in is pending, so there is no PKCE verifier for the code.
    #[error("No sign-in in progress")]
    NoPendingSignIn,
    /// The provider rejected the code exchange or refresh.
    #[error("Session exchange failed: {0}")]
    ExchangeFailed(String),
    /// A network error occurred while talking to the provider.
    #[error("Auth network error: {0}")]
    Network(#[from] reqwest::Error),
    /// A URL could not be built.
    #[error("Invalid auth URL: {0}")]
    InvalidUrl(String),
    /// The PKCE verifier could not be generated.
    #[error("Auth crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

// === CryptoError ===

/// Errors related to random generation for the sign-in flow.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The system random number generator failed.
    #[error("Random generation error: {0}")]
    RandomGeneration(String),
}

// === CategorizeError ===

/// Errors related to the categorization service.
#[derive(Debug, Error)]
pub enum CategorizeError {
    /// The request is missing required fields.
    #[error("{0}")]
    Validation(String),
    /// No categorization endpoint has been configured.
    #[error("Categorization service is not configured")]
    NotConfigured,
    /// A network error occurred while calling the service.
    #[error("Categorization network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The service answered with an error.
    #[error("Categorization service error: {0}")]
    Service(String),
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === LinkError ===

/// Errors related to URLs, deep links and the extension handoff.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The value does not parse as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Only http and https pages can be bookmarked.
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// The configured app origin is not usable.
    #[error("Invalid app origin: {0}")]
    InvalidOrigin(String),
}
