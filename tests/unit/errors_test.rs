use smart_bookmark::types::errors::*;

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(StoreError::NotFound("b-1".to_string()).to_string(), "Row not found: b-1");
    assert_eq!(
        StoreError::FolderNotFound("f-1".to_string()).to_string(),
        "Referenced folder not found: f-1"
    );
    assert_eq!(
        StoreError::TagNotFound("t-1".to_string()).to_string(),
        "Referenced tag not found: t-1"
    );
}

#[test]
fn store_error_wraps_sqlite_errors() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::Database(_)));
    assert!(err.to_string().starts_with("Store database error:"));
}

// === BookmarkError Tests ===

#[test]
fn bookmark_error_display_variants() {
    assert_eq!(BookmarkError::NotAuthenticated.to_string(), "User not authenticated");
    assert_eq!(
        BookmarkError::Validation("title is required".to_string()).to_string(),
        "Invalid bookmark: title is required"
    );
    assert_eq!(
        BookmarkError::Suggestion("tag 'x' was not created".to_string()).to_string(),
        "Could not apply suggestion: tag 'x' was not created"
    );
}

#[test]
fn bookmark_error_maps_store_lookups() {
    assert!(matches!(
        BookmarkError::from(StoreError::NotFound("b".to_string())),
        BookmarkError::NotFound(id) if id == "b"
    ));
    assert!(matches!(
        BookmarkError::from(StoreError::FolderNotFound("f".to_string())),
        BookmarkError::FolderNotFound(id) if id == "f"
    ));
    assert!(matches!(
        BookmarkError::from(StoreError::TagNotFound("t".to_string())),
        BookmarkError::TagNotFound(id) if id == "t"
    ));
    assert!(matches!(
        BookmarkError::from(StoreError::Database(rusqlite::Error::InvalidQuery)),
        BookmarkError::Store(_)
    ));
}

// === FolderError / TagError Tests ===

#[test]
fn folder_error_maps_both_not_found_kinds() {
    assert!(matches!(
        FolderError::from(StoreError::NotFound("f".to_string())),
        FolderError::NotFound(_)
    ));
    assert!(matches!(
        FolderError::from(StoreError::FolderNotFound("f".to_string())),
        FolderError::NotFound(_)
    ));
    assert_eq!(FolderError::NotFound("f".to_string()).to_string(), "Folder not found: f");
}

#[test]
fn tag_error_maps_both_not_found_kinds() {
    assert!(matches!(TagError::from(StoreError::NotFound("t".to_string())), TagError::NotFound(_)));
    assert!(matches!(TagError::from(StoreError::TagNotFound("t".to_string())), TagError::NotFound(_)));
    assert_eq!(TagError::Validation("bad colour".to_string()).to_string(), "Invalid tag: bad colour");
}

// === AuthError / CryptoError Tests ===

#[test]
fn auth_error_display_variants() {
    assert_eq!(AuthError::NotConfigured.to_string(), "Auth provider is not configured");
    assert_eq!(AuthError::NoSession.to_string(), "No active session");
    assert_eq!(AuthError::NoPendingSignIn.to_string(), "No sign-in in progress");
}

#[test]
fn auth_error_wraps_crypto_error() {
    let err: AuthError = CryptoError::RandomGeneration("rng down".to_string()).into();
    assert_eq!(err.to_string(), "Auth crypto error: Random generation error: rng down");
}

// === CategorizeError Tests ===

#[test]
fn categorize_validation_message_is_passed_through() {
    let err = CategorizeError::Validation("URL and title are required".to_string());
    assert_eq!(err.to_string(), "URL and title are required");
    assert_eq!(
        CategorizeError::NotConfigured.to_string(),
        "Categorization service is not configured"
    );
}

// === SettingsError / LinkError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::InvalidKey("nope".to_string()).to_string(),
        "Invalid settings key: nope"
    );
    assert_eq!(
        SettingsError::IoError("disk full".to_string()).to_string(),
        "Settings I/O error: disk full"
    );
}

#[test]
fn link_error_display_and_equality() {
    let err = LinkError::UnsupportedScheme("ftp".to_string());
    assert_eq!(err.to_string(), "Unsupported URL scheme: ftp");
    assert_eq!(err, LinkError::UnsupportedScheme("ftp".to_string()));
}

#[test]
fn errors_implement_error_trait() {
    let err: Box<dyn std::error::Error> = Box::new(TagError::NotFound("id".to_string()));
    assert!(err.source().is_none());
}
