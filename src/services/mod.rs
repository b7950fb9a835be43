// Smart Bookmark services
// Services provide the collaborators managers and surfaces lean on: auth, categorization, crypto,
// deep links, filtering, notices and settings.

pub mod auth_provider;
pub mod categorizer;
pub mod crypto_service;
pub mod deep_link;
pub mod filter_engine;
pub mod notifier;
pub mod settings_engine;
