//! Smart Bookmark persistent store.
//!
//! Provides SQLite connection management, schema migrations, per-user table
//! operations and the change feed that mirrors every committed mutation.
//!
//! # Usage
//!
//! ```no_run
//! use smart_bookmark::database::Database;
//!
//! // Open a persistent database
//! let db = Database::open("smart-bookmark.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! // Watch one user's bookmarks
//! let mut subscription = db.feed().bookmarks.subscribe("user-1");
//! let pending = subscription.drain();
//! ```

pub mod change_feed;
pub mod connection;
pub mod migrations;
pub mod store;

pub use change_feed::{ChangeFeed, Channel, Subscription};
pub use connection::Database;
