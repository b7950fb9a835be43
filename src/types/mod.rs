// Smart Bookmark shared type definitions
// Each submodule defines types used across the application.

pub mod bookmark;
pub mod categorize;
pub mod change;
pub mod errors;
pub mod folder;
pub mod notice;
pub mod session;
pub mod settings;
pub mod tag;
