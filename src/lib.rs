//! Smart Bookmark: a personal bookmark manager.
//!
//! Bookmarks, folders and tags live in a per-user SQLite store whose change
//! feed keeps in-process mirrors current. An external service can suggest a
//! folder and tags for a page. This library crate exposes all modules for use
//! by the binaries and integration tests.

pub mod app;
pub mod database;
pub mod http;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
