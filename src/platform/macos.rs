// Smart Bookmark paths on macOS
// Config: ~/Library/Application Support/SmartBookmark
// Data:   ~/Library/Application Support/SmartBookmark/data

use std::env;
use std::path::PathBuf;

fn app_support_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
        .join("Library")
        .join("Application Support")
        .join("SmartBookmark")
}

pub fn get_config_dir() -> PathBuf {
    app_support_dir()
}

pub fn get_data_dir() -> PathBuf {
    app_support_dir().join("data")
}
