// Smart Bookmark platform abstraction
// Resolves where settings and the bookmark database live on Windows, macOS, and Linux.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Returns the platform-specific configuration directory.
///
/// - **Linux**: `$XDG_CONFIG_HOME/smart-bookmark`, else `~/.config/smart-bookmark`
/// - **macOS**: `~/Library/Application Support/SmartBookmark`
/// - **Windows**: `%APPDATA%/SmartBookmark`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific data directory, home of `bookmarks.db`.
///
/// - **Linux**: `$XDG_DATA_HOME/smart-bookmark`, else `~/.local/share/smart-bookmark`
/// - **macOS**: `~/Library/Application Support/SmartBookmark/data`
/// - **Windows**: `%LOCALAPPDATA%/SmartBookmark`
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_data_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_data_dir()
    }
}
