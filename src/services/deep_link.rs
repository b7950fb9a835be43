//! The add-bookmark deep link and the browser-extension handoff.
//!
//! The extension opens `<origin>/bookmark/add?url=..&title=..&source=extension-popup`;
//! the app prefills its form from that query and, for the extension source
//! only, asks the window to close once the save succeeded.

use serde::{Deserialize, Serialize};

use crate::types::bookmark::{parse_web_url, NewBookmark};
use crate::types::errors::LinkError;

pub const ADD_BOOKMARK_PATH: &str = "/bookmark/add";

/// Where an add-bookmark request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkSource {
    ExtensionPopup,
    Manual,
}

impl LinkSource {
    /// Anything other than `extension-popup`, including no source at all, is manual entry.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("extension-popup") => LinkSource::ExtensionPopup,
            _ => LinkSource::Manual,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkSource::ExtensionPopup => "extension-popup",
            LinkSource::Manual => "manual",
        }
    }
}

/// Query string of `GET /bookmark/add`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBookmarkQuery {
    pub url: Option<String>,
    pub title: Option<String>,
    pub source: Option<String>,
}

/// Prefilled form state for the add-bookmark page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookmarkForm {
    pub url: String,
    pub title: String,
    pub source: LinkSource,
    pub close_on_save: bool,
}

impl AddBookmarkForm {
    pub fn prefill(query: &AddBookmarkQuery) -> Self {
        let url = query.url.clone().unwrap_or_default();
        let title = match query.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => default_title(&url),
        };
        let source = LinkSource::parse(query.source.as_deref());
        Self {
            url,
            title,
            source,
            close_on_save: source == LinkSource::ExtensionPopup,
        }
    }
}

/// Body of `POST /bookmark/add`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddBookmarkSubmission {
    #[serde(flatten)]
    pub bookmark: NewBookmark,
    #[serde(default)]
    pub source: Option<String>,
}

/// Title used when the link carries none: the URL's host, else the URL itself.
pub fn default_title(url: &str) -> String {
    parse_web_url(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Whether the window should close after a save attempt.
pub fn closes_window_after(source: LinkSource, saved: bool) -> bool {
    saved && source == LinkSource::ExtensionPopup
}

/// Builds the link the extension opens for the active tab.
///
/// Only `http`/`https` pages can be handed off.
pub fn extension_handoff_url(origin: &str, tab_url: &str, tab_title: &str) -> Result<String, LinkError> {
    let parsed_origin =
        url::Url::parse(origin).map_err(|e| LinkError::InvalidOrigin(format!("{}: {}", origin, e)))?;
    if !matches!(parsed_origin.scheme(), "http" | "https") {
        return Err(LinkError::InvalidOrigin(origin.to_string()));
    }
    parse_web_url(tab_url)?;

    Ok(format!(
        "{}{}?url={}&title={}&source={}",
        origin.trim_end_matches('/'),
        ADD_BOOKMARK_PATH,
        urlencoding::encode(tab_url),
        urlencoding::encode(tab_title),
        LinkSource::ExtensionPopup.as_str()
    ))
}
