//! RPC method handler for the Smart Bookmark JSON-RPC protocol.
//!
//! Shared by the stdio server and the `/api/rpc` HTTP route so it can be
//! unit-tested independently. `handle_method` dispatches a call to the
//! managers and services on the `App`; every call that touches data drains
//! the change feeds before it answers, so a caller always reads its own writes.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::app::{complete_sign_in, ensure_fresh_session, sign_out, App};
use crate::managers::bookmark_manager::BookmarkManagerTrait;
use crate::managers::bookmark_tag_manager::BookmarkTagManagerTrait;
use crate::managers::folder_manager::FolderManagerTrait;
use crate::managers::tag_manager::TagManagerTrait;
use crate::services::filter_engine::FilterCriteria;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::bookmark::{BookmarkPatch, NewBookmark};
use crate::types::categorize::Suggestions;
use crate::types::tag::TagPatch;

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn opt_str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

fn parse_params<T: DeserializeOwned>(params: &Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|e| format!("invalid params: {}", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn ok() -> Value {
    json!({"ok": true})
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Session ───
        "session.current" => {
            // an expired session that cannot be refreshed is simply gone
            let _ = ensure_fresh_session(app).await;
            let mut a = app.lock().await;
            a.sync();
            Ok(json!({"user": a.session.current_user()}))
        }
        "session.sign_in_url" => {
            let return_to = opt_str_param(params, "returnTo");
            let mut a = app.lock().await;
            let url = a.session.sign_in_url(return_to).map_err(|e| e.to_string())?;
            Ok(json!({"url": url}))
        }
        "session.complete" => {
            let code = str_param(params, "code")?;
            let user = complete_sign_in(app, code).await.map_err(|e| e.to_string())?;
            Ok(json!({"user": user}))
        }
        "session.sign_out" => {
            sign_out(app).await.map_err(|e| e.to_string())?;
            Ok(ok())
        }

        // ─── Bookmarks ───
        "bookmark.list" => {
            let mut a = app.lock().await;
            a.sync();
            to_json(&a.bookmarks.bookmarks())
        }
        "bookmark.add" => {
            let new: NewBookmark = parse_params(params)?;
            let mut a = app.lock().await;
            let result = a.bookmarks.create(new);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "bookmark.update" => {
            let id = str_param(params, "id")?;
            let patch: BookmarkPatch = parse_params(params)?;
            if patch.is_empty() {
                return Err("nothing to update".to_string());
            }
            let mut a = app.lock().await;
            let result = a.bookmarks.update(id, &patch);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "bookmark.delete" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().await;
            let result = a.bookmarks.delete(id);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "bookmark.tag" | "bookmark.untag" => {
            let bookmark_id = str_param(params, "bookmark_id")?;
            let tag_id = str_param(params, "tag_id")?;
            let mut a = app.lock().await;
            let result = if method == "bookmark.tag" {
                a.bookmark_tags.attach(bookmark_id, tag_id)
            } else {
                a.bookmark_tags.detach(bookmark_id, tag_id)
            };
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "bookmark.apply_suggestions" => {
            let bookmark_id = str_param(params, "bookmark_id")?;
            let suggestions: Suggestions = params
                .get("suggestions")
                .ok_or("missing suggestions")
                .and_then(|v| parse_params(v).map_err(|_| "invalid suggestions"))?;
            let mut a = app.lock().await;
            a.apply_suggestions(bookmark_id, &suggestions)
                .map_err(|e| e.to_string())?;
            Ok(ok())
        }

        // ─── Folders ───
        "folder.list" => {
            let mut a = app.lock().await;
            a.sync();
            to_json(&a.folders.folders())
        }
        "folder.add" => {
            let name = str_param(params, "name")?;
            let mut a = app.lock().await;
            let result = a.folders.create(name);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "folder.rename" => {
            let id = str_param(params, "id")?;
            let name = str_param(params, "name")?;
            let mut a = app.lock().await;
            let result = a.folders.rename(id, name);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "folder.delete" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().await;
            let result = a.folders.delete(id);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }

        // ─── Tags ───
        "tag.list" => {
            let mut a = app.lock().await;
            a.sync();
            to_json(&a.tags.tags())
        }
        "tag.add" => {
            let name = str_param(params, "name")?;
            let color = opt_str_param(params, "color");
            let mut a = app.lock().await;
            let result = a.tags.create(name, color);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "tag.update" => {
            let id = str_param(params, "id")?;
            let patch: TagPatch = parse_params(params)?;
            let mut a = app.lock().await;
            let result = a.tags.update(id, &patch);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }
        "tag.delete" => {
            let id = str_param(params, "id")?;
            let mut a = app.lock().await;
            let result = a.tags.delete(id);
            a.sync();
            result.map_err(|e| e.to_string())?;
            Ok(ok())
        }

        // ─── View ───
        "view.set_filter" => {
            let criteria: FilterCriteria = parse_params(params)?;
            let mut a = app.lock().await;
            a.sync();
            a.filter.set_criteria(criteria);
            to_json(&a.visible())
        }
        "view.visible" => {
            let mut a = app.lock().await;
            a.sync();
            to_json(&a.visible())
        }
        "view.tag_map" => {
            let mut a = app.lock().await;
            a.sync();
            to_json(&a.tag_map())
        }

        // ─── Notices ───
        "notices.drain" => {
            let a = app.lock().await;
            to_json(&a.notifier.drain())
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().await;
            to_json(&a.settings_engine.get_settings().redacted())
        }
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().await;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(ok())
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
