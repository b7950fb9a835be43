//! Unit tests for the JSON-RPC method dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use smart_bookmark::app::App;
use smart_bookmark::database::Database;
use smart_bookmark::rpc_handler::handle_method;
use smart_bookmark::services::auth_provider::AuthProvider;
use smart_bookmark::services::categorizer::Categorizer;
use smart_bookmark::services::settings_engine::SettingsEngine;
use smart_bookmark::types::categorize::{CategorizeRequest, Suggestions};
use smart_bookmark::types::errors::{AuthError, CategorizeError};
use smart_bookmark::types::session::{Session, User};
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Provider that accepts the code "good" and signs in as alice.
struct FakeProvider;

#[async_trait]
impl AuthProvider for FakeProvider {
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, AuthError> {
        Ok(format!(
            "https://auth.test/authorize?redirect_to={}&code_challenge={}",
            urlencoding::encode(redirect_to),
            code_challenge
        ))
    }

    async fn exchange_code(&self, code: &str, _code_verifier: &str) -> Result<Session, AuthError> {
        if code != "good" {
            return Err(AuthError::ExchangeFailed("bad code".to_string()));
        }
        Ok(Session {
            user: User {
                id: "alice".to_string(),
                email: Some("alice@example.com".to_string()),
            },
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        Err(AuthError::ExchangeFailed("no refresh in tests".to_string()))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

struct FixedCategorizer;

#[async_trait]
impl Categorizer for FixedCategorizer {
    async fn categorize(&self, request: &CategorizeRequest) -> Result<Suggestions, CategorizeError> {
        request.validate()?;
        Ok(Suggestions {
            folder_name: "Development".to_string(),
            tags: vec!["rust".to_string()],
        })
    }
}

fn build_app(dir: &TempDir) -> Mutex<App> {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let settings = SettingsEngine::new(Some(dir.path().join("settings.json").to_string_lossy().to_string()));
    let provider: Arc<dyn AuthProvider> = Arc::new(FakeProvider);
    Mutex::new(App::with_services(db, settings, Some(provider), Arc::new(FixedCategorizer)))
}

async fn call(app: &Mutex<App>, method: &str, params: Value) -> Result<Value, String> {
    handle_method(app, method, &params).await
}

async fn signed_in(dir: &TempDir) -> Mutex<App> {
    let app = build_app(dir);
    call(&app, "session.sign_in_url", json!({})).await.unwrap();
    call(&app, "session.complete", json!({"code": "good"})).await.unwrap();
    app
}

/// Adds a bookmark and returns its id.
async fn add_bookmark(app: &Mutex<App>, url: &str, title: &str) -> String {
    call(app, "bookmark.add", json!({"url": url, "title": title})).await.unwrap();
    let list = call(app, "bookmark.list", json!({})).await.unwrap();
    list.as_array()
        .unwrap()
        .iter()
        .find(|b| b["title"] == title)
        .map(|b| b["id"].as_str().unwrap().to_string())
        .unwrap()
}

fn find_id(list: &Value, name: &str) -> String {
    list.as_array()
        .unwrap()
        .iter()
        .find(|row| row["name"] == name)
        .map(|row| row["id"].as_str().unwrap().to_string())
        .unwrap()
}

#[tokio::test]
async fn test_ping_and_unknown_method() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&dir);

    let pong = call(&app, "ping", json!({})).await.unwrap();
    assert_eq!(pong["pong"], true);

    let err = call(&app, "bookmark.explode", json!({})).await.unwrap_err();
    assert_eq!(err, "unknown method: bookmark.explode");
}

#[tokio::test]
async fn test_missing_parameter_is_named() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;

    assert_eq!(call(&app, "bookmark.delete", json!({})).await.unwrap_err(), "missing id");
    assert_eq!(
        call(&app, "bookmark.tag", json!({"bookmark_id": "b"})).await.unwrap_err(),
        "missing tag_id"
    );
    assert_eq!(call(&app, "folder.add", json!({})).await.unwrap_err(), "missing name");
}

#[tokio::test]
async fn test_sign_in_flow_switches_user() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&dir);

    let current = call(&app, "session.current", json!({})).await.unwrap();
    assert!(current["user"].is_null());

    // a code without a pending sign-in is refused
    assert!(call(&app, "session.complete", json!({"code": "good"})).await.is_err());

    let started = call(&app, "session.sign_in_url", json!({"returnTo": "/bookmark/add"})).await.unwrap();
    let url = started["url"].as_str().unwrap();
    assert!(url.starts_with("https://auth.test/authorize?redirect_to="));
    assert!(url.contains("code_challenge="));

    let done = call(&app, "session.complete", json!({"code": "good"})).await.unwrap();
    assert_eq!(done["user"]["id"], "alice");

    let current = call(&app, "session.current", json!({})).await.unwrap();
    assert_eq!(current["user"]["email"], "alice@example.com");
    assert!(current.to_string().find("access").is_none(), "tokens are never exposed");
}

#[tokio::test]
async fn test_bad_code_leaves_user_signed_out() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&dir);
    call(&app, "session.sign_in_url", json!({})).await.unwrap();

    let err = call(&app, "session.complete", json!({"code": "bad"})).await.unwrap_err();
    assert!(err.contains("bad code"));
    assert!(app.lock().await.user_id().is_none());
}

#[tokio::test]
async fn test_signed_out_writes_fail() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&dir);

    let err = call(&app, "bookmark.add", json!({"url": "https://example.com", "title": "Example"}))
        .await
        .unwrap_err();
    assert!(!err.is_empty());
    assert_eq!(call(&app, "bookmark.list", json!({})).await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_bookmark_crud() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;

    let id = add_bookmark(&app, "https://example.com", "Example").await;

    assert_eq!(
        call(&app, "bookmark.update", json!({"id": id})).await.unwrap_err(),
        "nothing to update"
    );
    call(&app, "bookmark.update", json!({"id": id, "title": "Renamed", "description": "notes"}))
        .await
        .unwrap();
    let list = call(&app, "bookmark.list", json!({})).await.unwrap();
    assert_eq!(list[0]["title"], "Renamed");
    assert_eq!(list[0]["description"], "notes");
    assert_eq!(list[0]["user_id"], "alice");

    call(&app, "bookmark.delete", json!({"id": id})).await.unwrap();
    assert_eq!(call(&app, "bookmark.list", json!({})).await.unwrap(), json!([]));
    assert!(call(&app, "bookmark.delete", json!({"id": id})).await.is_err());
}

#[tokio::test]
async fn test_notices_follow_operations() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;
    call(&app, "notices.drain", json!({})).await.unwrap();

    add_bookmark(&app, "https://example.com", "Example").await;
    let _ = call(&app, "bookmark.add", json!({"url": "not a url", "title": "Broken"})).await;

    let notices = call(&app, "notices.drain", json!({})).await.unwrap();
    assert_eq!(
        notices,
        json!([
            {"level": "success", "message": "Bookmark saved successfully!"},
            {"level": "error", "message": "Failed to save bookmark"}
        ])
    );
    assert_eq!(call(&app, "notices.drain", json!({})).await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_folders_and_tags() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;

    call(&app, "folder.add", json!({"name": "work"})).await.unwrap();
    call(&app, "folder.add", json!({"name": "Archive"})).await.unwrap();
    let folders = call(&app, "folder.list", json!({})).await.unwrap();
    assert_eq!(folders[0]["name"], "Archive");
    assert_eq!(folders[1]["name"], "work");

    let work = find_id(&folders, "work");
    call(&app, "folder.rename", json!({"id": work, "name": "Work"})).await.unwrap();
    let folders = call(&app, "folder.list", json!({})).await.unwrap();
    assert_eq!(folders[1]["name"], "Work");
    call(&app, "folder.delete", json!({"id": work})).await.unwrap();
    assert_eq!(call(&app, "folder.list", json!({})).await.unwrap().as_array().unwrap().len(), 1);

    call(&app, "tag.add", json!({"name": "rust", "color": "#123456"})).await.unwrap();
    let tags = call(&app, "tag.list", json!({})).await.unwrap();
    let rust = find_id(&tags, "rust");
    assert_eq!(tags[0]["color"], "#123456");

    call(&app, "tag.update", json!({"id": rust, "name": "Rust"})).await.unwrap();
    let tags = call(&app, "tag.list", json!({})).await.unwrap();
    assert_eq!(tags[0]["name"], "Rust");
    assert_eq!(tags[0]["color"], "#123456");

    assert!(call(&app, "tag.add", json!({"name": "bad", "color": "red"})).await.is_err());
    call(&app, "tag.delete", json!({"id": rust})).await.unwrap();
    assert_eq!(call(&app, "tag.list", json!({})).await.unwrap(), json!([]));
}

#[tokio::test]
async fn test_tag_filter_and_tag_map() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;

    let first = add_bookmark(&app, "https://example.com", "Example").await;
    let second = add_bookmark(&app, "https://docs.rs", "Docs").await;
    call(&app, "tag.add", json!({"name": "t1"})).await.unwrap();
    let t1 = find_id(&call(&app, "tag.list", json!({})).await.unwrap(), "t1");

    call(&app, "bookmark.tag", json!({"bookmark_id": first, "tag_id": t1})).await.unwrap();

    let shown = call(&app, "view.set_filter", json!({"tag_ids": [t1]})).await.unwrap();
    let ids: Vec<&str> = shown.as_array().unwrap().iter().map(|b| b["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![first.as_str()]);

    let map = call(&app, "view.tag_map", json!({})).await.unwrap();
    assert_eq!(map[&first], json!([t1]));
    assert!(map.get(&second).is_none());

    call(&app, "bookmark.untag", json!({"bookmark_id": first, "tag_id": t1})).await.unwrap();
    assert_eq!(call(&app, "view.visible", json!({})).await.unwrap(), json!([]));

    let everything = call(&app, "view.set_filter", json!({})).await.unwrap();
    assert_eq!(everything.as_array().unwrap().len(), 2);
    let searched = call(&app, "view.set_filter", json!({"query": "DOCS"})).await.unwrap();
    assert_eq!(searched[0]["id"], second);
}

#[tokio::test]
async fn test_apply_suggestions_creates_folder_and_tags() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;
    let id = add_bookmark(&app, "https://tokio.rs", "Tokio").await;
    call(&app, "tag.add", json!({"name": "Rust"})).await.unwrap();

    call(
        &app,
        "bookmark.apply_suggestions",
        json!({
            "bookmark_id": id,
            "suggestions": {"folderName": "Development", "tags": ["rust", "async", "ASYNC", " "]}
        }),
    )
    .await
    .unwrap();

    let folders = call(&app, "folder.list", json!({})).await.unwrap();
    let development = find_id(&folders, "Development");
    let list = call(&app, "bookmark.list", json!({})).await.unwrap();
    assert_eq!(list[0]["folder_id"], development);

    let tags = call(&app, "tag.list", json!({})).await.unwrap();
    let names: Vec<&str> = tags.as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["async", "Rust"], "existing tags are matched ignoring case");

    let map = call(&app, "view.tag_map", json!({})).await.unwrap();
    assert_eq!(map[&id].as_array().unwrap().len(), 2);

    assert_eq!(
        call(&app, "bookmark.apply_suggestions", json!({"bookmark_id": id})).await.unwrap_err(),
        "missing suggestions"
    );
    assert!(call(
        &app,
        "bookmark.apply_suggestions",
        json!({"bookmark_id": "missing", "suggestions": {"folderName": "X"}})
    )
    .await
    .is_err());
}

#[tokio::test]
async fn test_settings_get_and_set() {
    let dir = TempDir::new().unwrap();
    let app = build_app(&dir);

    let settings = call(&app, "settings.get", json!({})).await.unwrap();
    assert_eq!(settings["server"]["bind_address"], "127.0.0.1:3000");

    call(&app, "settings.set", json!({"key": "server.bind_address", "value": "0.0.0.0:8080"}))
        .await
        .unwrap();
    let settings = call(&app, "settings.get", json!({})).await.unwrap();
    assert_eq!(settings["server"]["bind_address"], "0.0.0.0:8080");

    assert_eq!(
        call(&app, "settings.set", json!({"key": "server.bind_address"})).await.unwrap_err(),
        "missing value"
    );
    assert!(call(&app, "settings.set", json!({"key": "no.such.key", "value": 1})).await.is_err());

    call(&app, "settings.set", json!({"key": "categorization.api_key", "value": "sk-live"}))
        .await
        .unwrap();
    let settings = call(&app, "settings.get", json!({})).await.unwrap();
    assert_eq!(settings["categorization"]["api_key"], "********");
    assert!(settings["auth"]["anon_key"].is_null());
    assert!(!settings.to_string().contains("sk-live"));
}

#[tokio::test]
async fn test_sign_out_clears_data_and_requires_session() {
    let dir = TempDir::new().unwrap();
    let app = signed_in(&dir).await;
    add_bookmark(&app, "https://example.com", "Example").await;

    call(&app, "session.sign_out", json!({})).await.unwrap();
    assert_eq!(call(&app, "bookmark.list", json!({})).await.unwrap(), json!([]));
    assert!(call(&app, "session.current", json!({})).await.unwrap()["user"].is_null());

    assert_eq!(
        call(&app, "session.sign_out", json!({})).await.unwrap_err(),
        "No active session"
    );

    // signing back in brings the data back
    call(&app, "session.sign_in_url", json!({})).await.unwrap();
    call(&app, "session.complete", json!({"code": "good"})).await.unwrap();
    assert_eq!(call(&app, "bookmark.list", json!({})).await.unwrap().as_array().unwrap().len(), 1);
}
