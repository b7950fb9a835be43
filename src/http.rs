//! HTTP surface of Smart Bookmark.
//!
//! Serves the categorization and health endpoints, the OAuth sign-in and
//! callback redirects, the add-bookmark deep link and a JSON-RPC route that
//! shares its dispatcher with the stdio server.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::app::{complete_sign_in, App};
use crate::managers::bookmark_manager::BookmarkManagerTrait;
use crate::managers::session_manager::{safe_return_to, AUTH_CALLBACK_PATH};
use crate::rpc_handler::handle_method;
use crate::services::deep_link::{
    closes_window_after, default_title, AddBookmarkForm, AddBookmarkQuery, AddBookmarkSubmission,
    LinkSource, ADD_BOOKMARK_PATH,
};
use crate::types::categorize::CategorizeRequest;
use crate::types::errors::{BookmarkError, CategorizeError};

pub type SharedApp = Arc<Mutex<App>>;

/// Builds the router for every HTTP endpoint.
pub fn router(app: SharedApp) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/bookmarks/categorize", post(categorize))
        .route("/api/rpc", post(rpc))
        .route("/auth/sign-in", get(sign_in))
        .route(AUTH_CALLBACK_PATH, get(auth_callback))
        .route(ADD_BOOKMARK_PATH, get(add_bookmark_form).post(add_bookmark))
        .layer(TraceLayer::new_for_http())
        .with_state(app)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok", "timestamp": Utc::now().to_rfc3339()}))
}

async fn categorize(State(app): State<SharedApp>, body: Bytes) -> Response {
    let request: CategorizeRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "malformed categorize request");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };
    if request.validate().is_err() {
        return error_response(StatusCode::BAD_REQUEST, "URL and title are required");
    }

    // the service call runs without holding the app lock
    let categorizer = app.lock().await.categorizer.clone();
    match categorizer.categorize(&request).await {
        Ok(suggestions) => Json(json!({"suggestions": suggestions})).into_response(),
        Err(CategorizeError::Validation(_)) => {
            error_response(StatusCode::BAD_REQUEST, "URL and title are required")
        }
        Err(e) => {
            error!(error = %e, "categorization failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to categorize bookmark")
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

async fn rpc(State(app): State<SharedApp>, Json(req): Json<RpcRequest>) -> Json<Value> {
    let params = req.params.unwrap_or_else(|| json!({}));
    let response = match handle_method(&app, &req.method, &params).await {
        Ok(result) => json!({"id": req.id, "result": result}),
        Err(err) => json!({"id": req.id, "error": err}),
    };
    Json(response)
}

#[derive(Debug, Default, Deserialize)]
struct SignInQuery {
    #[serde(rename = "returnTo")]
    return_to: Option<String>,
}

async fn sign_in(State(app): State<SharedApp>, Query(query): Query<SignInQuery>) -> Redirect {
    let mut guard = app.lock().await;
    match guard.session.sign_in_url(query.return_to.as_deref()) {
        Ok(url) => Redirect::to(&url),
        Err(e) => {
            warn!(error = %e, "cannot start sign-in");
            Redirect::to("/")
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    #[serde(rename = "returnTo")]
    return_to: Option<String>,
}

async fn auth_callback(State(app): State<SharedApp>, Query(query): Query<CallbackQuery>) -> Redirect {
    // without a provider there is no sign-in to return from
    if !app.lock().await.session.is_configured() {
        warn!("auth callback with no provider configured");
        return Redirect::to("/");
    }
    match query.code.as_deref() {
        Some(code) => {
            if let Err(e) = complete_sign_in(&app, code).await {
                error!(error = %e, "auth callback failed");
            }
        }
        None => warn!("auth callback without a code"),
    }
    Redirect::to(&safe_return_to(query.return_to.as_deref()))
}

async fn add_bookmark_form(Query(query): Query<AddBookmarkQuery>) -> Json<AddBookmarkForm> {
    Json(AddBookmarkForm::prefill(&query))
}

async fn add_bookmark(State(app): State<SharedApp>, Json(submission): Json<AddBookmarkSubmission>) -> Response {
    let source = LinkSource::parse(submission.source.as_deref());
    let mut bookmark = submission.bookmark;
    if bookmark.title.trim().is_empty() {
        bookmark.title = default_title(&bookmark.url);
    }

    let result = {
        let mut guard = app.lock().await;
        let result = guard.bookmarks.create(bookmark);
        guard.sync();
        result
    };

    match result {
        Ok(()) => Json(json!({"ok": true, "closeWindow": closes_window_after(source, true)})).into_response(),
        Err(e) => {
            let status = match e {
                BookmarkError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                BookmarkError::Validation(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(json!({"ok": false, "closeWindow": closes_window_after(source, false), "error": e.to_string()})),
            )
                .into_response()
        }
    }
}
