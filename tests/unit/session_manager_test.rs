//! Unit tests for the session context and the sign-in flow.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rstest::rstest;
use smart_bookmark::managers::session_manager::{callback_url, safe_return_to, SessionContext};
use smart_bookmark::services::auth_provider::{AuthProvider, HttpAuthProvider};
use smart_bookmark::services::crypto_service::pkce_challenge;
use smart_bookmark::types::errors::AuthError;
use smart_bookmark::types::session::{Session, User};
use smart_bookmark::types::settings::AuthSettings;

/// Provider double that records the challenge it was handed.
#[derive(Default)]
struct RecordingProvider {
    challenges: Mutex<Vec<String>>,
}

#[async_trait]
impl AuthProvider for RecordingProvider {
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, AuthError> {
        self.challenges.lock().unwrap().push(code_challenge.to_string());
        Ok(format!("https://auth.test/authorize?redirect_to={}", urlencoding::encode(redirect_to)))
    }

    async fn exchange_code(&self, _code: &str, _code_verifier: &str) -> Result<Session, AuthError> {
        Err(AuthError::ExchangeFailed("not used".to_string()))
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<Session, AuthError> {
        Err(AuthError::ExchangeFailed("not used".to_string()))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

fn session(user_id: &str, expires_in: Duration) -> Session {
    Session {
        user: User {
            id: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
        },
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now() + expires_in,
    }
}

#[rstest]
#[case(Some("/bookmarks"), "/bookmarks")]
#[case(Some("/bookmark/add?url=x"), "/bookmark/add?url=x")]
#[case(Some("https://evil.example"), "/")]
#[case(Some("//evil.example"), "/")]
#[case(Some("/\\evil.example"), "/")]
#[case(Some("/\\/evil.example"), "/")]
#[case(Some("/\t/evil.example"), "/")]
#[case(Some("/\n/evil.example"), "/")]
#[case(Some("/bookmarks?next=//evil.example"), "/bookmarks?next=//evil.example")]
#[case(Some("/auth/callback?code=1"), "/")]
#[case(Some("relative"), "/")]
#[case(Some(""), "/")]
#[case(None, "/")]
fn test_safe_return_to(#[case] input: Option<&str>, #[case] expected: &str) {
    assert_eq!(safe_return_to(input), expected);
}

#[test]
fn test_callback_url_carries_return_to() {
    assert_eq!(
        callback_url("https://app.example", Some("/bookmarks")).unwrap(),
        "https://app.example/auth/callback?returnTo=%2Fbookmarks"
    );
    assert_eq!(
        callback_url("https://app.example", None).unwrap(),
        "https://app.example/auth/callback"
    );
    assert_eq!(
        callback_url("https://app.example", Some("/auth/callback")).unwrap(),
        "https://app.example/auth/callback"
    );
    assert!(matches!(callback_url("nope", None), Err(AuthError::InvalidUrl(_))));
}

#[test]
fn test_sign_in_keeps_verifier_matching_challenge() {
    let provider = Arc::new(RecordingProvider::default());
    let mut ctx = SessionContext::new(Some(provider.clone() as Arc<dyn AuthProvider>), "https://app.example");
    assert!(ctx.is_configured());

    let url = ctx.sign_in_url(Some("/bookmarks")).unwrap();
    assert!(url.starts_with("https://auth.test/authorize?redirect_to="));

    let verifier = ctx.take_pending_verifier().unwrap();
    assert_eq!(verifier.len(), 43);
    let challenges = provider.challenges.lock().unwrap();
    assert_eq!(*challenges, vec![pkce_challenge(&verifier)]);

    // the verifier is single-use
    assert!(matches!(ctx.take_pending_verifier(), Err(AuthError::NoPendingSignIn)));
}

#[test]
fn test_each_sign_in_uses_fresh_pkce() {
    let provider = Arc::new(RecordingProvider::default());
    let mut ctx = SessionContext::new(Some(provider.clone() as Arc<dyn AuthProvider>), "https://app.example");
    ctx.sign_in_url(None).unwrap();
    ctx.sign_in_url(None).unwrap();

    let challenges = provider.challenges.lock().unwrap();
    assert_eq!(challenges.len(), 2);
    assert_ne!(challenges[0], challenges[1]);
}

#[test]
fn test_subscribers_see_user_changes() {
    let mut ctx = SessionContext::new(None, "https://app.example");
    let mut rx = ctx.subscribe();
    assert!(ctx.current_user().is_none());

    ctx.install(session("alice", Duration::hours(1)));
    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().id, "alice");
    assert_eq!(ctx.current_user().unwrap().id, "alice");

    ctx.install(session("bob", Duration::hours(1)));
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().id, "bob");

    let previous = ctx.clear().unwrap();
    assert_eq!(previous.user.id, "bob");
    assert!(rx.borrow_and_update().is_none());
    assert!(ctx.session().is_none());
    assert!(ctx.clear().is_none());
}

#[test]
fn test_expired_session_offers_refresh_token() {
    let mut ctx = SessionContext::new(None, "https://app.example");
    assert_eq!(ctx.refresh_token_if_expired(Utc::now()), None);

    ctx.install(session("alice", Duration::seconds(-1)));
    assert_eq!(ctx.refresh_token_if_expired(Utc::now()).as_deref(), Some("refresh"));
}

#[test]
fn test_session_serialization_hides_tokens() {
    let json = serde_json::to_value(session("alice", Duration::hours(1))).unwrap();
    assert_eq!(json["user"]["id"], "alice");
    assert!(json.get("access_token").is_none());
    assert!(json.get("refresh_token").is_none());
}

#[test]
fn test_http_provider_builds_authorize_url() {
    let settings = AuthSettings {
        provider_url: Some("https://project.auth.example/".to_string()),
        anon_key: Some("anon".to_string()),
        ..Default::default()
    };
    let provider = HttpAuthProvider::from_settings(&settings).unwrap();
    let url = provider
        .authorize_url("https://app.example/auth/callback", "challenge123")
        .unwrap();

    let parsed = url::Url::parse(&url).unwrap();
    assert_eq!(parsed.path(), "/auth/v1/authorize");
    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    assert!(pairs.contains(&("provider".to_string(), "google".to_string())));
    assert!(pairs.contains(&("redirect_to".to_string(), "https://app.example/auth/callback".to_string())));
    assert!(pairs.contains(&("code_challenge".to_string(), "challenge123".to_string())));
    assert!(pairs.contains(&("code_challenge_method".to_string(), "s256".to_string())));
}

#[test]
fn test_http_provider_requires_url() {
    assert!(matches!(
        HttpAuthProvider::from_settings(&AuthSettings::default()),
        Err(AuthError::NotConfigured)
    ));
    let bad = AuthSettings {
        provider_url: Some("::not a url".to_string()),
        ..Default::default()
    };
    assert!(matches!(HttpAuthProvider::from_settings(&bad), Err(AuthError::InvalidUrl(_))));
}
