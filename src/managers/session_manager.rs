//! Session context for Smart Bookmark.
//!
//! Holds the current provider session and publishes the signed-in user on a
//! `watch` channel so that everything scoped by user id can reload when it
//! changes. Sign-in uses OAuth with PKCE: the verifier generated for the
//! authorize redirect is kept here until the callback exchanges its code.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;
use zeroize::Zeroizing;

use crate::services::auth_provider::AuthProvider;
use crate::services::crypto_service::{CryptoService, CryptoServiceTrait};
use crate::types::errors::AuthError;
use crate::types::session::{Session, User};

/// Path the provider redirects back to after sign-in.
pub const AUTH_CALLBACK_PATH: &str = "/auth/callback";

/// Validates a post-sign-in target, falling back to `/`.
///
/// Only same-origin absolute paths are accepted: the target must start with a
/// single `/`, must not carry control characters or a backslash right after
/// the leading slash, must resolve to the same origin, and must not point back
/// at the callback itself.
pub fn safe_return_to(return_to: Option<&str>) -> String {
    match return_to {
        Some(target) if is_same_origin_path(target) => target.to_string(),
        _ => "/".to_string(),
    }
}

fn is_same_origin_path(target: &str) -> bool {
    if !target.starts_with('/')
        || target.starts_with("//")
        || target.starts_with("/\\")
        || target.chars().any(char::is_control)
        || target.starts_with(AUTH_CALLBACK_PATH)
    {
        return false;
    }
    // browsers read `\` as `/`; resolving catches any other way off-site
    let base = match Url::parse("http://app.invalid/") {
        Ok(base) => base,
        Err(_) => return false,
    };
    match base.join(target) {
        Ok(resolved) => resolved.origin() == base.origin(),
        Err(_) => false,
    }
}

/// Builds the callback URL on `app_origin`, carrying `returnTo` when it is
/// given and is not the callback path.
pub fn callback_url(app_origin: &str, return_to: Option<&str>) -> Result<String, AuthError> {
    let origin = Url::parse(app_origin).map_err(|e| AuthError::InvalidUrl(format!("{}: {}", app_origin, e)))?;
    let mut url = origin
        .join(AUTH_CALLBACK_PATH)
        .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
    if let Some(target) = return_to {
        if !target.is_empty() && target != AUTH_CALLBACK_PATH {
            url.query_pairs_mut().append_pair("returnTo", target);
        }
    }
    Ok(url.into())
}

/// The process-wide session state.
pub struct SessionContext {
    provider: Option<Arc<dyn AuthProvider>>,
    crypto: CryptoService,
    app_origin: String,
    session: Option<Session>,
    pending_verifier: Option<Zeroizing<String>>,
    user_tx: watch::Sender<Option<User>>,
}

impl SessionContext {
    /// `provider` is `None` when sign-in is not configured.
    pub fn new(provider: Option<Arc<dyn AuthProvider>>, app_origin: &str) -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            provider,
            crypto: CryptoService::new(),
            app_origin: app_origin.to_string(),
            session: None,
            pending_verifier: None,
            user_tx,
        }
    }

    /// Receives the signed-in user (or `None`) whenever it changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user_tx.subscribe()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn provider(&self) -> Option<Arc<dyn AuthProvider>> {
        self.provider.clone()
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Starts a sign-in: generates a PKCE pair and returns the authorize URL.
    pub fn sign_in_url(&mut self, return_to: Option<&str>) -> Result<String, AuthError> {
        let provider = self.provider.as_ref().ok_or(AuthError::NotConfigured)?;
        let redirect_to = callback_url(&self.app_origin, return_to)?;
        let pkce = self.crypto.generate_pkce_pair()?;
        let url = provider.authorize_url(&redirect_to, &pkce.challenge)?;
        self.pending_verifier = Some(pkce.verifier);
        debug!("sign-in started");
        Ok(url)
    }

    /// Takes the verifier of the sign-in in progress.
    pub fn take_pending_verifier(&mut self) -> Result<Zeroizing<String>, AuthError> {
        self.pending_verifier.take().ok_or(AuthError::NoPendingSignIn)
    }

    /// Installs a new session and notifies subscribers if the user changed.
    pub fn install(&mut self, session: Session) {
        let user = session.user.clone();
        info!(user_id = %user.id, "session installed");
        self.session = Some(session);
        self.publish(Some(user));
    }

    /// Drops the session. Returns it so the caller can revoke it upstream.
    pub fn clear(&mut self) -> Option<Session> {
        let previous = self.session.take();
        if let Some(s) = &previous {
            info!(user_id = %s.user.id, "session cleared");
        }
        self.publish(None);
        previous
    }

    /// Refresh token of the current session if it has expired at `now`.
    pub fn refresh_token_if_expired(&self, now: DateTime<Utc>) -> Option<String> {
        self.session
            .as_ref()
            .filter(|s| s.is_expired(now))
            .map(|s| s.refresh_token.clone())
    }

    fn publish(&self, user: Option<User>) {
        self.user_tx.send_if_modified(|current| {
            if *current == user {
                return false;
            }
            *current = user;
            true
        });
    }
}
