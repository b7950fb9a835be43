//! Client for the hosted identity provider.
//!
//! Speaks the provider's token API: OAuth authorize with PKCE, code exchange,
//! refresh and logout. Every request carries the project's anon key in the
//! `apikey` header.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::types::errors::AuthError;
use crate::types::session::{Session, TokenResponse};
use crate::types::settings::AuthSettings;

/// Trait defining the identity provider operations the app relies on.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// URL to send the browser to in order to start OAuth sign-in.
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, AuthError>;

    /// Exchanges an authorization code (plus the PKCE verifier) for a session.
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError>;

    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError>;

    /// Revokes the session on the provider side.
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}

/// Provider client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpAuthProvider {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    oauth_provider: String,
}

impl HttpAuthProvider {
    /// Builds a client from settings. Fails with `NotConfigured` when no provider URL is set.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, AuthError> {
        let base = settings.provider_url.as_deref().ok_or(AuthError::NotConfigured)?;
        let parsed = Url::parse(base).map_err(|e| AuthError::InvalidUrl(format!("{}: {}", base, e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone().unwrap_or_default(),
            oauth_provider: settings.oauth_provider.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(grant_type, %status, "token grant rejected");
            return Err(AuthError::ExchangeFailed(format!("{}: {}", status, detail)));
        }

        let tokens: TokenResponse = response.json().await?;
        debug!(grant_type, user_id = %tokens.user.id, "token grant succeeded");
        Ok(tokens.into_session(Utc::now()))
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    fn authorize_url(&self, redirect_to: &str, code_challenge: &str) -> Result<String, AuthError> {
        let url = Url::parse_with_params(
            &self.endpoint("authorize"),
            &[
                ("provider", self.oauth_provider.as_str()),
                ("redirect_to", redirect_to),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        Ok(url.into())
    }

    #[instrument(skip_all)]
    async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<Session, AuthError> {
        self.token_grant("pkce", json!({ "auth_code": code, "code_verifier": code_verifier }))
            .await
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ExchangeFailed(format!("logout returned {}", status)));
        }
        Ok(())
    }
}
