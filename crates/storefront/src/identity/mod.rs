//! Identity provider client.
//!
//! Login follows an authorization-code flow:
//!
//! 1. Redirect the visitor to [`IdentityClient::authorization_url`]
//! 2. The provider authenticates them and redirects back with a code
//! 3. [`IdentityClient::exchange_code`] trades the code for a principal and a
//!    delegation credential
//! 4. The delegation is attached to every backend call made for that visitor
//!
//! Identities are stored in the session and cleared on logout.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use atelier_core::{Principal, PrincipalError};

use crate::config::IdentityConfig;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token exchange was refused.
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// Provider returned an unusable principal.
    #[error("Invalid principal from identity provider: {0}")]
    Principal(#[from] PrincipalError),

    /// Provider returned an anonymous principal.
    #[error("Identity provider returned the anonymous principal")]
    Anonymous,
}

/// An authenticated identity: a principal plus the delegation that proves it.
#[derive(Clone)]
pub struct Identity {
    principal: Principal,
    delegation: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Construct an identity.
    #[must_use]
    pub const fn new(
        principal: Principal,
        delegation: SecretString,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            principal,
            delegation,
            expires_at,
        }
    }

    /// The authenticated principal.
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Delegation credential sent to the backend.
    #[must_use]
    pub const fn delegation(&self) -> &SecretString {
        &self.delegation
    }

    /// When the delegation stops being valid, if bounded.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the delegation has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &self.principal)
            .field("delegation", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    principal: String,
    delegation: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Client for the identity provider.
#[derive(Clone)]
pub struct IdentityClient {
    inner: Arc<IdentityClientInner>,
}

struct IdentityClientInner {
    client: reqwest::Client,
    provider_url: String,
    client_id: String,
    client_secret: SecretString,
}

impl IdentityClient {
    /// Create a new identity provider client.
    #[must_use]
    pub fn new(config: &IdentityConfig) -> Self {
        Self {
            inner: Arc::new(IdentityClientInner {
                client: reqwest::Client::new(),
                provider_url: config.provider_url.clone(),
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            }),
        }
    }

    /// URL that starts the login flow.
    ///
    /// # Arguments
    ///
    /// * `redirect_uri` - Callback URL on this storefront
    /// * `state` - Random value stored in the session to prevent CSRF
    #[must_use]
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&state={}",
            self.inner.provider_url,
            urlencoding::encode(&self.inner.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider refuses the code or returns an
    /// invalid or anonymous principal.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<Identity, IdentityError> {
        let url = format!("{}/token", self.inner.provider_url);

        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self.inner.client.post(&url).form(&params).send().await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IdentityError::Exchange(text.chars().take(200).collect()));
        }

        let token: TokenResponse = response.json().await?;
        identity_from_token(token, Utc::now())
    }
}

fn identity_from_token(token: TokenResponse, now: DateTime<Utc>) -> Result<Identity, IdentityError> {
    let principal = Principal::parse(&token.principal)?;
    if principal.is_anonymous() {
        return Err(IdentityError::Anonymous);
    }

    let expires_at = token
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| now + Duration::seconds(secs));

    Ok(Identity::new(
        principal,
        SecretString::from(token.delegation),
        expires_at,
    ))
}
