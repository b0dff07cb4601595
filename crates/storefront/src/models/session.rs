//! Session-related types.
//!
//! Types stored in the session for authentication state.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use atelier_core::Principal;

use crate::identity::Identity;

/// Session-stored identity.
///
/// The delegation lives only in the server-side session store; the browser
/// holds the session cookie.
#[derive(Clone, Serialize, Deserialize)]
pub struct CurrentIdentity {
    /// Authenticated principal.
    pub principal: Principal,
    /// Delegation credential forwarded to the backend.
    pub delegation: String,
    /// Delegation expiry, if bounded.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for CurrentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentIdentity")
            .field("principal", &self.principal)
            .field("delegation", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl From<&Identity> for CurrentIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            principal: identity.principal().clone(),
            delegation: identity.delegation().expose_secret().to_owned(),
            expires_at: identity.expires_at(),
        }
    }
}

impl From<CurrentIdentity> for Identity {
    fn from(current: CurrentIdentity) -> Self {
        Self::new(
            current.principal,
            SecretString::from(current.delegation),
            current.expires_at,
        )
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the logged-in identity.
    pub const CURRENT_IDENTITY: &str = "current_identity";

    /// Key for the login state parameter (CSRF protection).
    pub const OAUTH_STATE: &str = "oauth_state";

    /// Key for the page to return to after login.
    pub const RETURN_TO: &str = "return_to";
}
