//! Authentication extractors.
//!
//! Pages never redirect on missing identity; they render through the access
//! gate instead. Form posts that mutate state require an identity and send
//! guests to the login flow.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::identity::Identity;
use crate::models::{CurrentIdentity, session_keys};

/// Extractor that requires a logged-in identity.
///
/// # Example
///
/// ```rust,ignore
/// async fn save_profile(RequireIdentity(identity): RequireIdentity) -> impl IntoResponse {
///     format!("Saving profile for {}", identity.principal())
/// }
/// ```
pub struct RequireIdentity(pub Identity);

/// Error returned when an identity is required but missing.
pub enum AuthRejection {
    /// Send the visitor through login.
    RedirectToLogin,
    /// No session layer is installed.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Load the identity stored in the session, dropping it once expired.
async fn load_identity(session: &Session) -> Option<Identity> {
    let current: CurrentIdentity = session
        .get(session_keys::CURRENT_IDENTITY)
        .await
        .ok()
        .flatten()?;

    let identity = Identity::from(current);
    if identity.is_expired(Utc::now()) {
        tracing::debug!(principal = %identity.principal(), "Session identity expired");
        let _ = clear_current_identity(session).await;
        return None;
    }

    Some(identity)
}

impl<S> FromRequestParts<S> for RequireIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        load_identity(session)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Extractor that optionally gets the logged-in identity.
///
/// Unlike `RequireIdentity`, this never rejects the request.
pub struct OptionalIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Session>() {
            Some(session) => load_identity(session).await,
            None => None,
        };

        Ok(Self(identity))
    }
}

/// Store the logged-in identity in the session.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_identity(
    session: &Session,
    identity: &Identity,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::CURRENT_IDENTITY, CurrentIdentity::from(identity))
        .await
}

/// Remove the identity from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_identity(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentIdentity>(session_keys::CURRENT_IDENTITY)
        .await?;
    Ok(())
}
