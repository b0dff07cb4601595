//! Identity provider login flow.
//!
//! - Login: stores a CSRF state and the return path, then redirects to the
//!   provider's authorization page
//! - Callback: checks the state, exchanges the code for an identity and
//!   stores it in the session
//! - Logout: drops the identity, the caller's cached queries and the Sentry user

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalIdentity, clear_current_identity, set_current_identity};
use crate::models::session_keys;
use crate::routes::page::{DEFAULT_PLATFORM_NAME, PageFrame, safe_return_path};
use crate::state::AppState;

/// Login query parameters.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub return_to: Option<String>,
}

/// Query parameters from the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for an identity.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

/// Login failure page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/error.html")]
pub struct AuthErrorTemplate {
    pub frame: PageFrame,
    pub message: &'static str,
}

/// Login failure page. Rendered without backend queries.
fn auth_error(status: StatusCode, message: &'static str) -> Response {
    let frame = PageFrame {
        platform_name: DEFAULT_PLATFORM_NAME.to_string(),
        logo_url: None,
        principal: None,
        show_admin_link: false,
        profile_setup: None,
        path: "/".to_string(),
    };
    (status, AuthErrorTemplate { frame, message }).into_response()
}

/// Generate a cryptographically secure random string.
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

fn callback_uri(state: &AppState) -> String {
    state.config().absolute_url("/auth/callback")
}

/// Start login.
///
/// # Route
///
/// `GET /auth/login?return_to=<path>`
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Response {
    let oauth_state = generate_random_string(32);
    let return_to = safe_return_path(query.return_to.as_deref()).to_string();

    if let Err(e) = session.insert(session_keys::OAUTH_STATE, &oauth_state).await {
        tracing::error!("Failed to store OAuth state in session: {}", e);
        return auth_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not start login.");
    }
    if let Err(e) = session.insert(session_keys::RETURN_TO, &return_to).await {
        tracing::error!("Failed to store return path in session: {}", e);
        return auth_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not start login.");
    }

    let auth_url = state
        .identity()
        .authorization_url(&callback_uri(&state), &oauth_state);

    Redirect::to(&auth_url).into_response()
}

/// Handle the provider callback.
///
/// # Route
///
/// `GET /auth/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error {
        let description = query.error_description.unwrap_or_default();
        tracing::warn!("Identity provider error: {} - {}", error, description);
        return auth_error(StatusCode::BAD_REQUEST, "Login was cancelled or refused.");
    }

    let Some(code) = query.code else {
        tracing::warn!("Login callback missing code");
        return auth_error(StatusCode::BAD_REQUEST, "Login response was incomplete.");
    };

    let Some(returned_state) = query.state else {
        tracing::warn!("Login callback missing state");
        return auth_error(StatusCode::BAD_REQUEST, "Login response was incomplete.");
    };

    let stored_state: Option<String> = session
        .remove(session_keys::OAUTH_STATE)
        .await
        .ok()
        .flatten();

    if stored_state.as_ref() != Some(&returned_state) {
        tracing::warn!("Login state mismatch");
        return auth_error(StatusCode::BAD_REQUEST, "Login session expired. Please try again.");
    }

    let return_to: String = session
        .remove(session_keys::RETURN_TO)
        .await
        .ok()
        .flatten()
        .unwrap_or_else(|| "/".to_string());

    let identity = match state
        .identity()
        .exchange_code(&code, &callback_uri(&state))
        .await
    {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!("Failed to exchange login code: {}", e);
            return auth_error(StatusCode::BAD_GATEWAY, "Could not complete login.");
        }
    };

    if let Err(e) = set_current_identity(&session, &identity).await {
        tracing::error!("Failed to store identity in session: {}", e);
        return auth_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not complete login.");
    }

    set_sentry_user(identity.principal());
    tracing::info!(principal = %identity.principal(), "Logged in");

    Redirect::to(safe_return_path(Some(&return_to))).into_response()
}

/// Log out.
///
/// # Route
///
/// `POST /auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalIdentity(identity): OptionalIdentity,
) -> Response {
    if let Some(identity) = identity {
        state.queries().clear_caller(identity.principal());
        tracing::info!(principal = %identity.principal(), "Logged out");
    }

    if let Err(e) = clear_current_identity(&session).await {
        tracing::error!("Failed to clear session identity: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_state_is_alphanumeric() {
        let value = generate_random_string(32);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(value, generate_random_string(32));
    }
}
