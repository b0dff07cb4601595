//! Settings, artist mode, Stripe setup and profile onboarding.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::info;

use atelier_core::{StripeConfiguration, UserProfile};

use crate::error::{AppError, Result};
use crate::filters;
use crate::gate::{self, PageGate};
use crate::middleware::{OptionalIdentity, RequireIdentity};
use crate::queries::{QueryContext, QueryError, Remote};
use crate::routes::page::{Page, PageFrame, ProfileSetup, safe_return_path};
use crate::state::AppState;

/// Stripe setup form state.
///
/// The secret key is never echoed back.
#[derive(Debug, Clone)]
pub struct StripeSetupView {
    pub configured: bool,
    /// Show the form even though Stripe is configured.
    pub editing: bool,
    pub allowed_countries: String,
    pub error: Option<String>,
    /// Where the form posts to.
    pub action: &'static str,
    /// Link that reveals the form when configured.
    pub edit_link: &'static str,
}

impl StripeSetupView {
    #[must_use]
    pub fn new(configured: bool, action: &'static str, edit_link: &'static str) -> Self {
        Self {
            configured,
            editing: false,
            allowed_countries: StripeConfiguration::DEFAULT_COUNTRIES.to_string(),
            error: None,
            action,
            edit_link,
        }
    }

    /// Whether the form is shown.
    #[must_use]
    pub const fn show_form(&self) -> bool {
        !self.configured || self.editing
    }
}

/// Stripe setup form body.
#[derive(Debug, Deserialize)]
pub struct StripeForm {
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub allowed_countries: String,
}

impl StripeForm {
    /// Validate into a configuration.
    ///
    /// # Errors
    ///
    /// Returns a message for a blank key or an empty country list.
    pub fn validate(&self) -> std::result::Result<StripeConfiguration, &'static str> {
        if self.secret_key.trim().is_empty() {
            return Err("Stripe secret key is required");
        }
        let config = StripeConfiguration::from_form(&self.secret_key, &self.allowed_countries);
        if config.allowed_countries.is_empty() {
            return Err("Enter at least one country code");
        }
        Ok(config)
    }
}

/// Save the Stripe form for the caller, returning the re-render state on failure.
pub async fn save_stripe(
    ctx: &QueryContext,
    form: &StripeForm,
    mut view: StripeSetupView,
) -> std::result::Result<(), (StripeSetupView, StatusCode)> {
    view.editing = true;
    view.allowed_countries.clone_from(&form.allowed_countries);

    let config = match form.validate() {
        Ok(config) => config,
        Err(message) => {
            view.error = Some(message.to_string());
            return Err((view, StatusCode::UNPROCESSABLE_ENTITY));
        }
    };

    match ctx.set_stripe_configuration(&config).await {
        Ok(()) => {
            info!(countries = ?config.allowed_countries, "Stripe configured");
            Ok(())
        }
        Err(e) => {
            let err = AppError::Query(e);
            view.error = Some(format!("Failed to configure Stripe: {}", err.public_message()));
            Err((view, err.status()))
        }
    }
}

/// Settings page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/settings.html")]
pub struct SettingsTemplate {
    pub frame: PageFrame,
    pub principal: String,
    pub profile_name: Option<String>,
    pub is_artist: bool,
    pub artist_error: Option<String>,
    pub stripe: StripeSetupView,
}

/// Profile setup page, shown when the inline form is rejected.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub frame: PageFrame,
    pub setup: ProfileSetup,
    pub return_to: String,
}

/// Settings query parameters.
#[derive(Debug, Deserialize)]
pub struct SettingsQuery {
    /// `edit` reveals the Stripe form when already configured.
    pub stripe: Option<String>,
}

/// Artist toggle form body.
#[derive(Debug, Deserialize)]
pub struct ArtistForm {
    pub enabled: bool,
}

/// Profile setup form body.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: String,
    pub return_to: Option<String>,
}

/// Settings page state for the caller.
struct Settings {
    is_artist: bool,
    stripe_configured: bool,
}

async fn load_settings(page: &Page) -> Result<Remote<Settings>> {
    let (artist, stripe) = tokio::join!(page.ctx.is_artist(), page.ctx.is_stripe_configured());
    Ok(match (artist?, stripe?) {
        (Remote::Ready(is_artist), Remote::Ready(stripe_configured)) => Remote::Ready(Settings {
            is_artist,
            stripe_configured,
        }),
        _ => Remote::Pending,
    })
}

fn render_settings(
    page: Page,
    is_artist: bool,
    artist_error: Option<String>,
    stripe: StripeSetupView,
    status: StatusCode,
) -> Response {
    let principal = page.frame.principal.clone().unwrap_or_default();
    let profile_name = page.profile.profile().map(|p| p.name.clone());
    (
        status,
        SettingsTemplate {
            frame: page.frame,
            principal,
            profile_name,
            is_artist,
            artist_error,
            stripe,
        },
    )
        .into_response()
}

/// Load the page and settings, or the gate response to send instead.
async fn settings_page(
    state: &AppState,
    identity: Option<crate::identity::Identity>,
) -> Result<std::result::Result<(Page, Settings), Response>> {
    let page = Page::load(state, identity, "/settings").await?;
    if let PageGate::Denied = gate::require_identity(page.identity.as_ref()) {
        return Ok(Err(page.denied()));
    }
    Ok(match load_settings(&page).await? {
        Remote::Pending => Err(page.loading()),
        Remote::Ready(settings) => Ok((page, settings)),
    })
}

/// Display account settings.
///
/// # Route
///
/// `GET /settings?stripe=edit`
pub async fn settings(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Query(query): Query<SettingsQuery>,
) -> Result<Response> {
    let (page, settings) = match settings_page(&state, identity).await? {
        Ok(loaded) => loaded,
        Err(response) => return Ok(response),
    };

    let mut stripe = StripeSetupView::new(
        settings.stripe_configured,
        "/settings/stripe",
        "/settings?stripe=edit",
    );
    stripe.editing = query.stripe.as_deref() == Some("edit");

    Ok(render_settings(
        page,
        settings.is_artist,
        None,
        stripe,
        StatusCode::OK,
    ))
}

/// Toggle artist mode for the caller.
///
/// # Route
///
/// `POST /settings/artist`
pub async fn update_artist(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<ArtistForm>,
) -> Result<Response> {
    let (page, settings) = match settings_page(&state, Some(identity)).await? {
        Ok(loaded) => loaded,
        Err(response) => return Ok(response),
    };

    match page.ctx.update_artist_status(form.enabled).await {
        Ok(()) => {
            info!(enabled = form.enabled, "Artist status updated");
            Ok(Redirect::to("/settings").into_response())
        }
        Err(e) => {
            let err = AppError::Query(e);
            let status = err.status();
            let stripe = StripeSetupView::new(
                settings.stripe_configured,
                "/settings/stripe",
                "/settings?stripe=edit",
            );
            Ok(render_settings(
                page,
                settings.is_artist,
                Some(format!("Failed to update artist status: {}", err.public_message())),
                stripe,
                status,
            ))
        }
    }
}

/// Configure Stripe for the caller.
///
/// # Route
///
/// `POST /settings/stripe`
pub async fn update_stripe(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<StripeForm>,
) -> Result<Response> {
    let (page, settings) = match settings_page(&state, Some(identity)).await? {
        Ok(loaded) => loaded,
        Err(response) => return Ok(response),
    };

    let view = StripeSetupView::new(
        settings.stripe_configured,
        "/settings/stripe",
        "/settings?stripe=edit",
    );
    match save_stripe(&page.ctx, &form, view).await {
        Ok(()) => Ok(Redirect::to("/settings").into_response()),
        Err((view, status)) => Ok(render_settings(page, settings.is_artist, None, view, status)),
    }
}

/// Save the caller's profile from the onboarding form.
///
/// # Route
///
/// `POST /profile`
pub async fn save_profile(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    let return_to = safe_return_path(form.return_to.as_deref()).to_string();
    let name = form.name.trim();

    let ctx = state.query_context(Some(identity.clone()));
    let error = if name.is_empty() {
        Some("Please enter your name".to_string())
    } else {
        match ctx
            .save_profile(&UserProfile {
                name: name.to_string(),
            })
            .await
        {
            Ok(()) => {
                info!("Profile saved");
                return Ok(Redirect::to(&return_to).into_response());
            }
            Err(QueryError::InFlight(_)) => return Ok(Redirect::to(&return_to).into_response()),
            Err(e) => Some(format!("Failed to save profile: {}", AppError::Query(e).public_message())),
        }
    };

    let mut page = Page::load(&state, Some(identity), &return_to).await?;
    // The standalone page carries the form itself.
    page.frame.profile_setup = None;
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        ProfileTemplate {
            frame: page.frame,
            setup: ProfileSetup {
                name: form.name,
                error,
            },
            return_to,
        },
    )
        .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::backend::Caller;
    use crate::testing::{ScriptedTransport, alice, queries_with};

    fn form(key: &str, countries: &str) -> StripeForm {
        StripeForm {
            secret_key: key.to_string(),
            allowed_countries: countries.to_string(),
        }
    }

    #[test]
    fn test_stripe_form_validation() {
        assert_eq!(
            form(" ", "US").validate().unwrap_err(),
            "Stripe secret key is required"
        );
        assert_eq!(
            form("sk_test_123", " , ").validate().unwrap_err(),
            "Enter at least one country code"
        );
        let config = form("sk_test_123", "us, ca,,gb").validate().unwrap();
        assert_eq!(config.allowed_countries, vec!["US", "CA", "GB"]);
    }

    #[test]
    fn test_stripe_view_shows_form_until_configured() {
        let view = StripeSetupView::new(false, "/settings/stripe", "/settings?stripe=edit");
        assert!(view.show_form());
        assert_eq!(view.allowed_countries, "US,CA,GB");

        let mut view = StripeSetupView::new(true, "/settings/stripe", "/settings?stripe=edit");
        assert!(!view.show_form());
        view.editing = true;
        assert!(view.show_form());
    }

    #[tokio::test]
    async fn test_save_stripe_failure_keeps_countries_but_not_key() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("setStripeConfiguration", "invalid key");
        let queries = queries_with(transport.clone());
        let ctx = queries.context(Caller::Authenticated(alice()));

        let view = StripeSetupView::new(false, "/settings/stripe", "/settings?stripe=edit");
        let (view, status) = save_stripe(&ctx, &form("sk_test_123", "US,FR"), view)
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(view.allowed_countries, "US,FR");
        assert!(view.error.unwrap().starts_with("Failed to configure Stripe"));

        let args = transport.args_of("setStripeConfiguration");
        assert_eq!(
            args.first().unwrap().first().unwrap(),
            &json!({"secretKey": "sk_test_123", "allowedCountries": ["US", "FR"]})
        );
    }
}
