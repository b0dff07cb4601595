//! Admin dashboard: payments, branding, fees and roles.

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

use atelier_core::{BrandConfig, Principal, UserRole};

use crate::error::{AppError, Result};
use crate::filters;
use crate::gate::{self, PageGate};
use crate::middleware::{OptionalIdentity, RequireIdentity};
use crate::queries::{QueryContext, QueryError, Remote};
use crate::routes::account::{StripeForm, StripeSetupView, save_stripe};
use crate::routes::page::{DEFAULT_PLATFORM_NAME, Page, PageFrame};
use crate::state::AppState;

/// Branding form state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BrandingForm {
    pub platform_name: String,
    pub logo_url: String,
    pub primary_color: String,
}

impl BrandingForm {
    fn from_config(config: &BrandConfig) -> Self {
        Self {
            platform_name: config.platform_name.clone(),
            logo_url: config.logo_url.clone(),
            primary_color: config.primary_color.clone(),
        }
    }

    /// Validate against the current config, keeping its fee.
    fn validate(&self, current: &BrandConfig) -> std::result::Result<BrandConfig, &'static str> {
        let logo_url = self.logo_url.trim();
        if !logo_url.is_empty() && !logo_url.starts_with("https://") {
            return Err("Logo URL must start with https://");
        }
        let primary_color = self.primary_color.trim();
        if !primary_color.is_empty() && !is_hex_color(primary_color) {
            return Err("Primary color must look like #1a2b3c");
        }
        Ok(current.with_branding(
            self.platform_name.trim().to_string(),
            logo_url.to_string(),
            primary_color.to_string(),
        ))
    }
}

/// `#rrggbb`.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Fee form body.
#[derive(Debug, Deserialize)]
pub struct FeeForm {
    #[serde(default)]
    pub fee_percentage: String,
}

/// Role assignment form body.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    #[serde(default)]
    pub principal: String,
    #[serde(default)]
    pub role: String,
}

/// Inline messages per admin section.
#[derive(Debug, Clone, Default)]
pub struct AdminMessages {
    pub branding: Option<String>,
    pub fees: Option<String>,
    pub roles: Option<String>,
    pub roles_saved: Option<String>,
}

/// Admin page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub frame: PageFrame,
    pub stripe: StripeSetupView,
    pub branding: BrandingForm,
    pub fee_percentage: String,
    pub creator_share: u8,
    pub messages: AdminMessages,
    pub default_platform_name: &'static str,
}

/// Admin page state.
struct Dashboard {
    page: Page,
    stripe_configured: bool,
}

impl Dashboard {
    fn stripe_view(&self) -> StripeSetupView {
        StripeSetupView::new(self.stripe_configured, "/admin/stripe", "/admin?stripe=edit")
    }

    fn render(
        self,
        stripe: StripeSetupView,
        branding: BrandingForm,
        fee_percentage: String,
        messages: AdminMessages,
        status: StatusCode,
    ) -> Response {
        let creator_share = self.page.brand.creator_share();
        (
            status,
            AdminTemplate {
                frame: self.page.frame,
                stripe,
                branding,
                fee_percentage,
                creator_share,
                messages,
                default_platform_name: DEFAULT_PLATFORM_NAME,
            },
        )
            .into_response()
    }

    /// Render with forms filled from the current configuration.
    fn render_current(self, messages: AdminMessages, status: StatusCode) -> Response {
        let stripe = self.stripe_view();
        let branding = BrandingForm::from_config(&self.page.brand);
        let fee = self.page.brand.fee_percentage.to_string();
        self.render(stripe, branding, fee, messages, status)
    }
}

/// Load the dashboard, or the gate response to send instead.
async fn dashboard(
    state: &AppState,
    identity: Option<crate::identity::Identity>,
) -> Result<std::result::Result<Dashboard, Response>> {
    let page = Page::load(state, identity, "/admin").await?;
    match gate::require_admin(&page.viewer) {
        PageGate::Loading => return Ok(Err(page.loading())),
        PageGate::Denied | PageGate::NotFound => return Ok(Err(page.denied())),
        PageGate::Content(_) => {}
    }

    Ok(match page.ctx.is_stripe_configured().await? {
        Remote::Pending => Err(page.loading()),
        Remote::Ready(stripe_configured) => Ok(Dashboard {
            page,
            stripe_configured,
        }),
    })
}

/// Admin query parameters.
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    /// `edit` reveals the Stripe form when already configured.
    pub stripe: Option<String>,
}

/// Display the admin dashboard.
///
/// # Route
///
/// `GET /admin`
pub async fn index(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Query(query): Query<AdminQuery>,
) -> Result<Response> {
    let dashboard = match dashboard(&state, identity).await? {
        Ok(dashboard) => dashboard,
        Err(response) => return Ok(response),
    };

    let mut stripe = dashboard.stripe_view();
    stripe.editing = query.stripe.as_deref() == Some("edit");
    let branding = BrandingForm::from_config(&dashboard.page.brand);
    let fee = dashboard.page.brand.fee_percentage.to_string();
    Ok(dashboard.render(stripe, branding, fee, AdminMessages::default(), StatusCode::OK))
}

/// Configure platform Stripe settings.
///
/// # Route
///
/// `POST /admin/stripe`
pub async fn update_stripe(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<StripeForm>,
) -> Result<Response> {
    let dashboard = match dashboard(&state, Some(identity)).await? {
        Ok(dashboard) => dashboard,
        Err(response) => return Ok(response),
    };

    match save_stripe(&dashboard.page.ctx, &form, dashboard.stripe_view()).await {
        Ok(()) => Ok(Redirect::to("/admin").into_response()),
        Err((view, status)) => {
            let branding = BrandingForm::from_config(&dashboard.page.brand);
            let fee = dashboard.page.brand.fee_percentage.to_string();
            Ok(dashboard.render(view, branding, fee, AdminMessages::default(), status))
        }
    }
}

/// Save a brand config, mapping failures to an inline message.
async fn save_brand(
    ctx: &QueryContext,
    config: &BrandConfig,
) -> std::result::Result<(), (String, StatusCode)> {
    ctx.update_brand_config(config).await.map_err(|e| {
        let err = AppError::Query(e);
        (
            format!("Failed to save: {}", err.public_message()),
            err.status(),
        )
    })
}

/// Brand config as stored by the backend. Saves build on it, so a failed
/// read refuses the save instead of starting from defaults.
async fn stored_brand(
    ctx: &QueryContext,
) -> std::result::Result<BrandConfig, (String, StatusCode)> {
    match ctx.brand_config().await {
        Ok(Remote::Ready(config)) => Ok(config),
        Ok(Remote::Pending) => Err((
            "The marketplace is still connecting. Please try again shortly.".to_string(),
            StatusCode::SERVICE_UNAVAILABLE,
        )),
        Err(e) => {
            let err = AppError::Query(e);
            Err((
                format!("Failed to load current settings: {}", err.public_message()),
                err.status(),
            ))
        }
    }
}

/// Update platform name, logo and color. The fee is preserved.
///
/// # Route
///
/// `POST /admin/branding`
pub async fn update_branding(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<BrandingForm>,
) -> Result<Response> {
    let dashboard = match dashboard(&state, Some(identity)).await? {
        Ok(dashboard) => dashboard,
        Err(response) => return Ok(response),
    };

    let result = match stored_brand(&dashboard.page.ctx).await {
        Ok(current) => match form.validate(&current) {
            Ok(config) => save_brand(&dashboard.page.ctx, &config).await,
            Err(message) => Err((message.to_string(), StatusCode::UNPROCESSABLE_ENTITY)),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            info!("Branding updated");
            Ok(Redirect::to("/admin").into_response())
        }
        Err((message, status)) => {
            let stripe = dashboard.stripe_view();
            let fee = dashboard.page.brand.fee_percentage.to_string();
            let messages = AdminMessages {
                branding: Some(message),
                ..AdminMessages::default()
            };
            Ok(dashboard.render(stripe, form, fee, messages, status))
        }
    }
}

/// Update the platform fee. Branding is preserved.
///
/// # Route
///
/// `POST /admin/fees`
pub async fn update_fees(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<FeeForm>,
) -> Result<Response> {
    let dashboard = match dashboard(&state, Some(identity)).await? {
        Ok(dashboard) => dashboard,
        Err(response) => return Ok(response),
    };

    let result = match BrandConfig::parse_fee(&form.fee_percentage) {
        Ok(fee) => match stored_brand(&dashboard.page.ctx).await {
            Ok(current) => save_brand(&dashboard.page.ctx, &current.with_fee(fee)).await,
            Err(e) => Err(e),
        },
        Err(e) => Err((e.to_string(), StatusCode::UNPROCESSABLE_ENTITY)),
    };

    match result {
        Ok(()) => {
            info!(fee = %form.fee_percentage, "Platform fee updated");
            Ok(Redirect::to("/admin").into_response())
        }
        Err((message, status)) => {
            let stripe = dashboard.stripe_view();
            let branding = BrandingForm::from_config(&dashboard.page.brand);
            let messages = AdminMessages {
                fees: Some(message),
                ..AdminMessages::default()
            };
            Ok(dashboard.render(stripe, branding, form.fee_percentage, messages, status))
        }
    }
}

/// Assign a role to a principal.
///
/// # Route
///
/// `POST /admin/roles`
pub async fn assign_role(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Form(form): Form<RoleForm>,
) -> Result<Response> {
    let dashboard = match dashboard(&state, Some(identity)).await? {
        Ok(dashboard) => dashboard,
        Err(response) => return Ok(response),
    };

    let parsed = Principal::parse(form.principal.trim())
        .map_err(|e| e.to_string())
        .and_then(|principal| {
            form.role
                .parse::<UserRole>()
                .map(|role| (principal, role))
        });

    let (principal, role) = match parsed {
        Ok(parsed) => parsed,
        Err(message) => {
            let messages = AdminMessages {
                roles: Some(message),
                ..AdminMessages::default()
            };
            return Ok(dashboard.render_current(messages, StatusCode::UNPROCESSABLE_ENTITY));
        }
    };

    let (messages, status) = match dashboard.page.ctx.assign_role(&principal, role).await {
        Ok(()) => {
            info!(principal = %principal, role = %role, "Role assigned");
            let messages = AdminMessages {
                roles_saved: Some(format!("{principal} is now {role}")),
                ..AdminMessages::default()
            };
            (messages, StatusCode::OK)
        }
        Err(QueryError::InFlight(_)) => (AdminMessages::default(), StatusCode::OK),
        Err(e) => {
            let err = AppError::Query(e);
            let messages = AdminMessages {
                roles: Some(format!("Failed to assign role: {}", err.public_message())),
                ..AdminMessages::default()
            };
            (messages, err.status())
        }
    };

    Ok(dashboard.render_current(messages, status))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::backend::ActorProvider;
    use crate::testing::{ScriptedTransport, alice, test_config};

    fn current() -> BrandConfig {
        BrandConfig {
            platform_name: "Kiln".to_string(),
            logo_url: String::new(),
            primary_color: String::new(),
            fee_percentage: 12,
        }
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#1a2B3c"));
        assert!(!is_hex_color("1a2b3c"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("#1a2b3c; background: url(x)"));
    }

    #[test]
    fn test_branding_keeps_fee() {
        let form = BrandingForm {
            platform_name: " Atelier ".to_string(),
            logo_url: "https://cdn.example.org/logo.png".to_string(),
            primary_color: "#112233".to_string(),
        };
        let config = form.validate(&current()).unwrap();
        assert_eq!(config.platform_name, "Atelier");
        assert_eq!(config.fee_percentage, 12);
    }

    #[test]
    fn test_branding_rejects_unsafe_values() {
        let form = BrandingForm {
            logo_url: "javascript:alert(1)".to_string(),
            ..BrandingForm::default()
        };
        assert!(form.validate(&current()).is_err());

        let form = BrandingForm {
            primary_color: "red".to_string(),
            ..BrandingForm::default()
        };
        assert!(form.validate(&current()).is_err());
    }

    fn admin_with_unreadable_brand() -> (AppState, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("getBrandConfig", "canister busy");
        transport.reply("isCallerAdmin", json!(true));
        transport.reply("isStripeConfigured", json!(true));
        transport.reply("getCallerUserProfile", json!({"name": "Alice"}));
        transport.reply("updateBrandConfig", json!(null));
        let state =
            AppState::with_provider(test_config(), ActorProvider::connected(transport.clone()));
        (state, transport)
    }

    #[tokio::test]
    async fn test_fee_update_refused_when_brand_unreadable() {
        let (state, transport) = admin_with_unreadable_brand();

        let response = update_fees(
            State(state),
            RequireIdentity(alice()),
            Form(FeeForm {
                fee_percentage: "15".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(transport.count("updateBrandConfig"), 0);
    }

    #[tokio::test]
    async fn test_branding_update_refused_when_brand_unreadable() {
        let (state, transport) = admin_with_unreadable_brand();

        let response = update_branding(
            State(state),
            RequireIdentity(alice()),
            Form(BrandingForm {
                platform_name: "Kiln".to_string(),
                logo_url: String::new(),
                primary_color: "#aa3300".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(transport.count("updateBrandConfig"), 0);
    }
}
