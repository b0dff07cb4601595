//! Checkout return pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;

use atelier_core::StripeSessionStatus;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalIdentity;
use crate::queries::Remote;
use crate::routes::page::{Page, PageFrame};
use crate::state::AppState;

/// Success page query parameters.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

/// Payment success page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/success.html")]
pub struct PaymentSuccessTemplate {
    pub frame: PageFrame,
    /// Failure reported by Stripe for the returned session.
    pub failure: Option<String>,
}

/// Payment failure page template.
#[derive(Template, WebTemplate)]
#[template(path = "payment/failure.html")]
pub struct PaymentFailureTemplate {
    pub frame: PageFrame,
}

/// Stripe's success redirect.
///
/// With a `session_id`, the session status is looked up; an unknown or
/// unreachable status still shows the success message.
///
/// # Route
///
/// `GET /payment-success?session_id=<id>`
pub async fn success(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Query(query): Query<SuccessQuery>,
) -> Result<impl IntoResponse> {
    let page = Page::load(&state, identity, "/payment-success").await?;

    let session_id = query.session_id.filter(|id| !id.trim().is_empty());
    let failure = match session_id {
        Some(session_id) => match page.ctx.stripe_session_status(&session_id).await {
            Ok(Remote::Ready(StripeSessionStatus::Failed { error })) => Some(error),
            Ok(Remote::Ready(StripeSessionStatus::Completed { .. }) | Remote::Pending) => None,
            Err(e) => {
                warn!(error = %e, "Failed to look up checkout session status");
                None
            }
        },
        None => None,
    };

    Ok(PaymentSuccessTemplate {
        frame: page.frame,
        failure,
    })
}

/// Stripe's cancel redirect.
///
/// # Route
///
/// `GET /payment-failure`
pub async fn failure(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<impl IntoResponse> {
    let page = Page::load(&state, identity, "/payment-failure").await?;
    Ok(PaymentFailureTemplate { frame: page.frame })
}
