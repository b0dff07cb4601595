//! Brand stylesheet.
//!
//! The primary color is served as a stylesheet so pages need no inline
//! styles under the `style-src 'self'` policy.

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use atelier_core::BrandConfig;

use crate::routes::admin::is_hex_color;
use crate::routes::page::degrade;
use crate::state::AppState;

/// CSS custom properties for `config`. Empty when no valid color is set.
#[must_use]
pub fn brand_css(config: &BrandConfig) -> String {
    let color = config.primary_color.trim();
    if is_hex_color(color) {
        format!(":root {{ --color-primary: {color}; }}\n")
    } else {
        String::new()
    }
}

/// Serve the brand stylesheet.
///
/// # Route
///
/// `GET /brand.css`
pub async fn stylesheet(State(state): State<AppState>) -> Response {
    let ctx = state.query_context(None);
    let config = degrade(ctx.brand_config().await, "brand config")
        .ready()
        .unwrap_or_default();

    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        brand_css(&config),
    )
        .into_response()
}
