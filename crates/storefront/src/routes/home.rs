//! Home and browse pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use atelier_core::Category;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalIdentity;
use crate::routes::page::{CategoryOption, ItemCard, Page, PageFrame, category_options, item_cards};
use crate::state::AppState;

/// Number of items featured on the home page.
const FEATURED_COUNT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub frame: PageFrame,
    pub cards: Vec<ItemCard>,
    pub pending: bool,
}

/// Browse page template.
#[derive(Template, WebTemplate)]
#[template(path = "browse.html")]
pub struct BrowseTemplate {
    pub frame: PageFrame,
    pub cards: Vec<ItemCard>,
    pub pending: bool,
    pub category_filters: Vec<CategoryOption>,
    pub all_selected: bool,
}

/// Browse query parameters.
#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    pub category: Option<String>,
}

/// Display the home page with featured works.
///
/// # Route
///
/// `GET /`
pub async fn home(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<impl IntoResponse> {
    let page = Page::load(&state, identity, "/").await?;
    let items = page.ctx.items().await?;

    let pending = items.is_pending();
    let featured: Vec<_> = items
        .unwrap_or_default()
        .iter()
        .take(FEATURED_COUNT)
        .cloned()
        .collect();
    let cards = item_cards(&page.ctx, &featured).await;

    Ok(HomeTemplate {
        frame: page.frame,
        cards,
        pending,
    })
}

/// Display every item, optionally filtered by category.
///
/// Unknown categories show everything.
///
/// # Route
///
/// `GET /browse?category=<category>`
pub async fn browse(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Query(query): Query<BrowseQuery>,
) -> Result<impl IntoResponse> {
    let category = query
        .category
        .as_deref()
        .and_then(|c| c.parse::<Category>().ok());

    let path = category.map_or_else(
        || "/browse".to_string(),
        |c| format!("/browse?category={c}"),
    );
    let page = Page::load(&state, identity, &path).await?;

    let items = match category {
        Some(category) => page.ctx.items_by_category(category).await?,
        None => page.ctx.items().await?,
    };

    let pending = items.is_pending();
    let items = items.unwrap_or_default();
    let cards = item_cards(&page.ctx, &items).await;

    Ok(BrowseTemplate {
        frame: page.frame,
        cards,
        pending,
        category_filters: category_options(category),
        all_selected: category.is_none(),
    })
}
