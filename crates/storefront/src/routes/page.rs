//! Per-request page context shared by every rendered page.
//!
//! [`Page::load`] runs the queries every layout needs (brand, admin flag,
//! caller profile) concurrently and resolves the [`Viewer`] once. Handlers
//! then ask a gate for the page and render the outcome.

use std::collections::{HashMap, HashSet};

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::future::join_all;
use tracing::warn;

use atelier_core::{BrandConfig, Category, Item, Principal};

use crate::error::Result;
use crate::filters;
use crate::gate::Viewer;
use crate::identity::Identity;
use crate::queries::{ProfileState, QueryContext, QueryError, Remote};
use crate::state::AppState;

/// Platform name shown until an admin sets one.
pub const DEFAULT_PLATFORM_NAME: &str = "Creative Market";

/// Layout data for the header, footer and onboarding form.
#[derive(Debug, Clone)]
pub struct PageFrame {
    pub platform_name: String,
    pub logo_url: Option<String>,
    pub principal: Option<String>,
    pub show_admin_link: bool,
    /// Present when the caller is logged in without a profile.
    pub profile_setup: Option<ProfileSetup>,
    /// Path of the current page, used as the post-login and post-setup target.
    pub path: String,
}

impl PageFrame {
    /// Login link returning to the current page.
    #[must_use]
    pub fn login_url(&self) -> String {
        format!("/auth/login?return_to={}", urlencoding::encode(&self.path))
    }
}

/// Profile setup form state.
#[derive(Debug, Clone, Default)]
pub struct ProfileSetup {
    pub name: String,
    pub error: Option<String>,
}

/// Everything a handler needs to render a page for one request.
pub struct Page {
    pub ctx: QueryContext,
    pub identity: Option<Identity>,
    pub viewer: Remote<Viewer>,
    pub profile: ProfileState,
    pub brand: BrandConfig,
    pub frame: PageFrame,
}

impl Page {
    /// Load the layout queries for `identity`.
    ///
    /// Brand and profile failures degrade to defaults; an admin-flag failure
    /// fails the page since gates depend on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the admin query fails.
    pub async fn load(state: &AppState, identity: Option<Identity>, path: &str) -> Result<Self> {
        let ctx = state.query_context(identity.clone());
        let (brand, is_admin, profile) =
            tokio::join!(ctx.brand_config(), ctx.is_admin(), ctx.caller_profile());

        let brand = degrade(brand, "brand config").ready().unwrap_or_default();
        let profile = ProfileState::from(degrade(profile, "caller profile"));
        let viewer = Viewer::resolve(identity.as_ref(), is_admin?);

        let frame = PageFrame {
            platform_name: if brand.platform_name.trim().is_empty() {
                DEFAULT_PLATFORM_NAME.to_string()
            } else {
                brand.platform_name.clone()
            },
            logo_url: Some(brand.logo_url.clone()).filter(|url| !url.trim().is_empty()),
            principal: identity.as_ref().map(|i| i.principal().to_string()),
            show_admin_link: matches!(&viewer, Remote::Ready(v) if v.is_admin()),
            profile_setup: (identity.is_some() && profile.is_missing())
                .then(ProfileSetup::default),
            path: path.to_string(),
        };

        Ok(Self {
            ctx,
            identity,
            viewer,
            profile,
            brand,
            frame,
        })
    }

    /// Placeholder shown while a prerequisite is still pending.
    #[must_use]
    pub fn loading(&self) -> Response {
        LoadingTemplate {
            frame: self.frame.clone(),
        }
        .into_response()
    }

    /// Access denied screen (403).
    #[must_use]
    pub fn denied(&self) -> Response {
        (
            StatusCode::FORBIDDEN,
            AccessDeniedTemplate {
                frame: self.frame.clone(),
            },
        )
            .into_response()
    }

    /// Item not found screen (404).
    #[must_use]
    pub fn item_not_found(&self) -> Response {
        (
            StatusCode::NOT_FOUND,
            NotFoundTemplate {
                frame: self.frame.clone(),
                title: "Item Not Found",
                message: "The item you're looking for doesn't exist.",
            },
        )
            .into_response()
    }
}

/// Log a failed query and treat it as not loaded.
pub fn degrade<T>(result: std::result::Result<Remote<T>, QueryError>, what: &str) -> Remote<T> {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load {what}");
        Remote::Pending
    })
}

#[derive(Template, WebTemplate)]
#[template(path = "gate/loading.html")]
struct LoadingTemplate {
    frame: PageFrame,
}

#[derive(Template, WebTemplate)]
#[template(path = "gate/access_denied.html")]
struct AccessDeniedTemplate {
    frame: PageFrame,
}

/// Generic not-found page.
#[derive(Template, WebTemplate)]
#[template(path = "gate/not_found.html")]
pub struct NotFoundTemplate {
    pub frame: PageFrame,
    pub title: &'static str,
    pub message: &'static str,
}

// =============================================================================
// Item display
// =============================================================================

/// Name shown for creators without a profile.
pub const UNKNOWN_CREATOR: &str = "Artist";

/// Item grid card.
#[derive(Debug, Clone)]
pub struct ItemCard {
    pub id: String,
    pub title: String,
    pub category_label: &'static str,
    pub description: String,
    pub cover_image: String,
    pub creator_name: String,
    pub price: String,
}

impl ItemCard {
    fn new(item: &Item, names: &HashMap<Principal, String>) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title.clone(),
            category_label: item.category.label(),
            description: item.description.clone(),
            cover_image: item.cover_image().to_string(),
            creator_name: creator_name(names, &item.creator),
            price: item.price.to_string(),
        }
    }
}

/// Cards for `items`, with creator names looked up concurrently.
pub async fn item_cards(ctx: &QueryContext, items: &[Item]) -> Vec<ItemCard> {
    let names = creator_names(ctx, items.iter().map(|item| &item.creator)).await;
    items.iter().map(|item| ItemCard::new(item, &names)).collect()
}

/// Profile names for each distinct creator. Failed or missing lookups are left out.
pub async fn creator_names<'a>(
    ctx: &QueryContext,
    creators: impl Iterator<Item = &'a Principal>,
) -> HashMap<Principal, String> {
    let unique: HashSet<&Principal> = creators.collect();
    let lookups = unique.into_iter().map(|creator| async move {
        let profile = degrade(ctx.user_profile(creator).await, "creator profile");
        (creator.clone(), profile.ready().flatten())
    });

    join_all(lookups)
        .await
        .into_iter()
        .filter_map(|(creator, profile)| profile.map(|p| (creator, p.name)))
        .collect()
}

/// Display name for `creator`.
#[must_use]
pub fn creator_name(names: &HashMap<Principal, String>, creator: &Principal) -> String {
    names
        .get(creator)
        .filter(|name| !name.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_CREATOR.to_string())
}

/// `<option>` in a category select or filter.
#[derive(Debug, Clone)]
pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Every category, with `selected` marked.
#[must_use]
pub fn category_options(selected: Option<Category>) -> Vec<CategoryOption> {
    Category::ALL
        .iter()
        .map(|&category| CategoryOption {
            value: category.as_str(),
            label: category.label(),
            selected: selected == Some(category),
        })
        .collect()
}

/// Only local paths are accepted as redirect targets.
#[must_use]
pub fn safe_return_path(path: Option<&str>) -> &str {
    path.filter(|p| p.starts_with('/') && !p.starts_with("//") && !p.contains('\\'))
        .unwrap_or("/")
}
