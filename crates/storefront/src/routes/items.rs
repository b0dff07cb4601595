//! Item detail, purchase and delete handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, warn};

use atelier_core::{CheckoutError, Item, ItemId, ShoppingItem};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::gate::{self, PageGate, Viewer};
use crate::middleware::{OptionalIdentity, RequireIdentity};
use crate::queries::{QueryError, Remote};
use crate::routes::page::{Page, PageFrame, UNKNOWN_CREATOR, degrade};
use crate::state::AppState;

/// Query string placeholder Stripe replaces with the session id.
const CHECKOUT_SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

/// Gallery thumbnail.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub index: usize,
    pub src: String,
    pub active: bool,
}

/// Item detail display data.
#[derive(Debug, Clone)]
pub struct ItemDetail {
    pub id: String,
    pub title: String,
    pub category_label: &'static str,
    pub description: String,
    pub creator_name: String,
    pub listed_on: String,
    pub price: String,
    pub image: String,
    pub image_position: usize,
    pub image_count: usize,
    pub previous_image: Option<usize>,
    pub next_image: Option<usize>,
    pub thumbnails: Vec<Thumbnail>,
    pub can_manage: bool,
    pub can_purchase: bool,
}

impl ItemDetail {
    fn new(item: &Item, viewer: &Viewer, creator_name: String, selected: usize) -> Self {
        let images = item.display_images();
        let count = images.len();
        let current = selected.min(count.saturating_sub(1));

        Self {
            id: item.id.to_string(),
            title: item.title.clone(),
            category_label: item.category.label(),
            description: item.description.clone(),
            creator_name,
            listed_on: item.listed_at().format("%B %-d, %Y").to_string(),
            price: item.price.to_string(),
            image: images.get(current).copied().unwrap_or_default().to_string(),
            image_position: current + 1,
            image_count: count,
            previous_image: (count > 1).then(|| (current + count - 1) % count),
            next_image: (count > 1).then(|| (current + 1) % count),
            thumbnails: if count > 1 {
                images
                    .iter()
                    .enumerate()
                    .map(|(index, src)| Thumbnail {
                        index,
                        src: (*src).to_string(),
                        active: index == current,
                    })
                    .collect()
            } else {
                Vec::new()
            },
            can_manage: viewer.can_manage(item),
            can_purchase: viewer.can_purchase(item),
        }
    }
}

/// Item detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "items/show.html")]
pub struct ItemShowTemplate {
    pub frame: PageFrame,
    pub item: ItemDetail,
    pub purchase_error: Option<String>,
}

/// Gallery query parameters.
#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub image: Option<usize>,
}

/// Load the page and resolve the item detail gate.
async fn load_item(
    state: &AppState,
    identity: Option<crate::identity::Identity>,
    id: &ItemId,
    path: &str,
) -> Result<(Page, PageGate<Item>)> {
    let page = Page::load(state, identity, path).await?;
    let items = page.ctx.items().await?;
    let gate = gate::item_detail(items.as_ref().map(|items| items.as_slice()), id);
    Ok((page, gate))
}

/// Render the detail page for a gated item.
async fn render_item(
    page: Page,
    item: &Item,
    image: usize,
    purchase_error: Option<String>,
    status: StatusCode,
) -> Response {
    let Remote::Ready(viewer) = &page.viewer else {
        return page.loading();
    };

    let creator_name = degrade(page.ctx.user_profile(&item.creator).await, "creator profile")
        .ready()
        .flatten()
        .map(|profile| profile.name)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_CREATOR.to_string());

    let detail = ItemDetail::new(item, viewer, creator_name, image);
    (
        status,
        ItemShowTemplate {
            frame: page.frame,
            item: detail,
            purchase_error,
        },
    )
        .into_response()
}

/// Display an item.
///
/// # Route
///
/// `GET /item/{id}?image=<index>`
pub async fn show(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
    Query(query): Query<GalleryQuery>,
) -> Result<Response> {
    let id = ItemId::new(id);
    let path = format!("/item/{id}");
    let (page, gate) = load_item(&state, identity, &id, &path).await?;

    Ok(match gate {
        PageGate::Loading => page.loading(),
        PageGate::Denied => page.denied(),
        PageGate::NotFound => page.item_not_found(),
        PageGate::Content(item) => {
            render_item(page, &item, query.image.unwrap_or(0), None, StatusCode::OK).await
        }
    })
}

/// Message shown under the purchase button.
fn purchase_failure(err: &QueryError) -> String {
    match err {
        QueryError::Checkout(CheckoutError::MissingUrl) => err.to_string(),
        QueryError::ActorUnavailable => {
            "The marketplace is still connecting. Please try again shortly.".to_string()
        }
        QueryError::InFlight(_) => "Checkout is already being started".to_string(),
        QueryError::Backend(_) | QueryError::Checkout(_) => {
            "Failed to initiate checkout".to_string()
        }
    }
}

/// Start a Stripe checkout for one item.
///
/// Responds `303 See Other` to the Stripe URL; any failure re-renders the
/// item page with an inline error.
///
/// # Route
///
/// `POST /item/{id}/purchase`
pub async fn purchase(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = ItemId::new(id);
    let path = format!("/item/{id}");
    let (page, gate) = load_item(&state, identity, &id, &path).await?;

    let item = match gate {
        PageGate::Loading => return Ok(page.loading()),
        PageGate::Denied => return Ok(page.denied()),
        PageGate::NotFound => return Ok(page.item_not_found()),
        PageGate::Content(item) => item,
    };

    if matches!(&page.viewer, Remote::Ready(viewer) if !viewer.can_purchase(&item)) {
        return Ok(page.denied());
    }

    add_breadcrumb("checkout", "Started checkout", Some(&[("item_id", id.as_str())]));

    let config = state.config();
    let success_url = config.absolute_url(&format!(
        "/payment-success?session_id={CHECKOUT_SESSION_PLACEHOLDER}"
    ));
    let cancel_url = config.absolute_url("/payment-failure");
    let line_items = [ShoppingItem::from_item(&item)];

    match page
        .ctx
        .create_checkout_session(&line_items, &success_url, &cancel_url)
        .await
    {
        Ok(session) => {
            info!(item_id = %id, session_id = %session.id, "Redirecting to checkout");
            Ok(Redirect::to(&session.url).into_response())
        }
        Err(e) => {
            let message = purchase_failure(&e);
            let status = AppError::Query(e).status();
            Ok(render_item(page, &item, 0, Some(message), status).await)
        }
    }
}

/// Delete an item. Creator or admin only.
///
/// A second delete while the first is pending is a no-op redirect.
///
/// # Route
///
/// `POST /item/{id}/delete`
pub async fn delete(
    State(state): State<AppState>,
    RequireIdentity(identity): RequireIdentity,
    Path(id): Path<String>,
) -> Result<Response> {
    let id = ItemId::new(id);
    let path = format!("/item/{id}");
    let page = Page::load(&state, Some(identity), &path).await?;
    let items = page.ctx.items().await?;

    let item = match gate::item_editor(
        &page.viewer,
        items.as_ref().map(|items| items.as_slice()),
        &id,
    ) {
        PageGate::Loading => return Ok(page.loading()),
        PageGate::Denied => return Ok(page.denied()),
        PageGate::NotFound => return Ok(page.item_not_found()),
        PageGate::Content(item) => item,
    };

    match page.ctx.remove_item(&item.id).await {
        Ok(()) => {
            info!(item_id = %id, "Item deleted");
            Ok(Redirect::to("/browse").into_response())
        }
        Err(QueryError::InFlight(_)) => {
            warn!(item_id = %id, "Duplicate delete ignored");
            Ok(Redirect::to("/browse").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{alice, bob, sample_item};
    use atelier_core::{Category, PLACEHOLDER_IMAGE};

    fn with_images(count: usize) -> Item {
        Item {
            images: (0..count)
                .map(|i| format!("https://cdn.example.org/{i}.png"))
                .collect(),
            ..sample_item("1-a", Category::Paintings)
        }
    }

    fn member(identity: &crate::identity::Identity) -> Viewer {
        Viewer::Member(identity.principal().clone())
    }

    #[test]
    fn test_detail_without_images_uses_placeholder() {
        let detail = ItemDetail::new(&with_images(0), &Viewer::Guest, "Alice".into(), 0);
        assert_eq!(detail.image, PLACEHOLDER_IMAGE);
        assert_eq!(detail.image_count, 1);
        assert!(detail.previous_image.is_none());
        assert!(detail.thumbnails.is_empty());
        assert_eq!(detail.price, "$25.00");
    }

    #[test]
    fn test_gallery_wraps_around() {
        let item = with_images(3);
        let detail = ItemDetail::new(&item, &Viewer::Guest, "Alice".into(), 0);
        assert_eq!(detail.previous_image, Some(2));
        assert_eq!(detail.next_image, Some(1));
        assert!(detail.thumbnails.first().unwrap().active);

        let last = ItemDetail::new(&item, &Viewer::Guest, "Alice".into(), 2);
        assert_eq!(last.next_image, Some(0));
        assert_eq!(last.image_position, 3);
    }

    #[test]
    fn test_out_of_range_image_clamps_to_last() {
        let detail = ItemDetail::new(&with_images(2), &Viewer::Guest, "Alice".into(), 9);
        assert_eq!(detail.image, "https://cdn.example.org/1.png");
    }

    #[test]
    fn test_controls_depend_on_viewer() {
        let item = with_images(1);

        let owner = ItemDetail::new(&item, &member(&alice()), "Alice".into(), 0);
        assert!(owner.can_manage);
        assert!(!owner.can_purchase);

        let other = ItemDetail::new(&item, &member(&bob()), "Alice".into(), 0);
        assert!(!other.can_manage);
        assert!(other.can_purchase);

        let admin = ItemDetail::new(
            &item,
            &Viewer::Admin(bob().principal().clone()),
            "Alice".into(),
            0,
        );
        assert!(admin.can_manage);
        assert!(admin.can_purchase);
    }

    #[test]
    fn test_purchase_failure_messages() {
        assert_eq!(
            purchase_failure(&QueryError::Checkout(CheckoutError::MissingUrl)),
            "Stripe session missing url"
        );
        assert_eq!(
            purchase_failure(&QueryError::Backend(crate::backend::BackendError::Rejected {
                method: "createCheckoutSession",
                message: "stripe down".to_string(),
            })),
            "Failed to initiate checkout"
        );
    }
}
