//! Item creation and edit pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use atelier_core::{Item, ItemId, fallback_description};

use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{EditItemForm, FormErrors, ItemDraft, ItemFormAction};
use crate::gate::{self, PageGate};
use crate::middleware::OptionalIdentity;
use crate::queries::{QueryContext, QueryError, Remote};
use crate::routes::page::{CategoryOption, Page, PageFrame, category_options};
use crate::state::AppState;

const ARTIST_REQUIRED: &str =
    "You need to enable artist mode to post items. Go to Settings to enable artist status.";
const STRIPE_REQUIRED: &str = "You need to configure your Stripe payment settings before \
     creating items. Go to Settings to set up payments.";

/// Form values and messages for rendering.
#[derive(Debug, Clone)]
pub struct ItemFormView {
    pub draft: ItemDraft,
    pub errors: FormErrors,
    pub categories: Vec<CategoryOption>,
}

impl ItemFormView {
    fn new(draft: ItemDraft, errors: FormErrors) -> Self {
        let categories = category_options(draft.category());
        Self {
            draft,
            errors,
            categories,
        }
    }
}

/// Create item page template.
#[derive(Template, WebTemplate)]
#[template(path = "items/create.html")]
pub struct CreateItemTemplate {
    pub frame: PageFrame,
    pub form: ItemFormView,
    pub needs_artist: bool,
    pub needs_stripe: bool,
}

/// Edit item page template.
#[derive(Template, WebTemplate)]
#[template(path = "items/edit.html")]
pub struct EditItemTemplate {
    pub frame: PageFrame,
    pub item_id: String,
    pub form: ItemFormView,
}

/// What blocks the caller from creating items.
#[derive(Debug, Clone, Copy)]
struct Blockers {
    needs_artist: bool,
    needs_stripe: bool,
}

impl Blockers {
    async fn load(ctx: &QueryContext) -> Result<Remote<Self>> {
        let (artist, stripe) = tokio::join!(ctx.is_artist(), ctx.is_stripe_configured());
        Ok(match (artist?, stripe?) {
            (Remote::Ready(artist), Remote::Ready(stripe)) => Remote::Ready(Self {
                needs_artist: !artist,
                needs_stripe: !stripe,
            }),
            _ => Remote::Pending,
        })
    }

    const fn any(self) -> bool {
        self.needs_artist || self.needs_stripe
    }
}

fn render_create(
    page: Page,
    blockers: Blockers,
    draft: ItemDraft,
    errors: FormErrors,
    status: StatusCode,
) -> Response {
    (
        status,
        CreateItemTemplate {
            frame: page.frame,
            form: ItemFormView::new(draft, errors),
            needs_artist: blockers.needs_artist,
            needs_stripe: blockers.needs_stripe,
        },
    )
        .into_response()
}

/// Fill the draft description from the backend, or the fallback sentence.
async fn generate_description(ctx: &QueryContext, draft: &mut ItemDraft) -> Option<FormErrors> {
    let (prompt, category) = match draft.description_prompt() {
        Ok(prompt) => prompt,
        Err(errors) => return Some(errors),
    };

    draft.description = match ctx.generate_description(&prompt).await {
        Ok(description) => description,
        Err(e) => {
            warn!(error = %e, "Description generation failed, using fallback");
            fallback_description(category, draft.title.trim())
        }
    };
    None
}

/// Display the create item form.
///
/// # Route
///
/// `GET /create-item`
pub async fn new_item(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
) -> Result<Response> {
    let page = Page::load(&state, identity, "/create-item").await?;
    if let PageGate::Denied = gate::require_identity(page.identity.as_ref()) {
        return Ok(page.denied());
    }

    Ok(match Blockers::load(&page.ctx).await? {
        Remote::Pending => page.loading(),
        Remote::Ready(blockers) => render_create(
            page,
            blockers,
            ItemDraft::default(),
            FormErrors::default(),
            StatusCode::OK,
        ),
    })
}

/// Handle the create item form.
///
/// The pressed button decides the outcome: generate a description, drop an
/// uploaded image, or create the item and return to browse.
///
/// # Route
///
/// `POST /create-item`
pub async fn create_item(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    multipart: Multipart,
) -> Result<Response> {
    let page = Page::load(&state, identity, "/create-item").await?;
    let creator = match gate::require_identity(page.identity.as_ref()) {
        PageGate::Content(principal) => principal,
        _ => return Ok(page.denied()),
    };

    let (mut draft, action) = ItemDraft::from_multipart(multipart).await?;

    let blockers = match Blockers::load(&page.ctx).await? {
        Remote::Ready(blockers) => blockers,
        Remote::Pending => return Ok(page.loading()),
    };

    match action {
        ItemFormAction::RemoveImage(index) => {
            draft.remove_image(index);
            Ok(render_create(page, blockers, draft, FormErrors::default(), StatusCode::OK))
        }
        ItemFormAction::GenerateDescription => {
            let errors = generate_description(&page.ctx, &mut draft).await;
            let status = if errors.is_some() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::OK
            };
            Ok(render_create(page, blockers, draft, errors.unwrap_or_default(), status))
        }
        ItemFormAction::Submit => {
            if blockers.any() {
                let message = if blockers.needs_artist {
                    ARTIST_REQUIRED
                } else {
                    STRIPE_REQUIRED
                };
                return Ok(render_create(
                    page,
                    blockers,
                    draft,
                    FormErrors::form(message),
                    StatusCode::UNPROCESSABLE_ENTITY,
                ));
            }

            let valid = match draft.validate(true) {
                Ok(valid) => valid,
                Err(errors) => {
                    return Ok(render_create(
                        page,
                        blockers,
                        draft,
                        errors,
                        StatusCode::UNPROCESSABLE_ENTITY,
                    ));
                }
            };

            let item = valid.into_new_item(creator, Utc::now());
            match page.ctx.add_item(&item).await {
                Ok(()) => {
                    info!(item_id = %item.id, category = %item.category, "Item created");
                    Ok(Redirect::to("/browse").into_response())
                }
                Err(QueryError::InFlight(_)) => {
                    warn!("Duplicate create ignored");
                    Ok(Redirect::to("/browse").into_response())
                }
                Err(e) => {
                    let err = AppError::Query(e);
                    let status = err.status();
                    Ok(render_create(
                        page,
                        blockers,
                        draft,
                        FormErrors::form(format!("Failed to create item: {}", err.public_message())),
                        status,
                    ))
                }
            }
        }
    }
}

/// Load the page and resolve the editor gate.
async fn load_editable(
    state: &AppState,
    identity: Option<crate::identity::Identity>,
    id: &ItemId,
) -> Result<(Page, PageGate<Item>)> {
    let path = format!("/edit-item/{id}");
    let page = Page::load(state, identity, &path).await?;
    let items = page.ctx.items().await?;
    let gate = gate::item_editor(&page.viewer, items.as_ref().map(|items| items.as_slice()), id);
    Ok((page, gate))
}

fn render_edit(
    page: Page,
    item: &Item,
    draft: ItemDraft,
    errors: FormErrors,
    status: StatusCode,
) -> Response {
    (
        status,
        EditItemTemplate {
            frame: page.frame,
            item_id: item.id.to_string(),
            form: ItemFormView::new(draft, errors),
        },
    )
        .into_response()
}

/// Display the edit form. Creator or admin only.
///
/// # Route
///
/// `GET /edit-item/{id}`
pub async fn edit_item(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
) -> Result<Response> {
    let (page, gate) = load_editable(&state, identity, &ItemId::new(id)).await?;

    Ok(match gate {
        PageGate::Loading => page.loading(),
        PageGate::Denied => page.denied(),
        PageGate::NotFound => page.item_not_found(),
        PageGate::Content(item) => {
            let draft = ItemDraft::from_item(&item);
            render_edit(page, &item, draft, FormErrors::default(), StatusCode::OK)
        }
    })
}

/// Handle the edit form.
///
/// # Route
///
/// `POST /edit-item/{id}`
pub async fn update_item(
    State(state): State<AppState>,
    OptionalIdentity(identity): OptionalIdentity,
    Path(id): Path<String>,
    Form(form): Form<EditItemForm>,
) -> Result<Response> {
    let (page, gate) = load_editable(&state, identity, &ItemId::new(id)).await?;

    let item = match gate {
        PageGate::Loading => return Ok(page.loading()),
        PageGate::Denied => return Ok(page.denied()),
        PageGate::NotFound => return Ok(page.item_not_found()),
        PageGate::Content(item) => item,
    };

    let (mut draft, action) = form.into_draft(&item);

    if action == ItemFormAction::GenerateDescription {
        let errors = generate_description(&page.ctx, &mut draft).await;
        let status = if errors.is_some() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::OK
        };
        return Ok(render_edit(page, &item, draft, errors.unwrap_or_default(), status));
    }

    let updated = match draft.validate(false) {
        Ok(valid) => valid.apply_to(&item),
        Err(errors) => {
            return Ok(render_edit(
                page,
                &item,
                draft,
                errors,
                StatusCode::UNPROCESSABLE_ENTITY,
            ));
        }
    };

    match page.ctx.update_item(&updated).await {
        Ok(()) => {
            info!(item_id = %item.id, "Item updated");
            Ok(Redirect::to(&format!("/item/{}", item.id)).into_response())
        }
        Err(e) => {
            let err = AppError::Query(e);
            let status = err.status();
            Ok(render_edit(
                page,
                &item,
                draft,
                FormErrors::form(format!("Failed to update item: {}", err.public_message())),
                status,
            ))
        }
    }
}
