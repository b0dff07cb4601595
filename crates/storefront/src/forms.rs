//! Item creation and edit forms.
//!
//! The create form is multipart: uploaded files become `data:` URIs and
//! images from earlier submissions come back as hidden `existing_images`
//! fields, so a re-rendered form never loses uploads. The edit form is
//! urlencoded and leaves images alone.

use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use atelier_core::{Category, Item, ItemId, PriceCents, Principal};

/// Submit button pressed on an item form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFormAction {
    /// Create the listing.
    Submit,
    /// Ask the backend for a description.
    GenerateDescription,
    /// Drop one of the already uploaded images.
    RemoveImage(usize),
}

impl ItemFormAction {
    fn parse(value: &str) -> Self {
        match value {
            "generate" => Self::GenerateDescription,
            other => other
                .strip_prefix("remove-image:")
                .and_then(|index| index.parse().ok())
                .map_or(Self::Submit, Self::RemoveImage),
        }
    }
}

/// Raw form values, echoed back when the form is re-rendered.
#[derive(Debug, Clone, Default)]
pub struct ItemDraft {
    pub title: String,
    pub category: String,
    pub price: String,
    pub description: String,
    pub images: Vec<String>,
    pub rejected_files: Vec<String>,
}

/// Urlencoded edit form body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EditItemForm {
    pub title: String,
    pub category: String,
    pub price: String,
    pub description: String,
    pub action: String,
}

impl EditItemForm {
    /// Draft for `item` with the submitted fields, plus the pressed button.
    #[must_use]
    pub fn into_draft(self, item: &Item) -> (ItemDraft, ItemFormAction) {
        let action = ItemFormAction::parse(&self.action);
        let draft = ItemDraft {
            title: self.title,
            category: self.category,
            price: self.price,
            description: self.description,
            images: item.images.clone(),
            rejected_files: Vec::new(),
        };
        (draft, action)
    }
}

/// Inline validation messages, one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub title: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub images: Option<String>,
    /// Error not tied to a single field (backend failure, blocked creation).
    pub form: Option<String>,
}

impl FormErrors {
    /// A form-level error.
    #[must_use]
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            form: Some(message.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.images.is_none()
            && self.form.is_none()
    }
}

/// Validated item fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidItem {
    pub title: String,
    pub category: Category,
    pub price: PriceCents,
    pub description: String,
    pub images: Vec<String>,
}

impl ValidItem {
    /// Build a new listing owned by `creator`.
    #[must_use]
    pub fn into_new_item(self, creator: Principal, now: DateTime<Utc>) -> Item {
        Item {
            id: ItemId::generate(now.timestamp_millis()),
            title: self.title,
            description: self.description,
            creator,
            category: self.category,
            price: self.price,
            images: self.images,
            timestamp: now.timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    /// Apply edited fields to `item`; id, creator, images and timestamp stay.
    #[must_use]
    pub fn apply_to(self, item: &Item) -> Item {
        Item {
            title: self.title,
            description: self.description,
            category: self.category,
            price: self.price,
            ..item.clone()
        }
    }
}

fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{content_type};base64,{}", STANDARD.encode(bytes))
}

impl ItemDraft {
    /// Prefill from an existing item.
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            title: item.title.clone(),
            category: item.category.as_str().to_owned(),
            price: item.price.as_decimal_string(),
            description: item.description.clone(),
            images: item.images.clone(),
            rejected_files: Vec::new(),
        }
    }

    /// Read the multipart create form.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid multipart or exceeds the
    /// request body limit.
    pub async fn from_multipart(
        mut multipart: Multipart,
    ) -> Result<(Self, ItemFormAction), MultipartError> {
        let mut draft = Self::default();
        let mut action = ItemFormAction::Submit;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "images" => {
                    let file_name = field.file_name().unwrap_or_default().to_owned();
                    let content_type = field.content_type().unwrap_or_default().to_owned();
                    let bytes = field.bytes().await?;
                    if bytes.is_empty() {
                        continue;
                    }
                    if content_type.starts_with("image/") {
                        draft.images.push(data_uri(&content_type, &bytes));
                    } else {
                        draft.rejected_files.push(file_name);
                    }
                }
                "existing_images" => {
                    let image = field.text().await?;
                    if image.starts_with("data:image/") || image.starts_with("https://") {
                        draft.images.push(image);
                    }
                }
                "title" => draft.title = field.text().await?,
                "category" => draft.category = field.text().await?,
                "price" => draft.price = field.text().await?,
                "description" => draft.description = field.text().await?,
                "action" => action = ItemFormAction::parse(&field.text().await?),
                _ => {}
            }
        }

        Ok((draft, action))
    }

    /// Parsed category, if valid.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        self.category.parse().ok()
    }

    /// Remove one image by position.
    pub fn remove_image(&mut self, index: usize) {
        if index < self.images.len() {
            self.images.remove(index);
        }
    }

    /// Prompt for description generation: `"<title> - <category>"`.
    ///
    /// # Errors
    ///
    /// Returns inline errors if the title or category is missing.
    pub fn description_prompt(&self) -> Result<(String, Category), FormErrors> {
        let mut errors = FormErrors::default();
        let title = self.title.trim();
        if title.is_empty() {
            errors.title = Some("Enter a title before generating a description".to_string());
        }
        let category = self.category();
        if category.is_none() {
            errors.category = Some("Choose a category before generating a description".to_string());
        }

        match category {
            Some(category) if errors.is_empty() => {
                Ok((format!("{title} - {}", category.as_str()), category))
            }
            _ => Err(errors),
        }
    }

    /// Validate the draft.
    ///
    /// # Errors
    ///
    /// Returns inline errors for every invalid field.
    pub fn validate(&self, require_images: bool) -> Result<ValidItem, FormErrors> {
        let mut errors = FormErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.title = Some("Title is required".to_string());
        }

        let category = self.category();
        if category.is_none() {
            errors.category = Some("Choose a category".to_string());
        }

        let price = PriceCents::parse_usd(&self.price)
            .map_err(|e| errors.price = Some(format!("Enter a valid price ({e})")))
            .ok();

        let description = self.description.trim();
        if description.is_empty() {
            errors.description = Some("Description is required".to_string());
        }

        if !self.rejected_files.is_empty() {
            errors.images = Some(format!(
                "Only image files can be uploaded: {}",
                self.rejected_files.join(", ")
            ));
        } else if require_images && self.images.is_empty() {
            errors.images = Some("Upload at least one image".to_string());
        }

        match (category, price) {
            (Some(category), Some(price)) if errors.is_empty() => Ok(ValidItem {
                title: title.to_owned(),
                category,
                price,
                description: description.to_owned(),
                images: self.images.clone(),
            }),
            _ => Err(errors),
        }
    }
}
