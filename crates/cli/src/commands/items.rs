//! Catalog commands.
//!
//! # Seed File Format
//!
//! ```yaml
//! items:
//!   - title: Harbor at Dusk
//!     category: paintings
//!     price: "120.00"
//!     description: Oil on canvas.   # optional, generated from title otherwise
//!     images:                        # optional
//!       - https://cdn.example.org/harbor.png
//! ```

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use atelier_core::{
    Category, CategoryError, Item, ItemId, PriceCents, Principal, fallback_description,
};
use atelier_storefront::backend::Actor;

use super::{CliError, require_identity};

/// Seed file contents.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub items: Vec<SeedItem>,
}

/// One item in a seed file.
#[derive(Debug, Deserialize)]
pub struct SeedItem {
    pub title: String,
    pub category: String,
    pub price: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl SeedItem {
    /// Validate into an item owned by `creator`.
    fn into_item(self, creator: &Principal, now: DateTime<Utc>) -> Result<Item, String> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err("title is required".to_string());
        }
        let category = self
            .category
            .parse::<Category>()
            .map_err(|e: CategoryError| e.to_string())?;
        let price = PriceCents::parse_usd(&self.price).map_err(|e| format!("price: {e}"))?;
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| fallback_description(category, &title));

        Ok(Item {
            id: ItemId::generate(now.timestamp_millis()),
            title,
            description,
            creator: creator.clone(),
            category,
            price,
            images: self.images,
            timestamp: now.timestamp_nanos_opt().unwrap_or_default(),
        })
    }
}

/// Parse and validate a seed file into items owned by `creator`.
///
/// Every entry is checked before anything is sent.
///
/// # Errors
///
/// Returns an error naming the first invalid entry.
pub fn parse_seed(
    path: &str,
    content: &str,
    creator: &Principal,
    now: DateTime<Utc>,
) -> Result<Vec<Item>, CliError> {
    let seed_error = |message: String| CliError::Seed {
        path: path.to_string(),
        message,
    };

    let file: SeedFile = serde_yaml::from_str(content).map_err(|e| seed_error(e.to_string()))?;
    file.items
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            entry
                .into_item(creator, now)
                .map_err(|message| seed_error(format!("item {}: {message}", index + 1)))
        })
        .collect()
}

/// Print every item, or one category.
///
/// # Errors
///
/// Returns an error if the category is unknown or the backend call fails.
#[allow(clippy::print_stdout)]
pub async fn list(actor: &Actor, category: Option<&str>) -> Result<(), CliError> {
    let items = match category {
        Some(category) => {
            let category: Category = category.parse()?;
            actor.get_items_by_category(category).await?
        }
        None => actor.get_items().await?,
    };

    for item in &items {
        println!(
            "{:<24} {:<12} {:>10}  {}",
            item.id,
            item.category.as_str(),
            item.price.to_string(),
            item.title
        );
    }
    println!("{} item(s)", items.len());
    Ok(())
}

/// Create every item in a seed file as the caller.
///
/// # Errors
///
/// Returns an error if the caller is anonymous, the file is missing or
/// invalid, or any backend call fails.
pub async fn seed(actor: &Actor, file_path: &str) -> Result<(), CliError> {
    let identity = require_identity(actor)?;

    if !Path::new(file_path).exists() {
        return Err(CliError::Seed {
            path: file_path.to_string(),
            message: "file not found".to_string(),
        });
    }

    info!(path = %file_path, "Loading items from file");
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|e| CliError::Seed {
            path: file_path.to_string(),
            message: e.to_string(),
        })?;

    let items = parse_seed(file_path, &content, identity.principal(), Utc::now())?;
    info!(count = items.len(), "Seed file validated");

    if !actor.is_artist().await? {
        warn!("Caller is not an artist; the backend may reject new items");
    }

    for item in &items {
        actor.add_item(item).await?;
        info!(item_id = %item.id, title = %item.title, "Item created");
    }

    info!(count = items.len(), "Seeding complete");
    Ok(())
}
