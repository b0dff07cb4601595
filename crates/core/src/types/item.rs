//! Marketplace items.

use serde::{Deserialize, Serialize};

use super::{Category, ItemId, PriceCents, Principal};

/// Image shown for items listed without images.
pub const PLACEHOLDER_IMAGE: &str = "/assets/generated/item-placeholder.dim_400x400.png";

/// A listed creative work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: String,
    pub creator: Principal,
    pub category: Category,
    pub price: PriceCents,
    /// Image URLs or `data:` URIs, in display order.
    pub images: Vec<String>,
    /// Creation time in nanoseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Item {
    /// First image, or the placeholder when the item has none.
    #[must_use]
    pub fn cover_image(&self) -> &str {
        self.images.first().map_or(PLACEHOLDER_IMAGE, String::as_str)
    }

    /// Images for the gallery; never empty.
    #[must_use]
    pub fn display_images(&self) -> Vec<&str> {
        if self.images.is_empty() {
            vec![PLACEHOLDER_IMAGE]
        } else {
            self.images.iter().map(String::as_str).collect()
        }
    }

    /// Whether `principal` created this item.
    #[must_use]
    pub fn is_created_by(&self, principal: &Principal) -> bool {
        self.creator.as_str() == principal.as_str()
    }

    /// Creation time as a UTC date-time.
    #[must_use]
    pub fn listed_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_nanos(self.timestamp)
    }
}

/// Description used when generation is unavailable.
///
/// Deterministic for a given category and title.
#[must_use]
pub fn fallback_description(category: Category, title: &str) -> String {
    format!(
        "A unique {} titled \"{title}\". This original work showcases exceptional craftsmanship and artistic vision.",
        category.noun()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(images: Vec<String>) -> Item {
        Item {
            id: ItemId::new("1-abc"),
            title: "Sonata".to_string(),
            description: "A piece".to_string(),
            creator: Principal::parse("aaaaa-aa").unwrap(),
            category: Category::Music,
            price: PriceCents::from_cents(2500),
            images,
            timestamp: 1_700_000_000_000_000_000,
        }
    }

    #[test]
    fn test_cover_image_placeholder() {
        assert_eq!(item(vec![]).cover_image(), PLACEHOLDER_IMAGE);
        assert_eq!(item(vec![]).display_images(), vec![PLACEHOLDER_IMAGE]);
    }

    #[test]
    fn test_cover_image_first() {
        let it = item(vec!["/a.png".to_string(), "/b.png".to_string()]);
        assert_eq!(it.cover_image(), "/a.png");
        assert_eq!(it.display_images(), vec!["/a.png", "/b.png"]);
    }

    #[test]
    fn test_is_created_by() {
        let it = item(vec![]);
        assert!(it.is_created_by(&Principal::parse("aaaaa-aa").unwrap()));
        assert!(!it.is_created_by(&Principal::anonymous()));
    }

    #[test]
    fn test_fallback_description_music() {
        let text = fallback_description(Category::Music, "Sonata");
        assert!(text.contains("musical composition"));
        assert!(text.contains("Sonata"));
        assert_eq!(text, fallback_description(Category::Music, "Sonata"));
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let json = serde_json::to_value(item(vec![])).unwrap();
        assert_eq!(json["category"], "music");
        assert_eq!(json["price"], 2500);
        assert_eq!(json["creator"], "aaaaa-aa");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_listed_at() {
        let it = item(vec![]);
        assert_eq!(it.listed_at().timestamp(), 1_700_000_000);
    }
}
