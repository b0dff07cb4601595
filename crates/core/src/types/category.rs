//! Item categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a string does not name a category.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct CategoryError(pub String);

/// Marketplace item category.
///
/// Serialized in lowercase to match the backend's variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Paintings,
    Music,
    Ceramics,
    Videography,
    Prints,
    Images,
}

impl Category {
    /// All categories in the order the browse filter shows them.
    pub const ALL: [Self; 6] = [
        Self::Music,
        Self::Videography,
        Self::Images,
        Self::Prints,
        Self::Ceramics,
        Self::Paintings,
    ];

    /// Wire and URL value (e.g. `"music"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paintings => "paintings",
            Self::Music => "music",
            Self::Ceramics => "ceramics",
            Self::Videography => "videography",
            Self::Prints => "prints",
            Self::Images => "images",
        }
    }

    /// Short display label used on badges and filters.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Paintings => "Paintings",
            Self::Music => "Music",
            Self::Ceramics => "Ceramics",
            Self::Videography => "Video",
            Self::Prints => "3D Prints",
            Self::Images => "Images",
        }
    }

    /// Noun phrase describing a work in this category.
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Paintings => "painting",
            Self::Music => "musical composition",
            Self::Ceramics => "ceramic piece",
            Self::Videography => "video production",
            Self::Prints => "3D printed creation",
            Self::Images => "digital artwork",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CategoryError(s.to_owned()))
    }
}
