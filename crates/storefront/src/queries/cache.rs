//! Cache keys and values for backend query results.

use std::sync::Arc;

use atelier_core::{BrandConfig, Category, Item, Principal, UserProfile};

/// Cache key for a query result.
///
/// Results that depend on who is asking carry the caller's principal, since
/// the cache is shared by every session.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Items,
    ItemsByCategory(Category),
    CallerProfile(Principal),
    UserProfile(Principal),
    ArtistStatus(Principal),
    IsAdmin(Principal),
    BrandConfig,
    StripeConfigured,
}

impl QueryKey {
    /// Principal whose view this entry belongs to, for caller-scoped keys.
    #[must_use]
    pub const fn caller_scope(&self) -> Option<&Principal> {
        match self {
            Self::CallerProfile(p) | Self::ArtistStatus(p) | Self::IsAdmin(p) => Some(p),
            Self::Items
            | Self::ItemsByCategory(_)
            | Self::UserProfile(_)
            | Self::BrandConfig
            | Self::StripeConfigured => None,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum QueryValue {
    Items(Arc<Vec<Item>>),
    Profile(Option<UserProfile>),
    Flag(bool),
    Brand(BrandConfig),
}

impl QueryValue {
    pub(super) fn into_items(self) -> Option<Arc<Vec<Item>>> {
        match self {
            Self::Items(items) => Some(items),
            _ => None,
        }
    }

    pub(super) fn into_profile(self) -> Option<Option<UserProfile>> {
        match self {
            Self::Profile(profile) => Some(profile),
            _ => None,
        }
    }

    pub(super) fn into_flag(self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(flag),
            _ => None,
        }
    }

    pub(super) fn into_brand(self) -> Option<BrandConfig> {
        match self {
            Self::Brand(brand) => Some(brand),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_scope() {
        let alice = Principal::parse("aaaaa-aa").unwrap();
        assert_eq!(
            QueryKey::ArtistStatus(alice.clone()).caller_scope(),
            Some(&alice)
        );
        assert_eq!(QueryKey::UserProfile(alice).caller_scope(), None);
        assert_eq!(QueryKey::Items.caller_scope(), None);
    }
}
