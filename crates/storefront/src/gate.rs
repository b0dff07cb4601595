//! Page access decisions.
//!
//! Each gated page resolves a [`Viewer`] once and asks a gate function for a
//! [`PageGate`]. While any prerequisite is still [`Remote::Pending`] the answer
//! is [`PageGate::Loading`], never a denial.

use atelier_core::{Item, ItemId, Principal};

use crate::identity::Identity;
use crate::queries::Remote;

/// Who is looking at the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Guest,
    Member(Principal),
    Admin(Principal),
}

impl Viewer {
    /// Combine the session identity with the admin query.
    ///
    /// Guests resolve immediately; members stay pending until the admin flag
    /// is known.
    #[must_use]
    pub fn resolve(identity: Option<&Identity>, is_admin: Remote<bool>) -> Remote<Self> {
        let Some(identity) = identity else {
            return Remote::Ready(Self::Guest);
        };
        let principal = identity.principal().clone();
        is_admin.map(|admin| {
            if admin {
                Self::Admin(principal)
            } else {
                Self::Member(principal)
            }
        })
    }

    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        match self {
            Self::Guest => None,
            Self::Member(p) | Self::Admin(p) => Some(p),
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }

    /// Whether the viewer created `item`.
    #[must_use]
    pub fn owns(&self, item: &Item) -> bool {
        self.principal().is_some_and(|p| item.is_created_by(p))
    }

    /// Creator or any admin may edit or delete.
    #[must_use]
    pub fn can_manage(&self, item: &Item) -> bool {
        self.is_admin() || self.owns(item)
    }

    /// Anyone but the creator may buy.
    #[must_use]
    pub fn can_purchase(&self, item: &Item) -> bool {
        !self.owns(item)
    }
}

/// Outcome of a page gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageGate<T> {
    Content(T),
    Denied,
    NotFound,
    Loading,
}

/// Pages that only need a logged-in identity (create item, settings).
#[must_use]
pub fn require_identity(identity: Option<&Identity>) -> PageGate<Principal> {
    identity.map_or(PageGate::Denied, |identity| {
        PageGate::Content(identity.principal().clone())
    })
}

/// Pages for administrators.
#[must_use]
pub fn require_admin(viewer: &Remote<Viewer>) -> PageGate<Principal> {
    match viewer {
        Remote::Pending => PageGate::Loading,
        Remote::Ready(Viewer::Admin(p)) => PageGate::Content(p.clone()),
        Remote::Ready(Viewer::Guest | Viewer::Member(_)) => PageGate::Denied,
    }
}

/// Item detail: public, but needs the item list.
#[must_use]
pub fn item_detail(items: Remote<&[Item]>, id: &ItemId) -> PageGate<Item> {
    match items {
        Remote::Pending => PageGate::Loading,
        Remote::Ready(items) => find(items, id).map_or(PageGate::NotFound, PageGate::Content),
    }
}

/// Item editor: creator or admin only.
///
/// Guests are denied before the item is looked up; an authenticated viewer
/// asking for an unknown id gets not-found.
#[must_use]
pub fn item_editor(viewer: &Remote<Viewer>, items: Remote<&[Item]>, id: &ItemId) -> PageGate<Item> {
    let (Remote::Ready(viewer), Remote::Ready(items)) = (viewer, items) else {
        return PageGate::Loading;
    };

    if matches!(viewer, Viewer::Guest) {
        return PageGate::Denied;
    }

    match find(items, id) {
        None => PageGate::NotFound,
        Some(item) if viewer.can_manage(&item) => PageGate::Content(item),
        Some(_) => PageGate::Denied,
    }
}

fn find(items: &[Item], id: &ItemId) -> Option<Item> {
    items.iter().find(|item| &item.id == id).cloned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{alice, bob, sample_item};
    use atelier_core::Category;

    fn items() -> Vec<Item> {
        vec![sample_item("1-a", Category::Music)]
    }

    fn member(identity: &Identity) -> Remote<Viewer> {
        Viewer::resolve(Some(identity), Remote::Ready(false))
    }

    fn admin(identity: &Identity) -> Remote<Viewer> {
        Viewer::resolve(Some(identity), Remote::Ready(true))
    }

    #[test]
    fn test_resolve_viewer() {
        assert_eq!(
            Viewer::resolve(None, Remote::Pending),
            Remote::Ready(Viewer::Guest)
        );
        assert!(Viewer::resolve(Some(&alice()), Remote::Pending).is_pending());
        assert!(admin(&bob()).ready().unwrap().is_admin());
    }

    #[test]
    fn test_creator_and_admin_can_manage() {
        let item = sample_item("1-a", Category::Music);

        assert!(member(&alice()).ready().unwrap().can_manage(&item));
        assert!(!member(&bob()).ready().unwrap().can_manage(&item));
        assert!(admin(&bob()).ready().unwrap().can_manage(&item));
        assert!(!Viewer::Guest.can_manage(&item));
    }

    #[test]
    fn test_creator_cannot_purchase_own_item() {
        let item = sample_item("1-a", Category::Music);
        assert!(!member(&alice()).ready().unwrap().can_purchase(&item));
        assert!(member(&bob()).ready().unwrap().can_purchase(&item));
        assert!(Viewer::Guest.can_purchase(&item));
    }

    #[test]
    fn test_editor_gate() {
        let items = items();
        let id = ItemId::new("1-a");
        let ready = Remote::Ready(items.as_slice());

        assert!(matches!(
            item_editor(&member(&alice()), ready.clone(), &id),
            PageGate::Content(_)
        ));
        assert_eq!(
            item_editor(&member(&bob()), ready.clone(), &id),
            PageGate::Denied
        );
        assert!(matches!(
            item_editor(&admin(&bob()), ready.clone(), &id),
            PageGate::Content(_)
        ));
        assert_eq!(
            item_editor(&Remote::Ready(Viewer::Guest), ready.clone(), &id),
            PageGate::Denied
        );
        assert_eq!(
            item_editor(&member(&bob()), ready, &ItemId::new("missing")),
            PageGate::NotFound
        );
    }

    #[test]
    fn test_editor_gate_never_denies_while_pending() {
        let items = items();
        let id = ItemId::new("1-a");
        let pending_viewer = Viewer::resolve(Some(&bob()), Remote::Pending);

        assert_eq!(
            item_editor(&pending_viewer, Remote::Ready(items.as_slice()), &id),
            PageGate::Loading
        );
        assert_eq!(
            item_editor(&member(&bob()), Remote::Pending, &id),
            PageGate::Loading
        );
    }

    #[test]
    fn test_admin_gate() {
        assert_eq!(require_admin(&Remote::Pending), PageGate::Loading);
        assert_eq!(require_admin(&member(&alice())), PageGate::Denied);
        assert_eq!(
            require_admin(&Remote::Ready(Viewer::Guest)),
            PageGate::Denied
        );
        assert!(matches!(require_admin(&admin(&alice())), PageGate::Content(_)));
    }

    #[test]
    fn test_identity_gate() {
        assert_eq!(require_identity(None), PageGate::Denied);
        assert!(matches!(
            require_identity(Some(&alice())),
            PageGate::Content(_)
        ));
    }

    #[test]
    fn test_detail_gate() {
        let items = items();
        assert_eq!(
            item_detail(Remote::Pending, &ItemId::new("1-a")),
            PageGate::Loading
        );
        assert_eq!(
            item_detail(Remote::Ready(items.as_slice()), &ItemId::new("nope")),
            PageGate::NotFound
        );
        assert!(matches!(
            item_detail(Remote::Ready(items.as_slice()), &ItemId::new("1-a")),
            PageGate::Content(_)
        ));
    }
}
