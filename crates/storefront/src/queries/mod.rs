//! Data-access layer: named queries and mutations over the backend actor.
//!
//! Queries are cached reads keyed by [`QueryKey`]. Mutations are never cached;
//! on success each one invalidates exactly the keys that depend on it:
//!
//! | Mutation                  | Invalidates                                   |
//! |---------------------------|-----------------------------------------------|
//! | save profile              | `CallerProfile(caller)`                       |
//! | update artist status      | `ArtistStatus(caller)`, `CallerProfile(caller)` |
//! | add / update / remove item| `Items`                                       |
//! | update brand config       | `BrandConfig`                                 |
//! | set Stripe configuration  | `StripeConfigured`                            |
//! | assign role               | `IsAdmin(target)`                             |
//!
//! Without an actor, queries answer [`Remote::Pending`] and mutations fail
//! with [`QueryError::ActorUnavailable`]. Nothing is retried and failures are
//! never cached.

mod cache;
mod inflight;

pub use cache::{QueryKey, QueryValue};
pub use inflight::{InFlight, MutationKey};

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use atelier_core::{
    BrandConfig, Category, CheckoutError, CheckoutSession, Item, ItemId, Principal,
    ShoppingItem, StripeConfiguration, StripeSessionStatus, UserProfile, UserRole,
};

use crate::backend::{Actor, ActorProvider, BackendError, Caller};
use crate::config::CacheConfig;

/// Errors surfaced by queries and mutations.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The backend connection has not been established yet.
    #[error("Actor not available")]
    ActorUnavailable,

    /// An identical mutation from the same caller is still pending.
    #[error("{0} is already in progress")]
    InFlight(&'static str),

    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The checkout payload could not be used.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

/// Result of a read that may not be answerable yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote<T> {
    /// No actor is available; the answer is unknown.
    Pending,
    /// The backend answered.
    Ready(T),
}

impl<T> Remote<T> {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub const fn as_ref(&self) -> Remote<&T> {
        match self {
            Self::Pending => Remote::Pending,
            Self::Ready(value) => Remote::Ready(value),
        }
    }

    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Remote<U> {
        match self {
            Self::Pending => Remote::Pending,
            Self::Ready(value) => Remote::Ready(f(value)),
        }
    }

    /// The answer, or `default` while pending.
    #[must_use]
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Pending => default,
            Self::Ready(value) => value,
        }
    }

    #[must_use]
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Pending => None,
            Self::Ready(value) => Some(value),
        }
    }
}

impl<T: Default> Remote<T> {
    /// The answer, or the neutral default (empty list, `false`) while pending.
    #[must_use]
    pub fn unwrap_or_default(self) -> T {
        self.unwrap_or(T::default())
    }
}

/// Whether the caller has completed onboarding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileState {
    /// Not known yet.
    NotLoaded,
    /// The caller has no profile.
    Missing,
    /// The caller's profile.
    Present(UserProfile),
}

impl ProfileState {
    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        match self {
            Self::Present(profile) => Some(profile),
            Self::NotLoaded | Self::Missing => None,
        }
    }

    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<Remote<Option<UserProfile>>> for ProfileState {
    fn from(remote: Remote<Option<UserProfile>>) -> Self {
        match remote {
            Remote::Pending => Self::NotLoaded,
            Remote::Ready(None) => Self::Missing,
            Remote::Ready(Some(profile)) => Self::Present(profile),
        }
    }
}

/// Shared query cache and mutation bookkeeping.
#[derive(Clone)]
pub struct Queries {
    inner: Arc<QueriesInner>,
}

struct QueriesInner {
    actors: ActorProvider,
    cache: Cache<QueryKey, QueryValue>,
    /// Bumped on every invalidation; fetches started under an older value
    /// do not populate the cache.
    generation: AtomicU64,
    in_flight: InFlight,
}

impl Queries {
    /// Create the query layer over an actor provider.
    #[must_use]
    pub fn new(actors: ActorProvider, config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .support_invalidation_closures()
            .build();

        Self {
            inner: Arc::new(QueriesInner {
                actors,
                cache,
                generation: AtomicU64::new(0),
                in_flight: InFlight::default(),
            }),
        }
    }

    /// The actor provider backing these queries.
    #[must_use]
    pub fn actors(&self) -> &ActorProvider {
        &self.inner.actors
    }

    /// Query context for one request.
    #[must_use]
    pub fn context(&self, caller: Caller) -> QueryContext {
        QueryContext {
            actor: self.inner.actors.actor(caller.clone()),
            queries: self.clone(),
            caller,
        }
    }

    /// Drop one cached result.
    pub async fn invalidate(&self, key: &QueryKey) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        self.inner.cache.invalidate(key).await;
        debug!(?key, "Invalidated query");
    }

    /// Drop every cached result scoped to `principal`.
    pub fn clear_caller(&self, principal: &Principal) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let principal = principal.clone();
        if let Err(e) = self
            .inner
            .cache
            .invalidate_entries_if(move |key, _| key.caller_scope() == Some(&principal))
        {
            error!(error = %e, "Failed to clear caller cache entries");
        }
    }

    /// Whether a result is currently cached for `key`.
    #[must_use]
    pub fn is_cached(&self, key: &QueryKey) -> bool {
        self.inner.cache.contains_key(key)
    }

    async fn cached<T, Fut>(
        &self,
        key: QueryKey,
        fetch: Fut,
        wrap: fn(T) -> QueryValue,
        unwrap: fn(QueryValue) -> Option<T>,
    ) -> Result<T, QueryError>
    where
        T: Clone,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        if let Some(value) = self.inner.cache.get(&key).await
            && let Some(hit) = unwrap(value)
        {
            debug!(?key, "Query cache hit");
            return Ok(hit);
        }

        let generation = self.inner.generation.load(Ordering::Acquire);
        let value = fetch.await.inspect_err(|e| {
            warn!(?key, error = %e, "Query failed");
        })?;

        self.store_if_current(key, wrap(value.clone()), generation)
            .await;

        Ok(value)
    }

    /// Cache `value` unless an invalidation happened since `generation` was
    /// read. Returns whether the value stayed cached.
    async fn store_if_current(&self, key: QueryKey, value: QueryValue, generation: u64) -> bool {
        if self.inner.generation.load(Ordering::Acquire) != generation {
            debug!(?key, "Skipping cache write for result fetched before invalidation");
            return false;
        }

        self.inner.cache.insert(key.clone(), value).await;

        // An invalidation can land between the check and the insert.
        if self.inner.generation.load(Ordering::Acquire) != generation {
            self.inner.cache.invalidate(&key).await;
            debug!(?key, "Dropped cache write overtaken by invalidation");
            return false;
        }
        true
    }
}

/// Queries and mutations bound to one caller for one request.
#[derive(Clone)]
pub struct QueryContext {
    queries: Queries,
    caller: Caller,
    actor: Option<Actor>,
}

impl QueryContext {
    /// The caller these queries run for.
    #[must_use]
    pub const fn caller(&self) -> &Caller {
        &self.caller
    }

    /// Whether an actor was available when this context was created.
    #[must_use]
    pub const fn has_actor(&self) -> bool {
        self.actor.is_some()
    }

    fn principal(&self) -> Principal {
        self.caller.principal()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Every item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn items(&self) -> Result<Remote<Arc<Vec<Item>>>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        self.queries
            .cached(
                QueryKey::Items,
                async { actor.get_items().await.map(Arc::new) },
                QueryValue::Items,
                QueryValue::into_items,
            )
            .await
            .map(Remote::Ready)
    }

    /// Items in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn items_by_category(
        &self,
        category: Category,
    ) -> Result<Remote<Arc<Vec<Item>>>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        self.queries
            .cached(
                QueryKey::ItemsByCategory(category),
                async { actor.get_items_by_category(category).await.map(Arc::new) },
                QueryValue::Items,
                QueryValue::into_items,
            )
            .await
            .map(Remote::Ready)
    }

    /// The caller's own profile. Guests have none.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn caller_profile(&self) -> Result<Remote<Option<UserProfile>>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        if !self.caller.is_authenticated() {
            return Ok(Remote::Ready(None));
        }
        self.queries
            .cached(
                QueryKey::CallerProfile(self.principal()),
                actor.get_caller_user_profile(),
                QueryValue::Profile,
                QueryValue::into_profile,
            )
            .await
            .map(Remote::Ready)
    }

    /// Another principal's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn user_profile(
        &self,
        user: &Principal,
    ) -> Result<Remote<Option<UserProfile>>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        self.queries
            .cached(
                QueryKey::UserProfile(user.clone()),
                actor.get_user_profile(user),
                QueryValue::Profile,
                QueryValue::into_profile,
            )
            .await
            .map(Remote::Ready)
    }

    /// Whether the caller is an artist. Guests never are.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn is_artist(&self) -> Result<Remote<bool>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        if !self.caller.is_authenticated() {
            return Ok(Remote::Ready(false));
        }
        self.queries
            .cached(
                QueryKey::ArtistStatus(self.principal()),
                actor.is_artist(),
                QueryValue::Flag,
                QueryValue::into_flag,
            )
            .await
            .map(Remote::Ready)
    }

    /// Whether the caller is an admin. Guests never are.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn is_admin(&self) -> Result<Remote<bool>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        if !self.caller.is_authenticated() {
            return Ok(Remote::Ready(false));
        }
        self.queries
            .cached(
                QueryKey::IsAdmin(self.principal()),
                actor.is_caller_admin(),
                QueryValue::Flag,
                QueryValue::into_flag,
            )
            .await
            .map(Remote::Ready)
    }

    /// Platform branding.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn brand_config(&self) -> Result<Remote<BrandConfig>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        self.queries
            .cached(
                QueryKey::BrandConfig,
                actor.get_brand_config(),
                QueryValue::Brand,
                QueryValue::into_brand,
            )
            .await
            .map(Remote::Ready)
    }

    /// Whether Stripe has been configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn is_stripe_configured(&self) -> Result<Remote<bool>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        self.queries
            .cached(
                QueryKey::StripeConfigured,
                actor.is_stripe_configured(),
                QueryValue::Flag,
                QueryValue::into_flag,
            )
            .await
            .map(Remote::Ready)
    }

    /// Status of a checkout session. Not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn stripe_session_status(
        &self,
        session_id: &str,
    ) -> Result<Remote<StripeSessionStatus>, QueryError> {
        let Some(actor) = &self.actor else {
            return Ok(Remote::Pending);
        };
        Ok(Remote::Ready(actor.get_stripe_session_status(session_id).await?))
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    async fn mutate<T, F, Fut>(
        &self,
        operation: &'static str,
        target: Option<String>,
        call: F,
        invalidates: &[QueryKey],
    ) -> Result<T, QueryError>
    where
        F: FnOnce(Actor) -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let actor = self.actor.clone().ok_or(QueryError::ActorUnavailable)?;

        // Guests share the anonymous principal, so only callers with an
        // identity can be told apart.
        let _guard = if self.caller.is_authenticated() {
            let key = MutationKey {
                caller: self.principal(),
                operation,
                target,
            };
            Some(
                self.queries
                    .inner
                    .in_flight
                    .acquire(key)
                    .ok_or(QueryError::InFlight(operation))?,
            )
        } else {
            None
        };

        let value = call(actor).await.inspect_err(|e| {
            error!(operation, error = %e, "Mutation failed");
        })?;

        for key in invalidates {
            self.queries.invalidate(key).await;
        }
        info!(operation, "Mutation succeeded");

        Ok(value)
    }

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available, another create by the same
    /// caller is pending, or the backend rejects the item.
    pub async fn add_item(&self, item: &Item) -> Result<(), QueryError> {
        // Each submission gets a fresh id, so creates are keyed per caller.
        self.mutate(
            "addItem",
            None,
            |actor| async move { actor.add_item(item).await },
            &[QueryKey::Items],
        )
        .await
    }

    /// Replace an item.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available, the same submission is
    /// pending, or the backend rejects the update.
    pub async fn update_item(&self, item: &Item) -> Result<(), QueryError> {
        self.mutate(
            "updateItem",
            Some(item.id.to_string()),
            |actor| async move { actor.update_item(item).await },
            &[QueryKey::Items],
        )
        .await
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available, the same deletion is
    /// pending, or the backend rejects the removal.
    pub async fn remove_item(&self, id: &ItemId) -> Result<(), QueryError> {
        self.mutate(
            "removeItem",
            Some(id.to_string()),
            |actor| async move { actor.remove_item(id).await },
            &[QueryKey::Items],
        )
        .await
    }

    /// Create or replace the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available or the backend rejects it.
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), QueryError> {
        self.mutate(
            "saveCallerUserProfile",
            None,
            |actor| async move { actor.save_caller_user_profile(profile).await },
            &[QueryKey::CallerProfile(self.principal())],
        )
        .await
    }

    /// Enable or disable artist mode for the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available or the backend rejects it.
    pub async fn update_artist_status(&self, is_artist: bool) -> Result<(), QueryError> {
        let principal = self.principal();
        self.mutate(
            "updateArtistStatus",
            None,
            |actor| async move { actor.update_artist_status(is_artist).await },
            &[
                QueryKey::ArtistStatus(principal.clone()),
                QueryKey::CallerProfile(principal),
            ],
        )
        .await
    }

    /// Replace platform branding.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available or the backend rejects it.
    pub async fn update_brand_config(&self, config: &BrandConfig) -> Result<(), QueryError> {
        self.mutate(
            "updateBrandConfig",
            None,
            |actor| async move { actor.update_brand_config(config).await },
            &[QueryKey::BrandConfig],
        )
        .await
    }

    /// Store Stripe credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available or the backend rejects it.
    pub async fn set_stripe_configuration(
        &self,
        config: &StripeConfiguration,
    ) -> Result<(), QueryError> {
        self.mutate(
            "setStripeConfiguration",
            None,
            |actor| async move { actor.set_stripe_configuration(config).await },
            &[QueryKey::StripeConfigured],
        )
        .await
    }

    /// Assign a role to a principal.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available or the backend rejects it.
    pub async fn assign_role(&self, user: &Principal, role: UserRole) -> Result<(), QueryError> {
        self.mutate(
            "assignCallerUserRole",
            Some(user.to_string()),
            |actor| async move { actor.assign_caller_user_role(user, role).await },
            &[QueryKey::IsAdmin(user.clone())],
        )
        .await
    }

    /// Create a checkout session and return its redirect target.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available, the backend fails, or the
    /// payload has no redirect URL.
    pub async fn create_checkout_session(
        &self,
        items: &[ShoppingItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, QueryError> {
        let payload = self
            .mutate(
                "createCheckoutSession",
                None,
                |actor| async move {
                    actor
                        .create_checkout_session(items, success_url, cancel_url)
                        .await
                },
                &[],
            )
            .await?;

        CheckoutSession::parse(&payload).map_err(|e| {
            error!(error = %e, "Unusable checkout session payload");
            QueryError::Checkout(e)
        })
    }

    /// Generate an item description.
    ///
    /// # Errors
    ///
    /// Returns an error if no actor is available or generation fails.
    pub async fn generate_description(&self, prompt: &str) -> Result<String, QueryError> {
        self.mutate(
            "generateItemDescription",
            None,
            |actor| async move { actor.generate_item_description(prompt).await },
            &[],
        )
        .await
    }
}
