//! Marketplace backend client.
//!
//! # Architecture
//!
//! - [`Transport`] is the untyped RPC seam: one method name, positional JSON
//!   arguments, one JSON reply. [`HttpTransport`] speaks it over `reqwest`.
//! - [`Actor`] is the typed handle used by the rest of the storefront. It
//!   binds a transport to a [`Caller`] and marshals every backend operation.
//! - [`ActorProvider`] publishes the transport only after the backend answered
//!   a connectivity probe; until then no actor is available.
//!
//! The backend derives roles, ownership checks and artist status from the
//! caller's delegation; the storefront never decides them on its own.
//!
//! # Example
//!
//! ```rust,ignore
//! let actor = provider.actor(Caller::Anonymous).ok_or(QueryError::ActorUnavailable)?;
//! let items = actor.get_items().await?;
//! ```

mod http;
mod provider;

pub use http::HttpTransport;
pub use provider::ActorProvider;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use atelier_core::{
    BrandConfig, Category, Item, ItemId, Principal, ShoppingItem, StripeConfiguration,
    StripeSessionStatus, UserProfile, UserRole,
};

use crate::identity::Identity;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Backend returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// Backend rejected the call (authorization failure, trap, invalid input).
    #[error("Backend rejected {method}: {message}")]
    Rejected {
        /// Remote method name.
        method: &'static str,
        /// Message reported by the backend.
        message: String,
    },

    /// Arguments or reply could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Identity attached to a backend call.
#[derive(Debug, Clone)]
pub enum Caller {
    /// No identity; the backend sees the anonymous principal.
    Anonymous,
    /// A logged-in identity.
    Authenticated(Identity),
}

impl Caller {
    /// Build a caller from an optional identity.
    #[must_use]
    pub fn from_identity(identity: Option<Identity>) -> Self {
        identity.map_or(Self::Anonymous, Self::Authenticated)
    }

    /// Principal the backend will see for this caller.
    #[must_use]
    pub fn principal(&self) -> Principal {
        match self {
            Self::Anonymous => Principal::anonymous(),
            Self::Authenticated(identity) => identity.principal().clone(),
        }
    }

    /// The identity, if logged in.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    /// Whether this caller is logged in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Untyped RPC channel to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Invoke `method` with positional JSON arguments on behalf of `caller`.
    async fn call(
        &self,
        caller: &Caller,
        method: &'static str,
        args: Vec<Value>,
    ) -> Result<Value, BackendError>;

    /// Check that the backend is reachable.
    async fn probe(&self) -> Result<(), BackendError>;
}

/// Typed handle to the backend for one caller.
#[derive(Clone)]
pub struct Actor {
    transport: Arc<dyn Transport>,
    caller: Caller,
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("caller", &self.caller.principal())
            .finish_non_exhaustive()
    }
}

/// Serialize one positional argument.
fn arg<T: Serialize + ?Sized>(value: &T) -> Result<Value, BackendError> {
    Ok(serde_json::to_value(value)?)
}

impl Actor {
    /// Bind a transport to a caller.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, caller: Caller) -> Self {
        Self { transport, caller }
    }

    /// The caller this actor acts for.
    #[must_use]
    pub const fn caller(&self) -> &Caller {
        &self.caller
    }

    async fn invoke<R: DeserializeOwned>(
        &self,
        method: &'static str,
        args: Vec<Value>,
    ) -> Result<R, BackendError> {
        let reply = self.transport.call(&self.caller, method, args).await?;
        Ok(serde_json::from_value(reply)?)
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// List every item.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_items(&self) -> Result<Vec<Item>, BackendError> {
        self.invoke("getItems", vec![]).await
    }

    /// List items in one category.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_items_by_category(
        &self,
        category: Category,
    ) -> Result<Vec<Item>, BackendError> {
        self.invoke("getItemsByCategory", vec![arg(&category)?])
            .await
    }

    /// Create an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the item.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn add_item(&self, item: &Item) -> Result<(), BackendError> {
        self.invoke("addItem", vec![arg(item)?]).await
    }

    /// Replace an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn update_item(&self, item: &Item) -> Result<(), BackendError> {
        self.invoke("updateItem", vec![arg(item)?]).await
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the removal.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, id: &ItemId) -> Result<(), BackendError> {
        self.invoke("removeItem", vec![arg(id)?]).await
    }

    // =========================================================================
    // Profiles and roles
    // =========================================================================

    /// Profile of the caller, `None` before onboarding.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, BackendError> {
        self.invoke("getCallerUserProfile", vec![]).await
    }

    /// Profile of another principal.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_user_profile(
        &self,
        user: &Principal,
    ) -> Result<Option<UserProfile>, BackendError> {
        self.invoke("getUserProfile", vec![arg(user)?]).await
    }

    /// Create or replace the caller's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the profile.
    #[instrument(skip(self, profile))]
    pub async fn save_caller_user_profile(&self, profile: &UserProfile) -> Result<(), BackendError> {
        self.invoke("saveCallerUserProfile", vec![arg(profile)?])
            .await
    }

    /// Whether the caller is an artist.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn is_artist(&self) -> Result<bool, BackendError> {
        self.invoke("isArtist", vec![]).await
    }

    /// Enable or disable artist mode for the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the change.
    #[instrument(skip(self))]
    pub async fn update_artist_status(&self, is_artist: bool) -> Result<(), BackendError> {
        self.invoke("updateArtistStatus", vec![arg(&is_artist)?])
            .await
    }

    /// Whether the caller is an admin.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn is_caller_admin(&self) -> Result<bool, BackendError> {
        self.invoke("isCallerAdmin", vec![]).await
    }

    /// Role of the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_caller_user_role(&self) -> Result<UserRole, BackendError> {
        self.invoke("getCallerUserRole", vec![]).await
    }

    /// Assign a role to a principal (admin only).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the assignment.
    #[instrument(skip(self))]
    pub async fn assign_caller_user_role(
        &self,
        user: &Principal,
        role: UserRole,
    ) -> Result<(), BackendError> {
        self.invoke("assignCallerUserRole", vec![arg(user)?, arg(&role)?])
            .await
    }

    // =========================================================================
    // Branding and Stripe
    // =========================================================================

    /// Platform branding.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_brand_config(&self) -> Result<BrandConfig, BackendError> {
        self.invoke("getBrandConfig", vec![]).await
    }

    /// Replace platform branding (admin only).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the update.
    #[instrument(skip(self, config))]
    pub async fn update_brand_config(&self, config: &BrandConfig) -> Result<(), BackendError> {
        self.invoke("updateBrandConfig", vec![arg(config)?]).await
    }

    /// Whether Stripe has been configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn is_stripe_configured(&self) -> Result<bool, BackendError> {
        self.invoke("isStripeConfigured", vec![]).await
    }

    /// Store Stripe credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the configuration.
    #[instrument(skip(self, config))]
    pub async fn set_stripe_configuration(
        &self,
        config: &StripeConfiguration,
    ) -> Result<(), BackendError> {
        self.invoke("setStripeConfiguration", vec![arg(config)?])
            .await
    }

    /// Create a Stripe checkout session; returns the raw session payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create the session.
    #[instrument(skip(self, items))]
    pub async fn create_checkout_session(
        &self,
        items: &[ShoppingItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<String, BackendError> {
        self.invoke(
            "createCheckoutSession",
            vec![arg(items)?, arg(success_url)?, arg(cancel_url)?],
        )
        .await
    }

    /// Status of a checkout session.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the reply is malformed.
    #[instrument(skip(self))]
    pub async fn get_stripe_session_status(
        &self,
        session_id: &str,
    ) -> Result<StripeSessionStatus, BackendError> {
        self.invoke("getStripeSessionStatus", vec![arg(session_id)?])
            .await
    }

    /// Generate an item description from a `"<title> - <category>"` prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails.
    #[instrument(skip(self))]
    pub async fn generate_item_description(&self, prompt: &str) -> Result<String, BackendError> {
        self.invoke("generateItemDescription", vec![arg(prompt)?])
            .await
    }
}
