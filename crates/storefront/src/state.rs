//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{ActorProvider, BackendError, Caller, HttpTransport};
use crate::config::StorefrontConfig;
use crate::identity::{Identity, IdentityClient};
use crate::queries::{Queries, QueryContext};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// query layer, the identity provider client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    queries: Queries,
    identity: IdentityClient,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The backend actor starts out pending; call
    /// [`Self::start_backend_connection`] to publish it once reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let transport = Arc::new(HttpTransport::new(&config.backend)?);
        Ok(Self::with_provider(config, ActorProvider::pending(transport)))
    }

    /// Create state around an existing actor provider.
    #[must_use]
    pub fn with_provider(config: StorefrontConfig, actors: ActorProvider) -> Self {
        let queries = Queries::new(actors, config.cache);
        let identity = IdentityClient::new(&config.identity);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                queries,
                identity,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the query layer.
    #[must_use]
    pub fn queries(&self) -> &Queries {
        &self.inner.queries
    }

    /// Get a reference to the backend actor provider.
    #[must_use]
    pub fn actors(&self) -> &ActorProvider {
        self.inner.queries.actors()
    }

    /// Get a reference to the identity provider client.
    #[must_use]
    pub fn identity(&self) -> &IdentityClient {
        &self.inner.identity
    }

    /// Query context for one request.
    #[must_use]
    pub fn query_context(&self, identity: Option<Identity>) -> QueryContext {
        self.inner.queries.context(Caller::from_identity(identity))
    }

    /// Probe the backend in the background and publish the actor when it answers.
    pub fn start_backend_connection(&self) {
        self.actors().connect_in_background();
    }
}
