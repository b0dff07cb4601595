//! Backend actor availability.
//!
//! The storefront starts serving before the backend has been reached. A
//! background task probes the backend and publishes the transport once it
//! answers; until then [`ActorProvider::actor`] returns `None`.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{error, info, warn};

use super::{Actor, Caller, Transport};

const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Publishes the backend transport once the connection is established.
#[derive(Clone)]
pub struct ActorProvider {
    transport: Arc<dyn Transport>,
    published: Arc<RwLock<Option<Arc<dyn Transport>>>>,
}

impl ActorProvider {
    /// Provider with nothing published yet.
    #[must_use]
    pub fn pending(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            published: Arc::new(RwLock::new(None)),
        }
    }

    /// Provider that is already connected.
    #[must_use]
    pub fn connected(transport: Arc<dyn Transport>) -> Self {
        Self {
            published: Arc::new(RwLock::new(Some(Arc::clone(&transport)))),
            transport,
        }
    }

    /// Whether the backend connection has been established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.published
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Actor for `caller`, if the backend is connected.
    #[must_use]
    pub fn actor(&self, caller: Caller) -> Option<Actor> {
        let transport = self.published.read().ok()?.clone()?;
        Some(Actor::new(transport, caller))
    }

    fn publish(&self) {
        match self.published.write() {
            Ok(mut guard) => *guard = Some(Arc::clone(&self.transport)),
            Err(e) => error!(error = %e, "Failed to publish backend actor"),
        }
    }

    /// Spawn the background task that probes the backend until it answers.
    pub fn connect_in_background(&self) {
        let provider = self.clone();
        info!("Spawning backend connection task");
        tokio::spawn(async move {
            provider.connect().await;
        });
    }

    async fn connect(&self) {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            match self.transport.probe().await {
                Ok(()) => {
                    self.publish();
                    info!("Backend connected, actor available");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, retry_in_ms = backoff.as_millis(), "Backend not reachable");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    #[test]
    fn test_pending_provider_has_no_actor() {
        let provider = ActorProvider::pending(Arc::new(ScriptedTransport::new()));
        assert!(!provider.is_connected());
        assert!(provider.actor(Caller::Anonymous).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_publishes_after_probe_succeeds() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.set_reachable(false);
        let provider = ActorProvider::pending(transport.clone());

        provider.connect_in_background();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!provider.is_connected());

        transport.set_reachable(true);
        tokio::time::sleep(MAX_BACKOFF).await;
        assert!(provider.is_connected());
        assert!(provider.actor(Caller::Anonymous).is_some());
    }
}
