//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use atelier_core::{Category, Item, ItemId, PriceCents, Principal};

use crate::backend::{ActorProvider, BackendError, Caller, Transport};
use crate::config::{BackendConfig, CacheConfig, IdentityConfig, StorefrontConfig};
use crate::identity::Identity;
use crate::queries::Queries;

pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendConfig {
            url: "http://localhost:4943".to_string(),
            timeout: Duration::from_secs(5),
        },
        identity: IdentityConfig {
            provider_url: "http://localhost:4944".to_string(),
            client_id: "atelier".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
        },
        cache: CacheConfig::default(),
        max_upload_bytes: 1024 * 1024,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

pub fn alice() -> Identity {
    Identity::new(
        Principal::parse("rdmx6-jaaaa-aaaaa-aaadq-cai").unwrap(),
        SecretString::from("alice-delegation"),
        None,
    )
}

pub fn bob() -> Identity {
    Identity::new(
        Principal::parse("ryjl3-tyaaa-aaaaa-aaaba-cai").unwrap(),
        SecretString::from("bob-delegation"),
        None,
    )
}

/// An item created by alice.
pub fn sample_item(id: &str, category: Category) -> Item {
    Item {
        id: ItemId::new(id),
        title: "Sonata".to_string(),
        description: "A piece".to_string(),
        creator: alice().principal().clone(),
        category,
        price: PriceCents::from_cents(2500),
        images: Vec::new(),
        timestamp: 1_700_000_000_000_000_000,
    }
}

pub fn queries_with(transport: Arc<ScriptedTransport>) -> Queries {
    Queries::new(ActorProvider::connected(transport), CacheConfig::default())
}

/// One call observed by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub args: Vec<Value>,
    pub caller: Principal,
}

/// In-memory transport answering from a script and recording every call.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<&'static str, Result<Value, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    unreachable: AtomicBool,
    held: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
    called: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` with `value`.
    pub fn reply(&self, method: &'static str, value: Value) {
        self.replies.lock().unwrap().insert(method, Ok(value));
    }

    /// Reject `method` with `message`.
    pub fn fail(&self, method: &'static str, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .insert(method, Err(message.to_string()));
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Block calls to `method` until [`Self::release`].
    pub fn hold(&self, method: &'static str) {
        self.held
            .lock()
            .unwrap()
            .insert(method, Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, method: &'static str) {
        if let Some(gate) = self.held.lock().unwrap().get(method) {
            gate.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Wait until `method` has been called at least once.
    pub async fn wait_for_call(&self, method: &str) {
        loop {
            let notified = self.called.notified();
            if self.count(method) > 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn args_of(&self, method: &str) -> Vec<Vec<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .map(|c| c.args.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(
        &self,
        caller: &Caller,
        method: &'static str,
        args: Vec<Value>,
    ) -> Result<Value, BackendError> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            args,
            caller: caller.principal(),
        });
        self.called.notify_waiters();

        let gate = self.held.lock().unwrap().get(method).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await.unwrap();
        }

        let reply = self.replies.lock().unwrap().get(method).cloned();
        match reply {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(BackendError::Rejected { method, message }),
            None => Err(BackendError::Rejected {
                method,
                message: format!("no reply scripted for {method}"),
            }),
        }
    }

    async fn probe(&self) -> Result<(), BackendError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(BackendError::Status {
                status: 503,
                body: String::new(),
            })
        } else {
            Ok(())
        }
    }
}
