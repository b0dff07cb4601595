//! Duplicate-submission guard for mutations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use atelier_core::Principal;

/// Identifies one pending mutation: who, what, and on which target.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct MutationKey {
    pub caller: Principal,
    pub operation: &'static str,
    pub target: Option<String>,
}

/// Set of mutations currently awaiting the backend.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<Mutex<HashSet<MutationKey>>>,
}

impl InFlight {
    /// Claim `key`; `None` if an identical mutation is already pending.
    pub fn acquire(&self, key: MutationKey) -> Option<InFlightGuard> {
        let mut active = self.active.lock().ok()?;
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            active: Arc::clone(&self.active),
            key,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.active.lock().map(|a| a.len()).unwrap_or_default()
    }
}

/// Releases the claim when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<MutationKey>>>,
    key: MutationKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.lock() {
            active.remove(&self.key);
        }
    }
}
