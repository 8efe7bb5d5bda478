//! Per-domain mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// One async mutex per canonical domain.
///
/// The map grows by one entry per distinct domain and is never evicted.
#[derive(Debug, Clone, Default)]
pub struct DomainLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Held while work against a domain is in flight. Dropping it releases the lock.
#[derive(Debug)]
pub struct DomainGuard {
    domain: String,
    _guard: OwnedMutexGuard<()>,
}

impl DomainGuard {
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl DomainLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder exists for `domain`, then hold it.
    pub async fn acquire(&self, domain: &str) -> DomainGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = lock.lock_owned().await;
        trace!(domain, "domain lock acquired");
        DomainGuard {
            domain: domain.to_string(),
            _guard: guard,
        }
    }

    /// Release a held domain lock.
    pub fn release(&self, guard: DomainGuard) {
        trace!(domain = %guard.domain, "domain lock released");
        drop(guard);
    }

    /// Number of distinct domains ever locked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
