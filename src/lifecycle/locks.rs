use ahash::AHashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// In-process mutual exclusion per slug.
///
/// Entries are never evicted; the map grows with the number of distinct slugs ever touched,
/// which is bounded by what administrators install.
#[derive(Clone, Default)]
pub struct SlugLocks {
    inner: Arc<Mutex<AHashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SlugLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `slug` remains. The guard releases on drop.
    pub async fn acquire(&self, slug: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(slug.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
