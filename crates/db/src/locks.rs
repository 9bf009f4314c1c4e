use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed mutual exclusion for per-user document cycles.
///
/// The store's save is a whole-document replace, so two concurrent
/// get→mutate→save cycles for the same user would silently drop the loser's
/// edits. The workflow engine holds the user's lock for the duration of a
/// turn; requests for distinct users proceed in parallel.
#[derive(Clone, Default)]
pub struct UserLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `user_id`, creating it on first use. The guard
    /// is owned so it can be held across await points.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut registry = self.inner.lock().await;
            // A strong count of 1 means no guard or waiter holds the mutex;
            // dropping those entries keeps the registry proportional to the
            // users currently mid-turn rather than ever seen.
            registry.retain(|_, lock| Arc::strong_count(lock) > 1);
            registry.entry(user_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        lock.lock_owned().await
    }
}
