use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::debug;
use crate::error::ApiError;

/// Session-lifetime memo of lookups keyed by entity id (course, fee structure).
///
/// Entries are never evicted; `clear` is called when the session ends.
/// Concurrent misses on the same key share one fetch: the first caller runs
/// it, the others wait on the same cell. A failed fetch leaves the cell
/// empty so the next call retries.
pub struct LookupCache<K, V> {
    name: &'static str,
    cells: Mutex<HashMap<K, Arc<OnceCell<Arc<V>>>>>,
}

impl<K, V> LookupCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Display,
{
    pub fn new(name: &'static str) -> Self {
        Self { name, cells: Mutex::new(HashMap::new()) }
    }

    /// Cached value, if the key has already been resolved.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.lock().get(key).and_then(|cell| cell.get().cloned())
    }

    pub async fn get<F, Fut>(&self, key: K, fetch: F) -> Result<Arc<V>, ApiError>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V, ApiError>>,
    {
        let cell = {
            let mut cells = self.lock();
            cells.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }
        let name = self.name;
        let value = cell
            .get_or_try_init(move || async move {
                debug!(cache = name, %key, "lookup miss, fetching");
                fetch(key).await.map(Arc::new)
            })
            .await?;
        Ok(value.clone())
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().values().filter(|cell| cell.initialized()).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<K, Arc<OnceCell<Arc<V>>>>> {
        self.cells.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
