//! Per-client engine cache.
//!
//! Maps an [`EngineConfig`] fingerprint to a shared [`EngineAdapter`],
//! evicting the least recently used entry at capacity. Eviction only drops
//! the cache's handle; requests already holding the adapter keep it alive.

use crate::base::neterror::NetError;
use crate::cookies::{same_store, CookieStore};
use crate::engine::{EngineAdapter, EngineConfig, EngineFactory};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

struct CacheEntry {
    adapter: EngineAdapter,
    cookie_store: Option<Arc<dyn CookieStore>>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Least recently used first.
    order: VecDeque<String>,
}

impl CacheState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }
}

pub struct ClientCache {
    factory: Arc<dyn EngineFactory>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

impl ClientCache {
    /// A capacity of zero is treated as one.
    pub fn new(factory: Arc<dyn EngineFactory>, capacity: usize) -> Self {
        Self {
            factory,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adapter for `config`. A cached entry is reused when no cookie store
    /// is requested or when it was created for this very store.
    pub fn get_client(
        &self,
        config: &EngineConfig,
        cookie_store: Option<&Arc<dyn CookieStore>>,
    ) -> Result<EngineAdapter, NetError> {
        let key = config.fingerprint();
        let mut state = self.lock();

        let reusable = state.entries.get(&key).and_then(|entry| {
            let store_ok = match (cookie_store, &entry.cookie_store) {
                (None, _) => true,
                (Some(wanted), Some(cached)) => same_store(wanted, cached),
                (Some(_), None) => false,
            };
            store_ok.then(|| entry.adapter.clone())
        });

        if let Some(adapter) = reusable {
            tracing::debug!(entries = state.entries.len(), "engine cache hit");
            state.touch(&key);
            return Ok(adapter);
        }

        let adapter = EngineAdapter::new(self.factory.create(config)?);
        let entry = CacheEntry {
            adapter: adapter.clone(),
            cookie_store: cookie_store.cloned(),
        };

        if state.entries.insert(key.clone(), entry).is_some() {
            tracing::debug!("engine cache entry replaced for a different cookie store");
            state.touch(&key);
        } else {
            tracing::debug!(entries = state.entries.len(), "engine cache miss");
            state.order.push_back(key);
            while state.entries.len() > self.capacity {
                match state.order.pop_front() {
                    Some(evicted) => {
                        state.entries.remove(&evicted);
                        tracing::debug!(capacity = self.capacity, "engine cache evicted least recently used entry");
                    }
                    None => break,
                }
            }
        }

        Ok(adapter)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every cached engine.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.order.clear();
    }
}
