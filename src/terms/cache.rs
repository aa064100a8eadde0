//! Per-scope cache of term indexes.
//!
//! Each scope owns an independent slot: scope A's rebuild never blocks a
//! read of scope B. Within a slot, builds are single-flight, so concurrent
//! cold reads share one store query and observe the same `Arc<TermIndex>`.
//!
//! Every slot carries a generation counter. `invalidate` bumps it, and a
//! build only publishes its index if the generation it started under is
//! still current. A build racing a mutation therefore cannot put pre-mutation
//! data back into the cache.

use crate::store::{DictionaryStore, Scope, StoreError};
use crate::terms::index::TermIndex;
use crate::terms::metrics::CacheMetrics;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default time-to-live of a cached index.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("term index build for {scope} did not complete: {reason}")]
    BuildAborted { scope: Scope, reason: String },
}

#[derive(Default)]
struct SlotState {
    index: Option<Arc<TermIndex>>,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
    build_lock: Arc<tokio::sync::Mutex<()>>,
}

pub struct TermCache {
    store: Arc<dyn DictionaryStore>,
    ttl: Duration,
    slots: RwLock<HashMap<Scope, Arc<Slot>>>,
    metrics: Arc<CacheMetrics>,
}

impl TermCache {
    pub fn new(store: Arc<dyn DictionaryStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            slots: RwLock::new(HashMap::new()),
            metrics: Arc::new(CacheMetrics::new()),
        }
    }

    pub fn with_default_ttl(store: Arc<dyn DictionaryStore>) -> Self {
        Self::new(store, DEFAULT_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Return a usable index for `scope`, building it if absent or expired.
    ///
    /// Store failures propagate; an expired index is never served in place
    /// of a failed rebuild. The build runs on its own task, so dropping this
    /// future does not abort the store read and the finished index is still
    /// cached for later callers.
    pub async fn get(&self, scope: &Scope) -> Result<Arc<TermIndex>, CacheError> {
        let slot = self.slot(scope);

        if let Some(index) = self.fresh_index(&slot) {
            self.metrics.record_hit();
            return Ok(index);
        }
        self.metrics.record_miss();

        let build_guard = Arc::clone(&slot.build_lock).lock_owned().await;

        // Another caller may have finished a build while we waited
        if let Some(index) = self.fresh_index(&slot) {
            return Ok(index);
        }

        let generation = slot.state.lock().generation;
        let store = Arc::clone(&self.store);
        let metrics = Arc::clone(&self.metrics);
        let build_slot = Arc::clone(&slot);
        let build_scope = scope.clone();

        let build = tokio::spawn(async move {
            let _build_guard = build_guard;

            let rows = match store.load_rows(&build_scope).await {
                Ok(rows) => rows,
                Err(e) => {
                    metrics.record_build_failure();
                    warn!("Failed to load dictionary for {}: {}", build_scope, e);
                    return Err(e);
                }
            };

            let index = Arc::new(TermIndex::build(rows));
            metrics.record_build();

            let mut state = build_slot.state.lock();
            if state.generation == generation {
                state.index = Some(Arc::clone(&index));
                debug!(
                    "Cached term index for {} ({} terms, {} groups)",
                    build_scope,
                    index.term_count(),
                    index.group_count()
                );
            } else {
                metrics.record_stale_build();
                debug!(
                    "Discarding term index for {}: invalidated during build",
                    build_scope
                );
            }

            Ok(index)
        });

        match build.await {
            Ok(result) => result.map_err(CacheError::from),
            Err(e) => Err(CacheError::BuildAborted {
                scope: scope.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Drop any cached index for `scope` so the next `get` rebuilds it.
    ///
    /// Builds already in flight for the scope still answer their own callers
    /// but will not be cached.
    pub fn invalidate(&self, scope: &Scope) {
        let slot = self.slots.read().get(scope).cloned();
        if let Some(slot) = slot {
            let mut state = slot.state.lock();
            state.generation += 1;
            state.index = None;
        }
        self.metrics.record_invalidation();
        debug!("Invalidated term index for {}", scope);
    }

    /// Remove expired indexes, and forget idle scopes with nothing cached.
    ///
    /// Returns the number of indexes evicted.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots.write();
        let mut evicted = 0;

        slots.retain(|_, slot| {
            let mut state = slot.state.lock();
            if state
                .index
                .as_ref()
                .is_some_and(|index| self.is_expired(index, now))
            {
                state.index = None;
                evicted += 1;
            }
            // Only the map holds an idle slot; anything else is an in-flight get
            state.index.is_some() || Arc::strong_count(slot) > 1
        });

        if evicted > 0 {
            info!("Evicted {} expired term index(es)", evicted);
        }
        self.metrics.record_evictions(evicted);
        evicted
    }

    /// Number of scopes with a cached (possibly expired) index.
    pub fn cached_scopes(&self) -> usize {
        self.slots
            .read()
            .values()
            .filter(|slot| slot.state.lock().index.is_some())
            .count()
    }

    fn slot(&self, scope: &Scope) -> Arc<Slot> {
        if let Some(slot) = self.slots.read().get(scope) {
            return Arc::clone(slot);
        }
        Arc::clone(self.slots.write().entry(scope.clone()).or_default())
    }

    fn fresh_index(&self, slot: &Slot) -> Option<Arc<TermIndex>> {
        let now = Instant::now();
        slot.state
            .lock()
            .index
            .as_ref()
            .filter(|index| !self.is_expired(index, now))
            .cloned()
    }

    fn is_expired(&self, index: &TermIndex, now: Instant) -> bool {
        now.saturating_duration_since(index.built_at()) >= self.ttl
    }
}
