use crate::corpus::RawDocument;
use crate::error::{Result, SearchError};
use crate::index::{build_index, Index, IndexConfig};
use crate::search::{search, QuerySpec, ScoredResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Slot {
    generation: u64,
    index: Arc<Index>,
}

/// Shared slot holding the currently published index.
///
/// Readers clone the inner `Arc` and release the lock immediately, so a
/// query keeps working on its snapshot even if a rebuild swaps the slot
/// mid-flight. Writers only ever replace the whole `Arc`.
///
/// Every publish or rebuild draws a generation number when it starts. The
/// slot never moves back to a lower generation, so when rebuilds overlap the
/// one that started last stays live.
#[derive(Clone, Default)]
pub struct IndexHandle {
    current: Arc<RwLock<Option<Slot>>>,
    generations: Arc<AtomicU64>,
}

impl IndexHandle {
    pub fn new() -> Self { Self::default() }

    pub fn with_index(index: Index) -> Self {
        let handle = Self::new();
        handle.publish(index);
        handle
    }

    /// Swap in `index` and return whatever is live afterwards.
    pub fn publish(&self, index: Index) -> Arc<Index> {
        let generation = self.next_generation();
        self.install(generation, Arc::new(index))
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn install(&self, generation: u64, next: Arc<Index>) -> Arc<Index> {
        let mut slot = self.current.write();
        if let Some(live) = slot.as_ref() {
            if live.generation > generation {
                tracing::info!(generation, live = live.generation, "discarding superseded index build");
                return live.index.clone();
            }
        }
        let replaced = slot.replace(Slot { generation, index: next.clone() }).is_some();
        tracing::info!(num_docs = next.num_docs(), generation, replaced, "published index");
        next
    }

    pub fn snapshot(&self) -> Option<Arc<Index>> {
        self.current.read().as_ref().map(|slot| slot.index.clone())
    }

    pub fn is_ready(&self) -> bool { self.current.read().is_some() }

    pub fn search(&self, spec: &QuerySpec) -> Result<Vec<ScoredResult>> {
        let index = self.snapshot().ok_or(SearchError::IndexNotReady)?;
        search(&index, spec)
    }

    /// Build a fresh index off to the side and publish it only if the build
    /// succeeds. On failure the previous index stays live. Returns the live
    /// index, which is a newer one if another rebuild started later and
    /// already landed.
    pub fn rebuild(&self, raws: Vec<RawDocument>, config: &IndexConfig) -> Result<Arc<Index>> {
        let generation = self.next_generation();
        match build_index(raws, config) {
            Ok(index) => Ok(self.install(generation, Arc::new(index))),
            Err(e) => {
                tracing::warn!(error = %e, generation, kept_previous = self.is_ready(), "index rebuild failed");
                Err(e)
            }
        }
    }
}
