//! Per-category availability aggregates.
//!
//! Counts are computed lazily over a category's whole subtree and kept in a
//! side table keyed by category path. Every descendant category visited by a
//! pass gets its own snapshot, and the pass publishes all of them in a single
//! table swap, so readers see either the previous table or the new one.
//!
//! Invalidation is an epoch counter. A snapshot is fresh while its epoch
//! equals the current epoch; [`AggregateCache::mark_counts_stale`] bumps the
//! epoch. Only one recomputation runs at a time; callers that arrive while a
//! pass is in flight get the last snapshot when one exists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, TryLockError};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::adapters::AvailabilityOracle;
use crate::domain::{AggregateCounts, Category, Node};

/// Counts for one category, tagged with the epoch they were computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub counts: AggregateCounts,
    pub epoch: u64,
}

type SnapshotTable = HashMap<String, Snapshot>;

/// Lazily computed, epoch-invalidated subtree counts
pub struct AggregateCache {
    oracle: Arc<dyn AvailabilityOracle>,

    /// Current invalidation epoch
    epoch: AtomicU64,

    /// Epoch observed by the last pass that completed
    completed_epoch: AtomicU64,

    /// Number of completed recomputation passes
    passes: AtomicU64,

    table: RwLock<Arc<SnapshotTable>>,

    /// Held for the duration of a recomputation pass
    recompute: Mutex<()>,
}

impl AggregateCache {
    pub fn new(oracle: Arc<dyn AvailabilityOracle>) -> Self {
        Self {
            oracle,
            epoch: AtomicU64::new(0),
            completed_epoch: AtomicU64::new(0),
            passes: AtomicU64::new(0),
            table: RwLock::new(Arc::new(SnapshotTable::new())),
            recompute: Mutex::new(()),
        }
    }

    /// Counts for `category`, recomputing if missing or stale
    ///
    /// Never fails: when the oracle errors, the last snapshot (or zero counts)
    /// is returned instead.
    pub fn get_counts(&self, category: &Category) -> AggregateCounts {
        let previous = self.snapshot(category);
        if let Some(snapshot) = previous {
            if snapshot.epoch == self.current_epoch() {
                debug!(category = %category.path, "Aggregate cache hit");
                return snapshot.counts;
            }
        }

        let _guard = match self.recompute.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => match previous {
                Some(snapshot) => {
                    debug!(category = %category.path, "Recompute in flight, serving previous counts");
                    return snapshot.counts;
                }
                None => self.wait_for_pass(),
            },
        };

        // The pass we waited on (or a racing one) may already cover us
        let epoch = self.current_epoch();
        if let Some(snapshot) = self.snapshot(category) {
            if snapshot.epoch == epoch {
                return snapshot.counts;
            }
        }

        match self.recompute_subtree(category, epoch) {
            Ok(counts) => counts,
            Err(e) => {
                warn!(category = %category.path, error = %e, "Failed to recompute counts, serving last known");
                previous.map(|s| s.counts).unwrap_or_default()
            }
        }
    }

    /// Invalidate every snapshot; the next read of each category recomputes
    pub fn mark_counts_stale(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        info!(epoch, "Content changed, aggregate counts marked stale");
    }

    /// Whether content changed since the last completed recomputation
    pub fn needs_update(&self) -> bool {
        self.completed_epoch.load(Ordering::Acquire) < self.current_epoch()
    }

    /// The stored snapshot for `category`, fresh or not
    pub fn snapshot(&self, category: &Category) -> Option<Snapshot> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner).clone();
        table.get(&category.path).copied()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Number of recomputation passes that have completed
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Acquire)
    }

    fn wait_for_pass(&self) -> MutexGuard<'_, ()> {
        debug!("Waiting for in-flight aggregate recompute");
        self.recompute.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn recompute_subtree(&self, category: &Category, epoch: u64) -> Result<AggregateCounts> {
        let mut computed = HashMap::new();
        let counts = self.count_category(category, &mut computed)?;
        let visited = computed.len();

        {
            let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
            let mut next = SnapshotTable::clone(&table);
            next.extend(
                computed
                    .into_iter()
                    .map(|(path, counts)| (path, Snapshot { counts, epoch })),
            );
            *table = Arc::new(next);
        }

        self.completed_epoch.fetch_max(epoch, Ordering::AcqRel);
        self.passes.fetch_add(1, Ordering::AcqRel);
        info!(category = %category.path, %counts, visited, epoch, "Recomputed aggregate counts");

        Ok(counts)
    }

    fn count_category(
        &self,
        category: &Category,
        out: &mut HashMap<String, AggregateCounts>,
    ) -> Result<AggregateCounts> {
        let mut total = AggregateCounts::default();

        for child in &category.children {
            match child {
                Node::Category(sub) => total += self.count_category(sub, out)?,
                Node::Video(video) => {
                    let available = self.oracle.is_persisted_available(&video.id)?;
                    total += AggregateCounts::video(available);
                }
                Node::Exercise(_) => {}
            }
        }

        out.insert(category.path.clone(), total);
        Ok(total)
    }
}

impl std::fmt::Debug for AggregateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateCache")
            .field("epoch", &self.current_epoch())
            .field("passes", &self.passes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::Catalog;
    use std::collections::HashSet;

    struct FixedOracle(HashSet<&'static str>);

    impl AvailabilityOracle for FixedOracle {
        fn is_physically_present(&self, video_id: &str) -> Result<bool> {
            Ok(self.0.contains(video_id))
        }

        fn is_persisted_available(&self, video_id: &str) -> Result<bool> {
            Ok(self.0.contains(video_id))
        }
    }

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{"kind": "Topic", "id": "root", "title": "Root", "children": [
                {"kind": "Topic", "id": "math", "title": "Math", "children": [
                    {"kind": "Topic", "id": "arithmetic", "title": "Arithmetic", "children": [
                        {"kind": "Video", "id": "add-sub", "title": "Add"},
                        {"kind": "Video", "id": "mul-div", "title": "Mul"},
                        {"kind": "Exercise", "id": "addition_1", "title": "Addition"}
                    ]},
                    {"kind": "Video", "id": "overview", "title": "Overview"}
                ]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_counts_whole_subtree() {
        let catalog = catalog();
        let cache = AggregateCache::new(Arc::new(FixedOracle(["add-sub", "overview"].into())));

        let counts = cache.get_counts(catalog.category("math").unwrap());
        assert_eq!(counts, AggregateCounts::new(2, 3));
    }

    #[test]
    fn test_descendants_get_snapshots_from_one_pass() {
        let catalog = catalog();
        let cache = AggregateCache::new(Arc::new(FixedOracle(["add-sub"].into())));

        cache.get_counts(catalog.root());
        assert_eq!(cache.passes(), 1);

        let arithmetic = catalog.category("arithmetic").unwrap();
        assert_eq!(
            cache.snapshot(arithmetic).map(|s| s.counts),
            Some(AggregateCounts::new(1, 2))
        );

        // Served from the snapshot written by the root pass
        assert_eq!(cache.get_counts(arithmetic), AggregateCounts::new(1, 2));
        assert_eq!(cache.passes(), 1);
    }

    #[test]
    fn test_needs_update_tracks_epochs() {
        let catalog = catalog();
        let cache = AggregateCache::new(Arc::new(FixedOracle(HashSet::new())));

        assert!(!cache.needs_update());
        cache.mark_counts_stale();
        assert!(cache.needs_update());

        cache.get_counts(catalog.root());
        assert!(!cache.needs_update());
        assert_eq!(cache.snapshot(catalog.root()).unwrap().epoch, 1);
    }
}
