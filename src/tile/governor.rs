//! Memory governor for materialized tiles.
//!
//! Enforces a byte budget over the tile store. When usage exceeds the budget,
//! loaded tiles outside the visible cell range are unloaded oldest-first
//! until usage falls to 80% of the budget.
//!
//! Tiles inside the visible range are never evicted. If everything loaded is
//! visible the store stays over budget until the viewport moves.

use serde::Serialize;
use tracing::{debug, warn};

use super::grid::{CellRange, TileKey};
use super::store::TileStore;

/// Default memory budget: 256MB
pub const DEFAULT_MAX_MEMORY: usize = 256 * 1024 * 1024;

// =============================================================================
// Memory Stats
// =============================================================================

/// Snapshot of tile memory usage against the budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryStats {
    /// Bytes held by loaded tiles
    pub used: usize,

    /// Budget in bytes
    pub max: usize,

    /// `used / max * 100`
    pub percentage: f64,
}

impl MemoryStats {
    pub fn new(used: usize, max: usize) -> Self {
        let percentage = if max == 0 {
            0.0
        } else {
            used as f64 / max as f64 * 100.0
        };
        Self {
            used,
            max,
            percentage,
        }
    }
}

/// What a governor pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Tiles unloaded, oldest first
    pub evicted: Vec<TileKey>,

    /// Bytes returned to the budget
    pub freed: usize,

    /// Memory usage after the pass
    pub remaining: usize,
}

// =============================================================================
// Memory Governor
// =============================================================================

/// Byte-budget eviction policy over a [`TileStore`].
#[derive(Debug, Clone, Copy)]
pub struct MemoryGovernor {
    max_memory: usize,
}

impl MemoryGovernor {
    pub fn new(max_memory: usize) -> Self {
        Self { max_memory }
    }

    /// Budget in bytes.
    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    /// Usage eviction stops at once triggered: 80% of the budget.
    pub fn target(&self) -> usize {
        self.max_memory - self.max_memory / 5
    }

    pub fn stats(&self, store: &TileStore) -> MemoryStats {
        MemoryStats::new(store.memory_usage(), self.max_memory)
    }

    /// Bring `store` back under budget.
    ///
    /// No-op while usage is within budget. Otherwise evicts loaded tiles not
    /// in `visible`, least recently used first, until usage is at most the
    /// 80% target or no candidates remain. Evicted tiles farther than
    /// `max_distance` from `origin` lose their record as well.
    pub fn enforce(
        &self,
        store: &mut TileStore,
        visible: &CellRange,
        origin: (i64, i64),
        max_distance: u64,
    ) -> EvictionReport {
        if store.memory_usage() <= self.max_memory {
            return EvictionReport {
                remaining: store.memory_usage(),
                ..EvictionReport::default()
            };
        }

        let mut candidates: Vec<_> = store
            .iter()
            .filter(|tile| tile.is_loaded() && !visible.contains(tile.key))
            .map(|tile| (tile.last_used, tile.key))
            .collect();
        candidates.sort_unstable();

        let target = self.target();
        let mut report = EvictionReport::default();

        for (_, key) in candidates {
            if store.memory_usage() <= target {
                break;
            }
            report.freed += store.unload(key, origin, max_distance);
            report.evicted.push(key);
        }
        report.remaining = store.memory_usage();

        debug!(
            evicted = report.evicted.len(),
            freed = report.freed,
            remaining = report.remaining,
            target = target,
            "Memory governor pass"
        );

        if report.remaining > self.max_memory {
            warn!(
                used = report.remaining,
                max = self.max_memory,
                "Visible tiles exceed memory budget; nothing left to evict"
            );
        }

        report
    }
}

impl Default for MemoryGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MEMORY)
    }
}

// =============================================================================
// Tests
// =============================================================================
