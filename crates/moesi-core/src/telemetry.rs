//! Hit-rate and memory-traffic counters.

/// Per-cache access and hit counters.
///
/// Counters saturate instead of wrapping so that very long traces degrade to
/// a pinned value rather than a misleading small one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct HitStats {
    accesses: u64,
    hits: u64,
}

impl HitStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one access routed to this cache.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_access(&mut self) {
        self.accesses = self.accesses.saturating_add(1);
    }

    /// Records that the destination lookup of an access hit.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    /// Total recorded accesses.
    #[must_use]
    pub const fn accesses(&self) -> u64 {
        self.accesses
    }

    /// Total recorded hits.
    #[must_use]
    pub const fn hits(&self) -> u64 {
        self.hits
    }

    /// Accesses that were not hits.
    #[must_use]
    pub const fn misses(&self) -> u64 {
        self.accesses.saturating_sub(self.hits)
    }

    /// Fraction of accesses that hit, or `None` before the first access.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> Option<f64> {
        if self.accesses == 0 {
            None
        } else {
            Some(self.hits as f64 / self.accesses as f64)
        }
    }

    /// Clears both counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Main-memory block traffic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MemoryStats {
    /// Blocks fetched from memory on system-wide misses.
    pub block_reads: u64,
    /// Dirty blocks written back to memory.
    pub block_writes: u64,
}

impl MemoryStats {
    /// Total blocks moved in either direction.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.block_reads.saturating_add(self.block_writes)
    }
}
