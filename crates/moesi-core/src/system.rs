//! Cache-system configuration and ownership of all shared simulator state.

use std::collections::HashMap;

use crate::{
    AccessFault, Cache, CacheGeometry, CacheId, ConfigError, HitStats, MainMemory, MoesiState,
    Snooper,
};

/// Default address width: a 64 KiB flat memory.
pub const DEFAULT_ADDRESS_BITS: u8 = 16;

/// Default system-wide block size in bytes.
pub const DEFAULT_BLOCK_SIZE: u32 = 4;

/// Default lines per cache.
pub const DEFAULT_LINE_COUNT: u32 = 8;

/// Default index width per cache (4 sets).
pub const DEFAULT_INDEX_BITS: u8 = 2;

/// Shape of one processor's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CacheConfig {
    /// Processor ID that routes accesses to this cache.
    pub id: CacheId,
    /// Total number of lines; must be a multiple of `2^index_bits`.
    pub line_count: u32,
    /// Width of the index field; the cache has `2^index_bits` sets.
    pub index_bits: u8,
}

impl CacheConfig {
    /// Cache with the default line count and index width.
    #[must_use]
    pub const fn with_id(id: CacheId) -> Self {
        Self {
            id,
            line_count: DEFAULT_LINE_COUNT,
            index_bits: DEFAULT_INDEX_BITS,
        }
    }
}

/// Top-level immutable configuration of a cache system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SystemConfig {
    /// Address width in bits; main memory holds `2^address_bits` bytes.
    pub address_bits: u8,
    /// Block size in bytes shared by memory, snooper, and every cache.
    pub block_size: u32,
    /// Caches in processor order.
    pub caches: Vec<CacheConfig>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::uniform(2, DEFAULT_LINE_COUNT, DEFAULT_INDEX_BITS)
    }
}

impl SystemConfig {
    /// `cache_count` identical caches with IDs `0..cache_count` and default
    /// address width and block size.
    #[must_use]
    pub fn uniform(cache_count: u8, line_count: u32, index_bits: u8) -> Self {
        Self {
            address_bits: DEFAULT_ADDRESS_BITS,
            block_size: DEFAULT_BLOCK_SIZE,
            caches: (0..cache_count)
                .map(|id| CacheConfig {
                    id: CacheId(id),
                    line_count,
                    index_bits,
                })
                .collect(),
        }
    }
}

/// A processor ID paired with the cache it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNode {
    pub(crate) id: CacheId,
    pub(crate) cache: Cache,
}

impl CacheNode {
    /// Processor ID.
    #[must_use]
    pub const fn id(&self) -> CacheId {
        self.id
    }

    /// The processor's cache.
    #[must_use]
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }
}

/// Every cache, the snooper, and main memory of one simulated machine.
///
/// All operations take `&mut self` and run to completion; callers that share
/// a system between threads must serialise access themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSystem {
    pub(crate) nodes: Vec<CacheNode>,
    pub(crate) handles: HashMap<CacheId, usize>,
    pub(crate) snooper: Snooper,
    pub(crate) memory: MainMemory,
    pub(crate) block_size: u32,
}

impl Default for CacheSystem {
    fn default() -> Self {
        let config = SystemConfig::default();
        let nodes = config
            .caches
            .iter()
            .map(|cache| CacheNode {
                id: cache.id,
                cache: Cache::new(
                    CacheGeometry::new(cache, config.address_bits, config.block_size)
                        .unwrap_or_else(|_| unreachable!("default geometry is valid")),
                ),
            })
            .collect::<Vec<_>>();
        Self::assemble(nodes, config.address_bits, config.block_size)
    }
}

impl CacheSystem {
    /// Builds a system with every cache empty and memory zeroed.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an empty cache list, a repeated ID, or
    /// any geometry the address width and block size cannot support.
    pub fn new(config: &SystemConfig) -> Result<Self, ConfigError> {
        if config.caches.is_empty() {
            return Err(ConfigError::NoCaches);
        }
        let mut nodes = Vec::with_capacity(config.caches.len());
        for cache in &config.caches {
            if nodes.iter().any(|node: &CacheNode| node.id == cache.id) {
                return Err(ConfigError::DuplicateCacheId(cache.id));
            }
            let geometry = CacheGeometry::new(cache, config.address_bits, config.block_size)?;
            nodes.push(CacheNode {
                id: cache.id,
                cache: Cache::new(geometry),
            });
        }
        Ok(Self::assemble(nodes, config.address_bits, config.block_size))
    }

    fn assemble(nodes: Vec<CacheNode>, address_bits: u8, block_size: u32) -> Self {
        let handles = nodes
            .iter()
            .enumerate()
            .map(|(handle, node)| (node.id, handle))
            .collect();
        Self {
            nodes,
            handles,
            snooper: Snooper::new(block_size),
            memory: MainMemory::new(address_bits, block_size),
            block_size,
        }
    }

    /// System-wide block size in bytes.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Caches in configuration order.
    #[must_use]
    pub fn nodes(&self) -> &[CacheNode] {
        &self.nodes
    }

    /// Processor IDs in configuration order.
    pub fn ids(&self) -> impl Iterator<Item = CacheId> + '_ {
        self.nodes.iter().map(CacheNode::id)
    }

    /// The cache owned by `id`.
    #[must_use]
    pub fn cache(&self, id: CacheId) -> Option<&Cache> {
        self.handles.get(&id).map(|handle| &self.nodes[*handle].cache)
    }

    /// Hit-rate counters of the cache owned by `id`.
    #[must_use]
    pub fn stats(&self, id: CacheId) -> Option<HitStats> {
        self.cache(id).map(Cache::stats)
    }

    /// The presence directory.
    #[must_use]
    pub const fn snooper(&self) -> &Snooper {
        &self.snooper
    }

    /// Main memory.
    #[must_use]
    pub const fn memory(&self) -> &MainMemory {
        &self.memory
    }

    /// Main memory, for preloading images before a run.
    #[allow(clippy::missing_const_for_fn)]
    pub fn memory_mut(&mut self) -> &mut MainMemory {
        &mut self.memory
    }

    /// Every cache's state for the block containing `address`, in
    /// configuration order, omitting caches that do not hold it.
    #[must_use]
    pub fn holders(&self, address: u32) -> Vec<(CacheId, MoesiState)> {
        self.nodes
            .iter()
            .map(|node| (node.id, node.cache.state_of(address)))
            .filter(|(_, state)| state.is_valid())
            .collect()
    }

    /// Clears every cache's hit counters and the memory traffic counters.
    pub fn reset_stats(&mut self) {
        for node in &mut self.nodes {
            node.cache.stats_mut().reset();
        }
        self.memory.reset_stats();
    }

    pub(crate) fn handle(&self, id: CacheId) -> Result<usize, AccessFault> {
        self.handles
            .get(&id)
            .copied()
            .ok_or(AccessFault::UnknownCache(id))
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheConfig, CacheSystem, SystemConfig, DEFAULT_BLOCK_SIZE};
    use crate::{AccessFault, CacheId, ConfigError};

    #[test]
    fn default_system_has_two_empty_caches() {
        let system = CacheSystem::default();
        assert_eq!(system.ids().collect::<Vec<_>>(), [CacheId(0), CacheId(1)]);
        assert_eq!(system.block_size(), DEFAULT_BLOCK_SIZE);
        assert!(system.snooper().is_empty());
        assert_eq!(system.memory().size(), 1 << 16);
        assert_eq!(system, CacheSystem::new(&SystemConfig::default()).expect("valid"));
    }

    #[test]
    fn ids_resolve_through_the_handle_map() {
        let config = SystemConfig {
            caches: vec![
                CacheConfig::with_id(CacheId(7)),
                CacheConfig::with_id(CacheId(3)),
            ],
            ..SystemConfig::default()
        };
        let system = CacheSystem::new(&config).expect("valid config");
        assert_eq!(system.handle(CacheId(3)), Ok(1));
        assert_eq!(
            system.handle(CacheId(4)),
            Err(AccessFault::UnknownCache(CacheId(4)))
        );
        assert!(system.cache(CacheId(7)).is_some());
        assert_eq!(system.stats(CacheId(9)), None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let config = SystemConfig {
            caches: vec![
                CacheConfig::with_id(CacheId(1)),
                CacheConfig::with_id(CacheId(1)),
            ],
            ..SystemConfig::default()
        };
        assert_eq!(
            CacheSystem::new(&config),
            Err(ConfigError::DuplicateCacheId(CacheId(1)))
        );
    }

    #[test]
    fn empty_cache_list_is_rejected() {
        let config = SystemConfig {
            caches: Vec::new(),
            ..SystemConfig::default()
        };
        assert_eq!(CacheSystem::new(&config), Err(ConfigError::NoCaches));
    }

    #[test]
    fn geometry_errors_propagate() {
        let config = SystemConfig {
            block_size: 12,
            ..SystemConfig::default()
        };
        assert_eq!(
            CacheSystem::new(&config),
            Err(ConfigError::BlockSizeNotPowerOfTwo(12))
        );
    }
}
