use thiserror::Error;

use crate::{CacheId, MoesiState};

/// Failure classes used for reporting and exit-code policy in hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// The request named a processor that has no cache in the system.
    Routing,
    /// The request's address range or alignment was rejected.
    Address,
}

/// Request-level failures reported by the engine and the sized entry points.
///
/// Every fault is detected before the request mutates any cache, snooper,
/// or memory state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessFault {
    /// No cache with this ID is attached to the system.
    #[error("unknown cache id {0}")]
    UnknownCache(CacheId),
    /// The byte range `address..address + size` falls outside main memory.
    #[error("address range {address:#x}+{size} is outside main memory")]
    InvalidAddress {
        /// First byte of the rejected access.
        address: u32,
        /// Access width in bytes.
        size: u32,
    },
    /// The access is not naturally aligned or would straddle two blocks.
    #[error("access of {width} bytes at {address:#x} is misaligned")]
    Misaligned {
        /// First byte of the rejected access.
        address: u32,
        /// Access width in bytes.
        width: u32,
    },
}

impl AccessFault {
    /// Returns the reporting class for this fault.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnknownCache(_) => FaultClass::Routing,
            Self::InvalidAddress { .. } | Self::Misaligned { .. } => FaultClass::Address,
        }
    }
}

/// Rejected system configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// A system needs at least one cache.
    #[error("a cache system needs at least one cache")]
    NoCaches,
    /// Two caches were configured with the same processor ID.
    #[error("cache id {0} is configured more than once")]
    DuplicateCacheId(CacheId),
    /// Block sizes must be a non-zero power of two.
    #[error("block size {0} is not a power of two")]
    BlockSizeNotPowerOfTwo(u32),
    /// Address width must be within the supported flat-memory range.
    #[error("address width of {0} bits is outside 1..=24")]
    AddressBitsOutOfRange(u8),
    /// Index and offset fields do not fit in the address.
    #[error("cache {id}: {index_bits} index bits and {offset_bits} offset bits exceed {address_bits} address bits")]
    FieldsExceedAddress {
        /// Cache whose geometry was rejected.
        id: CacheId,
        /// Configured index bits.
        index_bits: u8,
        /// Offset bits implied by the block size.
        offset_bits: u8,
        /// Configured address width.
        address_bits: u8,
    },
    /// Line count must be a positive multiple of the set count.
    #[error("cache {id}: {line_count} lines cannot be split into {sets} sets")]
    UnevenSets {
        /// Cache whose geometry was rejected.
        id: CacheId,
        /// Configured line count.
        line_count: u32,
        /// Set count implied by the index bits.
        sets: u32,
    },
}

/// Coherence or bookkeeping invariants found broken by [`crate::CacheSystem::audit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum InvariantViolation {
    /// More than one cache holds the block in Modified or Exclusive.
    #[error("block {block:#x} is held exclusively by {first} and {second}")]
    MultipleExclusiveHolders {
        /// Block address.
        block: u32,
        /// One exclusive holder.
        first: CacheId,
        /// Another exclusive holder.
        second: CacheId,
    },
    /// An Owned copy coexists with a holder that is not Shared.
    #[error("block {block:#x} is Owned by {owner} while {other} holds it {state:?}")]
    OwnedWithNonShared {
        /// Block address.
        block: u32,
        /// Cache holding the Owned copy.
        owner: CacheId,
        /// Offending peer.
        other: CacheId,
        /// The peer's state.
        state: MoesiState,
    },
    /// The snooper lists a cache that does not hold the block.
    #[error("snooper lists {id} for block {block:#x} but the cache does not hold it")]
    StaleSnooperEntry {
        /// Block address.
        block: u32,
        /// Listed cache.
        id: CacheId,
    },
    /// A cache holds a block the snooper does not list it for.
    #[error("cache {id} holds block {block:#x} without a snooper entry")]
    UntrackedLine {
        /// Block address.
        block: u32,
        /// Holding cache.
        id: CacheId,
    },
    /// LRU ranks of a set are not a permutation of `0..ways`.
    #[error("cache {id}: LRU ranks of set {set} are not dense")]
    SparseLruRanks {
        /// Cache whose set is broken.
        id: CacheId,
        /// Set index.
        set: u32,
    },
}
