//! Core simulator crate for a MOESI snooping cache hierarchy.

/// Flat main memory and sized-access validation policy.
pub mod memory;
pub use memory::{
    validate_alignment, validate_block_span, validate_range, AccessWidth, MainMemory,
};

/// Bit-addressable packed storage.
pub mod bits;
pub use bits::BitBuffer;

/// Cache geometry and tag/index/offset decomposition.
pub mod geometry;
pub use geometry::{CacheGeometry, MAX_ADDRESS_BITS};

/// Processor identifiers and the MOESI state enumeration.
pub mod state;
pub use state::{CacheId, MoesiState};

/// Access faults, configuration errors, and invariant violations.
pub mod fault;
pub use fault::{AccessFault, ConfigError, FaultClass, InvariantViolation};

/// Hit-rate and memory-traffic counters.
pub mod telemetry;
pub use telemetry::{HitStats, MemoryStats};

/// Presence directory of block holders.
pub mod snooper;
pub use snooper::Snooper;

/// Per-cache set-associative storage engine.
pub mod cache;
pub use cache::{Cache, EvictionCandidate};

/// System configuration and the cache system that owns all state.
pub mod system;
pub use system::{
    CacheConfig, CacheNode, CacheSystem, SystemConfig, DEFAULT_ADDRESS_BITS, DEFAULT_BLOCK_SIZE,
    DEFAULT_INDEX_BITS, DEFAULT_LINE_COUNT,
};

/// MOESI read and write protocols and the invariant audit.
pub mod coherence;

/// Byte, half-word, word, and double-word entry points.
pub mod sized;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
