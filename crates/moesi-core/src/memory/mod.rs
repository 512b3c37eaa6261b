//! Flat main memory shared by every cache in a system.

/// Range, width, and alignment policy for sized accesses.
pub mod access;

pub use access::{validate_alignment, validate_block_span, validate_range, AccessWidth};

use crate::{AccessFault, MemoryStats};

/// Flat zero-initialised byte store addressed by `address_bits`-wide addresses.
///
/// Block reads and writes go through [`MainMemory::read_block`] and
/// [`MainMemory::write_block`], which are counted in [`MemoryStats`].
/// [`MainMemory::peek`] and [`MainMemory::load`] bypass the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainMemory {
    bytes: Box<[u8]>,
    block_size: u32,
    stats: MemoryStats,
}

impl MainMemory {
    /// Allocates `2^address_bits` zeroed bytes split into `block_size` blocks.
    #[must_use]
    pub fn new(address_bits: u8, block_size: u32) -> Self {
        Self {
            bytes: vec![0; 1_usize << address_bits].into_boxed_slice(),
            block_size,
            stats: MemoryStats::default(),
        }
    }

    /// Size of the store in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Transfer granularity in bytes.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Returns `true` when every byte of `address..address + size` exists.
    #[must_use]
    pub fn contains_range(&self, address: u32, size: u32) -> bool {
        u64::from(address) + u64::from(size) <= self.size()
    }

    /// Fetches the whole block containing `address`.
    pub fn read_block(&mut self, address: u32) -> Vec<u8> {
        let range = self.block_range(address);
        self.stats.block_reads = self.stats.block_reads.saturating_add(1);
        self.bytes[range].to_vec()
    }

    /// Writes back a whole block to the block containing `address`.
    pub fn write_block(&mut self, address: u32, block: &[u8]) {
        let range = self.block_range(address);
        self.stats.block_writes = self.stats.block_writes.saturating_add(1);
        self.bytes[range].copy_from_slice(block);
    }

    /// Uncounted view of `len` bytes at `address`, if in range.
    #[must_use]
    pub fn peek(&self, address: u32, len: usize) -> Option<&[u8]> {
        let start = address as usize;
        self.bytes.get(start..start.checked_add(len)?)
    }

    /// Uncounted preload of `data` at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`AccessFault::InvalidAddress`] when the range does not fit.
    pub fn load(&mut self, address: u32, data: &[u8]) -> Result<(), AccessFault> {
        let start = address as usize;
        let fault = || AccessFault::InvalidAddress {
            address,
            size: u32::try_from(data.len()).unwrap_or(u32::MAX),
        };
        let end = start.checked_add(data.len()).ok_or_else(fault)?;
        self.bytes
            .get_mut(start..end)
            .ok_or_else(fault)?
            .copy_from_slice(data);
        Ok(())
    }

    /// Block traffic observed so far.
    #[must_use]
    pub const fn stats(&self) -> MemoryStats {
        self.stats
    }

    /// Clears the block traffic counters.
    pub fn reset_stats(&mut self) {
        self.stats = MemoryStats::default();
    }

    fn block_range(&self, address: u32) -> std::ops::Range<usize> {
        let base = (address & !(self.block_size - 1)) as usize;
        base..base + self.block_size as usize
    }
}
