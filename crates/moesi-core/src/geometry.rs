//! Cache geometry and address decomposition.
//!
//! An address splits into `| tag | index | offset |` from most to least
//! significant bit. Lines are grouped by set: the lines of set `s` are
//! `s * ways .. (s + 1) * ways`.

use crate::{CacheConfig, CacheId, ConfigError};

/// Widest supported address, bounded by the flat main-memory allocation.
pub const MAX_ADDRESS_BITS: u8 = 24;

/// Resolved, validated shape of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheGeometry {
    address_bits: u8,
    index_bits: u8,
    offset_bits: u8,
    block_size: u32,
    line_count: u32,
}

impl CacheGeometry {
    /// Validates a cache configuration against the system-wide address width
    /// and block size.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the block size is not a power of two,
    /// the address width is unsupported, the index and offset fields do not
    /// fit the address, or the lines cannot be split evenly into sets.
    pub fn new(config: &CacheConfig, address_bits: u8, block_size: u32) -> Result<Self, ConfigError> {
        if !block_size.is_power_of_two() {
            return Err(ConfigError::BlockSizeNotPowerOfTwo(block_size));
        }
        if address_bits == 0 || address_bits > MAX_ADDRESS_BITS {
            return Err(ConfigError::AddressBitsOutOfRange(address_bits));
        }
        let offset_bits = log2(block_size);
        if u32::from(config.index_bits) + u32::from(offset_bits) > u32::from(address_bits) {
            return Err(ConfigError::FieldsExceedAddress {
                id: config.id,
                index_bits: config.index_bits,
                offset_bits,
                address_bits,
            });
        }
        let sets = 1_u32 << config.index_bits;
        if config.line_count == 0 || config.line_count % sets != 0 {
            return Err(ConfigError::UnevenSets {
                id: config.id,
                line_count: config.line_count,
                sets,
            });
        }
        Ok(Self {
            address_bits,
            index_bits: config.index_bits,
            offset_bits,
            block_size,
            line_count: config.line_count,
        })
    }

    /// Total address width in bits.
    #[must_use]
    pub const fn address_bits(&self) -> u8 {
        self.address_bits
    }

    /// Width of the index field.
    #[must_use]
    pub const fn index_bits(&self) -> u8 {
        self.index_bits
    }

    /// Width of the byte-offset field.
    #[must_use]
    pub const fn offset_bits(&self) -> u8 {
        self.offset_bits
    }

    /// Width of the tag field.
    #[must_use]
    pub const fn tag_bits(&self) -> u8 {
        self.address_bits - self.index_bits - self.offset_bits
    }

    /// Block size in bytes.
    #[must_use]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of lines in the cache.
    #[must_use]
    pub const fn line_count(&self) -> u32 {
        self.line_count
    }

    /// Number of sets (index classes).
    #[must_use]
    pub const fn sets(&self) -> u32 {
        1 << self.index_bits
    }

    /// Lines per set.
    #[must_use]
    pub const fn ways(&self) -> u32 {
        self.line_count >> self.index_bits
    }

    /// Tag field of `address`.
    #[must_use]
    pub const fn tag(&self, address: u32) -> u32 {
        address >> (self.index_bits + self.offset_bits)
    }

    /// Index field of `address`.
    #[must_use]
    pub const fn index(&self, address: u32) -> u32 {
        (address >> self.offset_bits) & (self.sets() - 1)
    }

    /// Byte offset of `address` within its block.
    #[must_use]
    pub const fn offset(&self, address: u32) -> u32 {
        address & (self.block_size - 1)
    }

    /// First byte of the block containing `address`.
    #[must_use]
    pub const fn block_base(&self, address: u32) -> u32 {
        address & !(self.block_size - 1)
    }

    /// Set that `line` belongs to.
    #[must_use]
    pub const fn line_set(&self, line: u32) -> u32 {
        line / self.ways()
    }

    /// Lines making up `set`.
    #[must_use]
    pub const fn set_lines(&self, set: u32) -> std::ops::Range<u32> {
        let ways = self.ways();
        set * ways..(set + 1) * ways
    }

    /// Rebuilds an address from a tag, the set of `line`, and a byte offset.
    #[must_use]
    pub const fn line_address(&self, tag: u32, line: u32, offset: u32) -> u32 {
        (tag << (self.index_bits + self.offset_bits))
            | (self.line_set(line) << self.offset_bits)
            | offset
    }

    /// Bits each line occupies in the packed store: tag followed by data.
    #[must_use]
    pub const fn bits_per_line(&self) -> usize {
        self.tag_bits() as usize + self.block_size as usize * 8
    }

    /// One-line summary of the split, attributed to cache `id`.
    #[must_use]
    pub fn describe(&self, id: CacheId) -> String {
        format!(
            "cache {id}: {} lines, {} sets x {} ways, {}-byte blocks, tag/index/offset = {}/{}/{}",
            self.line_count,
            self.sets(),
            self.ways(),
            self.block_size,
            self.tag_bits(),
            self.index_bits,
            self.offset_bits
        )
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn log2(value: u32) -> u8 {
    value.trailing_zeros() as u8
}
