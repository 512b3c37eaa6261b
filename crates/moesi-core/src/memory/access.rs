//! Range, width, and alignment policy for sized accesses.

use crate::{AccessFault, MainMemory};

/// Natural access widths supported by the sized entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessWidth {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    HalfWord,
    /// 4 bytes.
    Word,
    /// 8 bytes.
    DoubleWord,
}

impl AccessWidth {
    /// Width in bytes.
    #[must_use]
    pub const fn bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::HalfWord => 2,
            Self::Word => 4,
            Self::DoubleWord => 8,
        }
    }

    /// The width an access splits into when blocks are too small for it.
    #[must_use]
    pub const fn half(self) -> Option<Self> {
        match self {
            Self::Byte => None,
            Self::HalfWord => Some(Self::Byte),
            Self::Word => Some(Self::HalfWord),
            Self::DoubleWord => Some(Self::Word),
        }
    }

    /// Parses the single-letter trace mnemonic (`b`, `h`, `w`, `d`).
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'b' | 'B' => Some(Self::Byte),
            'h' | 'H' => Some(Self::HalfWord),
            'w' | 'W' => Some(Self::Word),
            'd' | 'D' => Some(Self::DoubleWord),
            _ => None,
        }
    }
}

/// Validates that `address..address + size` lies inside main memory.
///
/// # Errors
///
/// Returns [`AccessFault::InvalidAddress`] for empty or out-of-range accesses.
pub fn validate_range(memory: &MainMemory, address: u32, size: u32) -> Result<(), AccessFault> {
    if size != 0 && memory.contains_range(address, size) {
        Ok(())
    } else {
        Err(AccessFault::InvalidAddress { address, size })
    }
}

/// Validates natural alignment: `address % width == 0`.
///
/// # Errors
///
/// Returns [`AccessFault::Misaligned`] when `address` is not a multiple of
/// the width.
pub const fn validate_alignment(address: u32, width: AccessWidth) -> Result<(), AccessFault> {
    if address % width.bytes() == 0 {
        Ok(())
    } else {
        Err(AccessFault::Misaligned {
            address,
            width: width.bytes(),
        })
    }
}

/// Validates that `size` bytes at `address` stay within one block.
///
/// # Errors
///
/// Returns [`AccessFault::Misaligned`] when the access straddles a block
/// boundary.
pub const fn validate_block_span(address: u32, size: u32, block_size: u32) -> Result<(), AccessFault> {
    if (address & (block_size - 1)) as u64 + size as u64 <= block_size as u64 {
        Ok(())
    } else {
        Err(AccessFault::Misaligned {
            address,
            width: size,
        })
    }
}
