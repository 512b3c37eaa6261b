//! Naturally aligned, big-endian entry points over the coherence engine.
//!
//! Each access is checked for a known cache, an in-range address, and
//! natural alignment before anything is touched. An access wider than the
//! system block size is split into two half-width accesses, recursively,
//! so every engine call stays inside one block.

use crate::{validate_alignment, validate_range, AccessFault, AccessWidth, CacheId, CacheSystem};

impl CacheSystem {
    /// Reads a value of `width` at `address` through cache `id`.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessFault`] for an unknown `id`, an address range
    /// outside memory, or an address that is not a multiple of the width.
    pub fn read_sized(
        &mut self,
        address: u32,
        id: CacheId,
        width: AccessWidth,
    ) -> Result<u64, AccessFault> {
        self.check_sized(address, id, width)?;
        self.read_split(address, id, width)
    }

    /// Writes the low `width` bytes of `value` at `address` through cache
    /// `id`.
    ///
    /// # Errors
    ///
    /// Same conditions as [`CacheSystem::read_sized`]; nothing is written
    /// when a fault is returned.
    pub fn write_sized(
        &mut self,
        address: u32,
        id: CacheId,
        width: AccessWidth,
        value: u64,
    ) -> Result<(), AccessFault> {
        self.check_sized(address, id, width)?;
        self.write_split(address, id, width, value)
    }

    /// Reads one byte.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::read_sized`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_byte(&mut self, address: u32, id: CacheId) -> Result<u8, AccessFault> {
        Ok(self.read_sized(address, id, AccessWidth::Byte)? as u8)
    }

    /// Reads a big-endian half-word.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::read_sized`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_half_word(&mut self, address: u32, id: CacheId) -> Result<u16, AccessFault> {
        Ok(self.read_sized(address, id, AccessWidth::HalfWord)? as u16)
    }

    /// Reads a big-endian word.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::read_sized`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn read_word(&mut self, address: u32, id: CacheId) -> Result<u32, AccessFault> {
        Ok(self.read_sized(address, id, AccessWidth::Word)? as u32)
    }

    /// Reads a big-endian double-word.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::read_sized`].
    pub fn read_double_word(&mut self, address: u32, id: CacheId) -> Result<u64, AccessFault> {
        self.read_sized(address, id, AccessWidth::DoubleWord)
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::write_sized`].
    pub fn write_byte(&mut self, address: u32, id: CacheId, value: u8) -> Result<(), AccessFault> {
        self.write_sized(address, id, AccessWidth::Byte, u64::from(value))
    }

    /// Writes a big-endian half-word.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::write_sized`].
    pub fn write_half_word(
        &mut self,
        address: u32,
        id: CacheId,
        value: u16,
    ) -> Result<(), AccessFault> {
        self.write_sized(address, id, AccessWidth::HalfWord, u64::from(value))
    }

    /// Writes a big-endian word.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::write_sized`].
    pub fn write_word(&mut self, address: u32, id: CacheId, value: u32) -> Result<(), AccessFault> {
        self.write_sized(address, id, AccessWidth::Word, u64::from(value))
    }

    /// Writes a big-endian double-word.
    ///
    /// # Errors
    ///
    /// See [`CacheSystem::write_sized`].
    pub fn write_double_word(
        &mut self,
        address: u32,
        id: CacheId,
        value: u64,
    ) -> Result<(), AccessFault> {
        self.write_sized(address, id, AccessWidth::DoubleWord, value)
    }

    fn check_sized(&self, address: u32, id: CacheId, width: AccessWidth) -> Result<(), AccessFault> {
        self.handle(id)?;
        validate_range(&self.memory, address, width.bytes())?;
        validate_alignment(address, width)
    }

    fn read_split(&mut self, address: u32, id: CacheId, width: AccessWidth) -> Result<u64, AccessFault> {
        match width.half() {
            Some(half) if self.block_size < width.bytes() => {
                let high = self.read_split(address, id, half)?;
                let low = self.read_split(address + half.bytes(), id, half)?;
                Ok((high << (half.bytes() * 8)) | low)
            }
            _ => Ok(self
                .system_read(address, id, width.bytes())?
                .iter()
                .fold(0, |value, byte| (value << 8) | u64::from(*byte))),
        }
    }

    fn write_split(
        &mut self,
        address: u32,
        id: CacheId,
        width: AccessWidth,
        value: u64,
    ) -> Result<(), AccessFault> {
        match width.half() {
            Some(half) if self.block_size < width.bytes() => {
                let bits = half.bytes() * 8;
                self.write_split(address, id, half, value >> bits)?;
                self.write_split(address + half.bytes(), id, half, value & ((1 << bits) - 1))
            }
            _ => {
                let bytes = value.to_be_bytes();
                self.system_write(address, id, &bytes[8 - width.bytes() as usize..])
            }
        }
    }
}
