//! Bit-addressable backing store for packed cache lines.
//!
//! Bits are numbered MSB-first: bit `n` is bit `7 - n % 8` of byte `n / 8`.
//! Byte runs may start at any bit; unaligned runs are assembled by shifting
//! each pair of overlapping raw bytes and OR-ing the fragments together.

/// Fixed-length buffer addressed in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer {
    bytes: Box<[u8]>,
    len_bits: usize,
}

impl BitBuffer {
    /// Allocates a zeroed buffer holding at least `len_bits` bits.
    #[must_use]
    pub fn new(len_bits: usize) -> Self {
        Self {
            bytes: vec![0; len_bits.div_ceil(8)].into_boxed_slice(),
            len_bits,
        }
    }

    /// Number of addressable bits.
    #[must_use]
    pub const fn len_bits(&self) -> usize {
        self.len_bits
    }

    /// Raw backing bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Reads a single bit.
    #[must_use]
    pub fn bit(&self, bit: usize) -> bool {
        self.bytes[bit / 8] & (0x80 >> (bit % 8)) != 0
    }

    /// Writes a single bit.
    pub fn set_bit(&mut self, bit: usize, value: bool) {
        let mask = 0x80 >> (bit % 8);
        if value {
            self.bytes[bit / 8] |= mask;
        } else {
            self.bytes[bit / 8] &= !mask;
        }
    }

    /// Fills `out` with the `out.len()` bytes starting at bit `start`.
    pub fn read_bytes(&self, start: usize, out: &mut [u8]) {
        debug_assert!(start + out.len() * 8 <= self.len_bits);
        let byte = start / 8;
        let shift = start % 8;
        if shift == 0 {
            out.copy_from_slice(&self.bytes[byte..byte + out.len()]);
            return;
        }
        for (i, slot) in out.iter_mut().enumerate() {
            let high = self.bytes[byte + i] << shift;
            let low = self.bytes[byte + i + 1] >> (8 - shift);
            *slot = high | low;
        }
    }

    /// Writes `data` starting at bit `start`, leaving neighbouring bits intact.
    pub fn write_bytes(&mut self, start: usize, data: &[u8]) {
        debug_assert!(start + data.len() * 8 <= self.len_bits);
        let byte = start / 8;
        let shift = start % 8;
        if shift == 0 {
            self.bytes[byte..byte + data.len()].copy_from_slice(data);
            return;
        }
        let keep_high = !(0xFF_u8 >> shift);
        let keep_low = 0xFF_u8 >> shift;
        for (i, value) in data.iter().enumerate() {
            let head = &mut self.bytes[byte + i];
            *head = (*head & keep_high) | (value >> shift);
            let tail = &mut self.bytes[byte + i + 1];
            *tail = (*tail & keep_low) | (value << (8 - shift));
        }
    }

    /// Reads a `width`-bit unsigned field (MSB first) starting at bit `start`.
    #[must_use]
    pub fn read_field(&self, start: usize, width: u8) -> u64 {
        debug_assert!(width <= 64);
        (0..usize::from(width)).fold(0, |acc, i| (acc << 1) | u64::from(self.bit(start + i)))
    }

    /// Writes the low `width` bits of `value` (MSB first) starting at bit `start`.
    pub fn write_field(&mut self, start: usize, width: u8, value: u64) {
        debug_assert!(width <= 64);
        let width = usize::from(width);
        for i in 0..width {
            let bit = (value >> (width - 1 - i)) & 1 == 1;
            self.set_bit(start + i, bit);
        }
    }
}
