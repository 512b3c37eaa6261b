//! Presence directory: which caches hold a copy of each block.

use std::collections::HashMap;

use crate::CacheId;

/// Maps block addresses to the caches holding them, in registration order.
///
/// Addresses are reduced to their block base on every call, so any byte of a
/// block names the whole block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snooper {
    block_size: u32,
    holders: HashMap<u32, Vec<CacheId>>,
}

impl Snooper {
    /// Creates an empty directory for `block_size`-byte blocks.
    #[must_use]
    pub fn new(block_size: u32) -> Self {
        Self {
            block_size,
            holders: HashMap::new(),
        }
    }

    const fn block(&self, address: u32) -> u32 {
        address & !(self.block_size - 1)
    }

    /// Registers `id` as a holder of the block. Registering twice is a no-op.
    pub fn add(&mut self, address: u32, id: CacheId) {
        let ids = self.holders.entry(self.block(address)).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Drops `id` from the block's holders; returns whether it was listed.
    pub fn remove(&mut self, address: u32, id: CacheId) -> bool {
        let block = self.block(address);
        let Some(ids) = self.holders.get_mut(&block) else {
            return false;
        };
        let Some(position) = ids.iter().position(|held| *held == id) else {
            return false;
        };
        ids.remove(position);
        if ids.is_empty() {
            self.holders.remove(&block);
        }
        true
    }

    /// Returns `true` when `id` is listed for the block.
    #[must_use]
    pub fn contains(&self, address: u32, id: CacheId) -> bool {
        self.holders(address).contains(&id)
    }

    /// Holders of the block in registration order.
    #[must_use]
    pub fn holders(&self, address: u32) -> &[CacheId] {
        self.holders
            .get(&self.block(address))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Earliest registered holder, if any.
    #[must_use]
    pub fn first_holder(&self, address: u32) -> Option<CacheId> {
        self.holders(address).first().copied()
    }

    /// The holder, only when exactly one cache is listed.
    #[must_use]
    pub fn sole_holder(&self, address: u32) -> Option<CacheId> {
        match self.holders(address) {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Every tracked `(block, holders)` pair, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &[CacheId])> + '_ {
        self.holders
            .iter()
            .map(|(block, ids)| (*block, ids.as_slice()))
    }

    /// Number of tracked blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Returns `true` when no block is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Snooper;
    use crate::CacheId;

    const A: CacheId = CacheId(0);
    const B: CacheId = CacheId(1);
    const C: CacheId = CacheId(2);

    #[test]
    fn any_byte_of_a_block_names_the_block() {
        let mut snooper = Snooper::new(8);
        snooper.add(0x13, A);
        assert!(snooper.contains(0x10, A));
        assert!(snooper.contains(0x17, A));
        assert!(!snooper.contains(0x18, A));
    }

    #[test]
    fn holders_keep_registration_order_without_duplicates() {
        let mut snooper = Snooper::new(4);
        snooper.add(0, B);
        snooper.add(0, A);
        snooper.add(0, B);
        assert_eq!(snooper.holders(0), &[B, A]);
        assert_eq!(snooper.first_holder(0), Some(B));
    }

    #[test]
    fn sole_holder_requires_exactly_one() {
        let mut snooper = Snooper::new(4);
        assert_eq!(snooper.sole_holder(0), None);
        snooper.add(0, C);
        assert_eq!(snooper.sole_holder(0), Some(C));
        snooper.add(0, A);
        assert_eq!(snooper.sole_holder(0), None);
    }

    #[test]
    fn removing_last_holder_forgets_the_block() {
        let mut snooper = Snooper::new(4);
        snooper.add(4, A);
        snooper.add(4, B);
        assert!(snooper.remove(4, A));
        assert!(!snooper.remove(4, A));
        assert_eq!(snooper.len(), 1);
        assert!(snooper.remove(5, B));
        assert!(snooper.is_empty());
        assert_eq!(snooper.first_holder(4), None);
    }
}
