use std::collections::BTreeMap;

use crate::{Cache, CacheId, CacheSystem, InvariantViolation, MoesiState};

impl CacheSystem {
    /// Checks the whole system against the coherence and bookkeeping
    /// invariants.
    ///
    /// For every block: at most one Modified or Exclusive holder, and an
    /// Owned holder only alongside Shared ones. The snooper lists exactly
    /// the caches that hold each block, and every set's LRU ranks are a
    /// permutation of `0..ways`.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found, scanning blocks in
    /// ascending address order.
    pub fn audit(&self) -> Result<(), InvariantViolation> {
        let mut blocks: BTreeMap<u32, Vec<(CacheId, MoesiState)>> = BTreeMap::new();
        for node in &self.nodes {
            for (_, block, state) in node.cache.resident_blocks() {
                blocks.entry(block).or_default().push((node.id, state));
            }
            audit_lru(node.id, &node.cache)?;
        }

        for (block, holders) in &blocks {
            audit_states(*block, holders)?;
            if let Some((id, _)) = holders
                .iter()
                .find(|(id, _)| !self.snooper.contains(*block, *id))
            {
                return Err(InvariantViolation::UntrackedLine { block: *block, id: *id });
            }
        }

        let mut listed: Vec<(u32, &[CacheId])> = self.snooper.entries().collect();
        listed.sort_unstable_by_key(|(block, _)| *block);
        for (block, ids) in listed {
            let resident = blocks.get(&block).map(Vec::as_slice).unwrap_or(&[]);
            if let Some(id) = ids
                .iter()
                .find(|id| !resident.iter().any(|(holder, _)| holder == *id))
            {
                return Err(InvariantViolation::StaleSnooperEntry { block, id: *id });
            }
        }
        Ok(())
    }
}

fn audit_lru(id: CacheId, cache: &Cache) -> Result<(), InvariantViolation> {
    for set in 0..cache.geometry().sets() {
        let mut ranks = cache.set_ranks(set);
        ranks.sort_unstable();
        if !ranks.iter().copied().eq(0..cache.geometry().ways()) {
            return Err(InvariantViolation::SparseLruRanks { id, set });
        }
    }
    Ok(())
}

fn audit_states(block: u32, holders: &[(CacheId, MoesiState)]) -> Result<(), InvariantViolation> {
    let mut exclusive = holders.iter().filter(|(_, state)| state.is_exclusive());
    if let (Some((first, _)), Some((second, _))) = (exclusive.next(), exclusive.next()) {
        return Err(InvariantViolation::MultipleExclusiveHolders {
            block,
            first: *first,
            second: *second,
        });
    }
    for (owner, _) in holders.iter().filter(|(_, state)| *state == MoesiState::Owned) {
        if let Some((other, state)) = holders
            .iter()
            .find(|(id, state)| id != owner && *state != MoesiState::Shared)
        {
            return Err(InvariantViolation::OwnedWithNonShared {
                block,
                owner: *owner,
                other: *other,
                state: *state,
            });
        }
    }
    Ok(())
}
