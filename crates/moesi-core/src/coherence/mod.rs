//! System-wide request handling for the MOESI snooping protocol.
//!
//! Every request is resolved against the destination cache first. Peers
//! are consulted only through the [`Snooper`](crate::Snooper), and main
//! memory is touched only for write-backs and system-wide misses.

mod audit;
mod read;
mod write;

use crate::{
    validate_block_span, validate_range, AccessFault, CacheId, CacheSystem, EvictionCandidate,
    MoesiState,
};

/// Which protocol is evicting a victim; the two differ in when a Shared
/// peer of the evicted block is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EvictionPath {
    Read,
    Write,
}

/// Destination of one request after routing and lookup.
#[derive(Debug, Clone, Copy)]
struct Request {
    handle: usize,
    id: CacheId,
    found: EvictionCandidate,
}

impl CacheSystem {
    /// Routes a request, validates its range, records telemetry, and looks
    /// the address up in the destination. Nothing is mutated on failure.
    fn begin(&mut self, address: u32, id: CacheId, size: u32) -> Result<Request, AccessFault> {
        let handle = self.handle(id)?;
        validate_range(&self.memory, address, size)?;
        validate_block_span(address, size, self.block_size)?;

        let cache = &mut self.nodes[handle].cache;
        cache.stats_mut().record_access();
        let found = cache.locate(address);
        if found.is_hit {
            cache.stats_mut().record_hit();
        }
        Ok(Request { handle, id, found })
    }

    /// Frees the destination's victim line before a fill.
    ///
    /// The old block is written back if dirty and dropped from the snooper.
    /// Other holders of the old block are flushed and invalidated too,
    /// except Shared holders the path chooses to keep.
    fn evict_for_miss(&mut self, request: &Request, path: EvictionPath) {
        let line = request.found.line;
        let cache = &mut self.nodes[request.handle].cache;
        if !cache.is_valid(line) {
            return;
        }
        let old = cache.line_address(line);
        self.snooper.remove(old, request.id);
        if cache.evict(line, &mut self.memory) {
            log::debug!("cache {}: wrote back block {old:#x} from line {line}", request.id);
        }
        cache.invalidate(line);
        log::debug!("cache {}: evicted block {old:#x} from line {line}", request.id);

        let peers = self.other_holders(old, request.id);
        for peer in peers {
            let Ok(handle) = self.handle(peer) else {
                continue;
            };
            let keep = self.nodes[handle].cache.state_of(old) == MoesiState::Shared
                && match path {
                    EvictionPath::Read => self.snooper.sole_holder(old).is_none(),
                    EvictionPath::Write => self.snooper.first_holder(old).is_some(),
                };
            if !keep {
                self.drop_holder(handle, old, true);
            }
        }
    }

    /// Invalidates the peer's copy of `address`, if resident, and drops its
    /// snooper entry. With `flush` a dirty copy is written back first.
    fn drop_holder(&mut self, handle: usize, address: u32, flush: bool) {
        let node = &mut self.nodes[handle];
        let found = node.cache.locate(address);
        if found.is_hit {
            if flush && node.cache.evict(found.line, &mut self.memory) {
                log::debug!("cache {}: flushed block {address:#x}", node.id);
            }
            node.cache.invalidate(found.line);
            log::debug!("cache {}: invalidated block {address:#x}", node.id);
        }
        self.snooper.remove(address, node.id);
    }

    /// Drops every holder of `address` other than `id`.
    fn drop_other_holders(&mut self, address: u32, id: CacheId, flush: bool) {
        for peer in self.other_holders(address, id) {
            if let Ok(handle) = self.handle(peer) {
                self.drop_holder(handle, address, flush);
            }
        }
    }

    /// Holders of `address` other than `id`, in snooper order.
    fn other_holders(&self, address: u32, id: CacheId) -> Vec<CacheId> {
        self.snooper
            .holders(address)
            .iter()
            .copied()
            .filter(|holder| *holder != id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::{CacheId, CacheSystem, MoesiState, SystemConfig};

    const A: CacheId = CacheId(0);
    const B: CacheId = CacheId(1);
    const C: CacheId = CacheId(2);

    /// Caches with one set of two lines and 4-byte blocks.
    fn system(caches: u8) -> CacheSystem {
        CacheSystem::new(&SystemConfig::uniform(caches, 2, 0)).expect("valid config")
    }

    #[test]
    fn failed_routing_or_range_leaves_no_trace() {
        let mut system = system(2);
        let before = system.clone();
        assert!(system.system_read(0, CacheId(9), 4).is_err());
        assert!(system.system_read(0xFFFE, A, 4).is_err());
        assert!(system.system_write(0x2, A, &[0; 4]).is_err());
        assert!(system.system_write(0, A, &[]).is_err());
        assert_eq!(system, before);
    }

    #[test]
    fn read_eviction_drops_a_sole_shared_peer() {
        let mut system = system(2);
        system.system_read(0x0, A, 4).expect("read");
        system.system_read(0x0, B, 4).expect("read");
        assert_eq!(
            system.holders(0x0),
            vec![(A, MoesiState::Shared), (B, MoesiState::Shared)]
        );

        // Two more blocks push 0x0 out of A's only set.
        system.system_read(0x10, A, 4).expect("read");
        system.system_read(0x20, A, 4).expect("read");
        assert!(system.holders(0x0).is_empty());
        assert!(system.snooper().holders(0x0).is_empty());
        assert_eq!(system.audit(), Ok(()));
    }

    #[test]
    fn read_eviction_keeps_shared_peers_when_several_remain() {
        let mut system = system(3);
        for id in [A, B, C] {
            system.system_read(0x0, id, 4).expect("read");
        }
        system.system_read(0x10, A, 4).expect("read");
        system.system_read(0x20, A, 4).expect("read");
        assert_eq!(
            system.holders(0x0),
            vec![(B, MoesiState::Shared), (C, MoesiState::Shared)]
        );
        assert_eq!(system.snooper().holders(0x0), &[B, C]);
        assert_eq!(system.audit(), Ok(()));
    }

    #[test]
    fn write_eviction_keeps_any_shared_peer() {
        let mut system = system(2);
        system.system_read(0x0, A, 4).expect("read");
        system.system_read(0x0, B, 4).expect("read");
        system.system_write(0x10, A, &[1; 4]).expect("write");
        system.system_write(0x20, A, &[2; 4]).expect("write");
        assert_eq!(system.holders(0x0), vec![(B, MoesiState::Shared)]);
        assert_eq!(system.audit(), Ok(()));
    }

    #[test]
    fn dirty_shared_peer_is_flushed_when_dropped() {
        let mut system = system(2);
        system.system_write(0x0, A, &[0xAB; 4]).expect("write");
        system.system_read(0x0, B, 4).expect("read");
        assert_eq!(system.memory().peek(0, 4), Some(&[0; 4][..]));

        // B's eviction of 0x0 on the read path drops A, the sole remaining
        // Shared holder, whose copy is still dirty.
        system.system_read(0x10, B, 4).expect("read");
        system.system_read(0x20, B, 4).expect("read");
        assert!(system.holders(0x0).is_empty());
        assert_eq!(system.memory().peek(0, 4), Some(&[0xAB; 4][..]));
    }
}
