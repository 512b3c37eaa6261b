use super::{EvictionPath, Request};
use crate::{AccessFault, CacheId, CacheSystem, MoesiState};

impl CacheSystem {
    /// Reads `size` bytes at `address` on behalf of processor `id`.
    ///
    /// A hit returns the destination's copy without any state change. A
    /// miss evicts the victim, then fills the line from the first peer that
    /// holds the block, or from memory in Exclusive when no peer does.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessFault`] for an unknown `id`, an empty or
    /// out-of-range access, or one that crosses a block boundary. Faults are
    /// raised before any state changes.
    pub fn system_read(
        &mut self,
        address: u32,
        id: CacheId,
        size: u32,
    ) -> Result<Vec<u8>, AccessFault> {
        let request = self.begin(address, id, size)?;
        let line = request.found.line;
        let offset = self.nodes[request.handle].cache.geometry().offset(address);

        if request.found.is_hit {
            let cache = &mut self.nodes[request.handle].cache;
            cache.promote(line);
            log::trace!("cache {id}: read hit {address:#x} in line {line}");
            return Ok(cache.read(line, offset, size));
        }

        log::debug!("cache {id}: read miss {address:#x}, victim line {line}");
        self.evict_for_miss(&request, EvictionPath::Read);
        let supplied = self.supply_from_peer(&request, address);
        if !supplied {
            let block = self.memory.read_block(address);
            let cache = &mut self.nodes[request.handle].cache;
            cache.install(line, address, &block);
            cache.set_state(line, MoesiState::Exclusive);
            log::debug!("cache {id}: filled {address:#x} from memory");
        }
        self.snooper.add(address, id);

        if supplied {
            let cache = &self.nodes[request.handle].cache;
            let state = if self.snooper.sole_holder(address) == Some(id) {
                MoesiState::Exclusive
            } else if cache.state(line) == MoesiState::Owned {
                MoesiState::Owned
            } else {
                MoesiState::Shared
            };
            self.nodes[request.handle].cache.set_state(line, state);
            self.broadcast_state(address, id, state);
        }

        Ok(self.nodes[request.handle].cache.read(line, offset, size))
    }

    /// Copies the block from the first listed peer that still holds it into
    /// the destination's victim line. Listed peers that no longer hold the
    /// block are dropped from the snooper.
    fn supply_from_peer(&mut self, request: &Request, address: u32) -> bool {
        for peer in self.other_holders(address, request.id) {
            let Ok(handle) = self.handle(peer) else {
                continue;
            };
            let supplier = &self.nodes[handle].cache;
            let found = supplier.locate(address);
            if found.is_hit {
                let block = supplier.read_block(found.line);
                self.nodes[request.handle]
                    .cache
                    .install(request.found.line, address, &block);
                log::debug!(
                    "cache {}: block {address:#x} supplied by cache {peer}",
                    request.id
                );
                return true;
            }
            log::warn!("snooper lists cache {peer} for {address:#x} but it does not hold the block");
            self.snooper.remove(address, peer);
        }
        false
    }

    /// Sets `state` on every holder of `address` other than `id`.
    fn broadcast_state(&mut self, address: u32, id: CacheId, state: MoesiState) {
        for peer in self.other_holders(address, id) {
            if let Ok(handle) = self.handle(peer) {
                self.nodes[handle].cache.update_state(address, state);
            }
        }
    }
}
