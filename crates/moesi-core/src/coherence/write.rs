use super::{EvictionPath, Request};
use crate::{AccessFault, CacheId, CacheSystem, MoesiState};

impl CacheSystem {
    /// Writes `data` at `address` on behalf of processor `id`.
    ///
    /// The destination ends up the sole holder of the block, in Modified.
    /// On a miss the block is pulled from a Modified peer when one exists,
    /// otherwise filled from memory, before the new bytes are applied.
    ///
    /// # Errors
    ///
    /// Returns an [`AccessFault`] for an unknown `id`, empty or out-of-range
    /// `data`, or a write that crosses a block boundary. Faults are raised
    /// before any state changes.
    pub fn system_write(
        &mut self,
        address: u32,
        id: CacheId,
        data: &[u8],
    ) -> Result<(), AccessFault> {
        let size = u32::try_from(data.len()).unwrap_or(u32::MAX);
        let request = self.begin(address, id, size)?;
        let line = request.found.line;

        if request.found.is_hit {
            log::trace!("cache {id}: write hit {address:#x} in line {line}");
        } else {
            log::debug!("cache {id}: write miss {address:#x}, victim line {line}");
            self.evict_for_miss(&request, EvictionPath::Write);
            if !self.pull_modified(&request, address) {
                let block = self.memory.read_block(address);
                self.nodes[request.handle]
                    .cache
                    .install(line, address, &block);
                log::debug!("cache {id}: filled {address:#x} from memory");
            }
        }

        let cache = &mut self.nodes[request.handle].cache;
        let offset = cache.geometry().offset(address);
        cache.write(line, offset, data);
        cache.set_state(line, MoesiState::Modified);
        self.drop_other_holders(address, id, false);
        self.snooper.add(address, id);
        Ok(())
    }

    /// Scans the other holders of `address` before a write miss is applied.
    ///
    /// The first Modified holder's block is copied into the destination's
    /// victim line; every other holder is flushed, invalidated, and
    /// deregistered. Returns whether a block was pulled.
    fn pull_modified(&mut self, request: &Request, address: u32) -> bool {
        let mut pulled = false;
        for peer in self.other_holders(address, request.id) {
            let Ok(handle) = self.handle(peer) else {
                continue;
            };
            let holder = &self.nodes[handle].cache;
            let found = holder.locate(address);
            if !pulled && found.is_hit && holder.state(found.line) == MoesiState::Modified {
                let block = holder.read_block(found.line);
                self.nodes[request.handle]
                    .cache
                    .install(request.found.line, address, &block);
                log::debug!(
                    "cache {}: pulled modified block {address:#x} from cache {peer}",
                    request.id
                );
                pulled = true;
            } else {
                self.drop_holder(handle, address, true);
            }
        }
        pulled
    }
}
