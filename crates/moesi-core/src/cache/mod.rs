//! Set-associative storage engine for a single cache.
//!
//! Line metadata (valid, dirty, shared marking, coherence state, LRU rank)
//! lives beside the packed store; the tag and data of every line are packed
//! back to back in one [`BitBuffer`].

mod line;

use line::Line;

use crate::{BitBuffer, CacheGeometry, HitStats, MainMemory, MoesiState};

/// Outcome of looking an address up in one cache.
///
/// On a hit `line` holds the block; on a miss it is the victim that a fill
/// would overwrite. `prior_lru` is the line's rank at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvictionCandidate {
    /// Line index within the cache.
    pub line: u32,
    /// Whether the line already holds the addressed block.
    pub is_hit: bool,
    /// LRU rank of `line` when it was located.
    pub prior_lru: u32,
}

/// One cache: geometry, per-line metadata, packed tag/data store, and
/// hit-rate counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cache {
    geometry: CacheGeometry,
    lines: Vec<Line>,
    store: BitBuffer,
    stats: HitStats,
}

impl Cache {
    /// Creates a cache whose lines are all Invalid, ranked by way position.
    #[must_use]
    pub fn new(geometry: CacheGeometry) -> Self {
        let ways = geometry.ways();
        let lines = (0..geometry.line_count())
            .map(|line| Line::empty(line % ways))
            .collect();
        let store = BitBuffer::new(geometry.bits_per_line() * geometry.line_count() as usize);
        Self {
            geometry,
            lines,
            store,
            stats: HitStats::default(),
        }
    }

    /// Shape of this cache.
    #[must_use]
    pub const fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    /// Access and hit counters.
    #[must_use]
    pub const fn stats(&self) -> HitStats {
        self.stats
    }

    /// Mutable access to the counters for the engine's call sites.
    #[allow(clippy::missing_const_for_fn)]
    pub fn stats_mut(&mut self) -> &mut HitStats {
        &mut self.stats
    }

    /// Finds the line holding `address`, or the victim a fill would replace.
    ///
    /// The victim is the line with the smallest LRU rank in the address's
    /// set. Invalid lines always rank below valid ones, so they are reused
    /// first.
    #[must_use]
    pub fn locate(&self, address: u32) -> EvictionCandidate {
        let tag = self.geometry.tag(address);
        let lines = self.geometry.set_lines(self.geometry.index(address));
        let first = lines.start;
        let mut victim = EvictionCandidate {
            line: first,
            is_hit: false,
            prior_lru: self.meta(first).lru,
        };
        for line in lines {
            let meta = self.meta(line);
            if meta.valid && self.tag_of(line) == tag {
                return EvictionCandidate {
                    line,
                    is_hit: true,
                    prior_lru: meta.lru,
                };
            }
            if meta.lru < victim.prior_lru {
                victim.line = line;
                victim.prior_lru = meta.lru;
            }
        }
        victim
    }

    /// Copies `size` bytes of `line`'s block starting at byte `offset`.
    #[must_use]
    pub fn read(&self, line: u32, offset: u32, size: u32) -> Vec<u8> {
        let mut out = vec![0; size as usize];
        self.store.read_bytes(self.data_bit(line, offset), &mut out);
        out
    }

    /// Copies the whole block held by `line`.
    #[must_use]
    pub fn read_block(&self, line: u32) -> Vec<u8> {
        self.read(line, 0, self.geometry.block_size())
    }

    /// Stores `data` into `line` at byte `offset` as a local write.
    ///
    /// Marks the line valid and dirty, clears its shared marking, and makes
    /// it the most recently used line of its set.
    pub fn write(&mut self, line: u32, offset: u32, data: &[u8]) {
        self.store.write_bytes(self.data_bit(line, offset), data);
        let meta = self.meta_mut(line);
        meta.valid = true;
        meta.dirty = true;
        meta.shared = false;
        self.promote(line);
    }

    /// Fills `line` with a whole block for `address` without touching memory.
    ///
    /// The line becomes valid and clean, takes the address's tag, and becomes
    /// the most recently used line of its set. Its coherence state is left
    /// for the caller to decide.
    pub fn install(&mut self, line: u32, address: u32, block: &[u8]) {
        debug_assert_eq!(block.len(), self.geometry.block_size() as usize);
        self.set_tag(line, self.geometry.tag(address));
        self.store.write_bytes(self.data_bit(line, 0), block);
        let meta = self.meta_mut(line);
        meta.valid = true;
        meta.dirty = false;
        self.promote(line);
    }

    /// Writes `line` back to memory when it is valid and dirty.
    ///
    /// Leaves the line's valid and dirty bits alone; returns whether a
    /// write-back happened.
    pub fn evict(&self, line: u32, memory: &mut MainMemory) -> bool {
        let meta = self.meta(line);
        if !(meta.valid && meta.dirty) {
            return false;
        }
        memory.write_block(self.line_address(line), &self.read_block(line));
        true
    }

    /// Drops `line`'s contents: Invalid, clean, and least recently used.
    pub fn invalidate(&mut self, line: u32) {
        self.set_state(line, MoesiState::Invalid);
        self.demote_lru(line);
    }

    /// Coherence state of `line`.
    #[must_use]
    pub fn state(&self, line: u32) -> MoesiState {
        self.meta(line).state
    }

    /// Sets `line`'s coherence state.
    ///
    /// `Invalid` also clears the valid and dirty bits. `Shared` and `Owned`
    /// set the shared marking; other states clear it.
    pub fn set_state(&mut self, line: u32, state: MoesiState) {
        let meta = self.meta_mut(line);
        meta.state = state;
        meta.shared = matches!(state, MoesiState::Shared | MoesiState::Owned);
        if state == MoesiState::Invalid {
            meta.valid = false;
            meta.dirty = false;
        }
    }

    /// State of the block containing `address`, `Invalid` when not resident.
    #[must_use]
    pub fn state_of(&self, address: u32) -> MoesiState {
        let found = self.locate(address);
        if found.is_hit {
            self.state(found.line)
        } else {
            MoesiState::Invalid
        }
    }

    /// Sets the state of the block containing `address` if it is resident;
    /// returns whether it was.
    pub fn update_state(&mut self, address: u32, state: MoesiState) -> bool {
        let found = self.locate(address);
        if found.is_hit {
            self.set_state(found.line, state);
        }
        found.is_hit
    }

    /// Whether `line` holds a block.
    #[must_use]
    pub fn is_valid(&self, line: u32) -> bool {
        self.meta(line).valid
    }

    /// Whether `line` differs from memory.
    #[must_use]
    pub fn is_dirty(&self, line: u32) -> bool {
        self.meta(line).dirty
    }

    /// Whether `line` is marked as possibly held elsewhere.
    #[must_use]
    pub fn is_shared(&self, line: u32) -> bool {
        self.meta(line).shared
    }

    /// LRU rank of `line`; larger is more recent.
    #[must_use]
    pub fn lru(&self, line: u32) -> u32 {
        self.meta(line).lru
    }

    /// Overwrites `line`'s LRU rank without adjusting the rest of its set.
    pub fn set_lru(&mut self, line: u32, rank: u32) {
        self.meta_mut(line).lru = rank;
    }

    /// Makes `line` the most recently used line of its set, closing the gap
    /// left at its prior rank.
    pub fn promote(&mut self, line: u32) {
        let prior = self.lru(line);
        let top = self.geometry.ways() - 1;
        for other in self.geometry.set_lines(self.geometry.line_set(line)) {
            let meta = self.meta_mut(other);
            if meta.lru > prior {
                meta.lru -= 1;
            }
        }
        self.set_lru(line, top);
    }

    /// Makes `line` the least recently used line of its set, shifting the
    /// lines ranked below its prior rank up by one.
    pub fn demote_lru(&mut self, line: u32) {
        let prior = self.lru(line);
        for other in self.geometry.set_lines(self.geometry.line_set(line)) {
            let meta = self.meta_mut(other);
            if meta.lru < prior {
                meta.lru += 1;
            }
        }
        self.set_lru(line, 0);
    }

    /// LRU ranks of `set`, in line order.
    #[must_use]
    pub fn set_ranks(&self, set: u32) -> Vec<u32> {
        self.geometry
            .set_lines(set)
            .map(|line| self.lru(line))
            .collect()
    }

    /// Tag stored for `line`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn tag_of(&self, line: u32) -> u32 {
        self.store
            .read_field(self.line_bit(line), self.geometry.tag_bits()) as u32
    }

    /// Block address of whatever `line` holds, rebuilt from tag and set.
    #[must_use]
    pub fn line_address(&self, line: u32) -> u32 {
        self.geometry.line_address(self.tag_of(line), line, 0)
    }

    /// Valid lines as `(line, block address, state)`.
    pub fn resident_blocks(&self) -> impl Iterator<Item = (u32, u32, MoesiState)> + '_ {
        (0..self.geometry.line_count())
            .filter(|line| self.is_valid(*line))
            .map(|line| (line, self.line_address(line), self.state(line)))
    }

    fn set_tag(&mut self, line: u32, tag: u32) {
        let start = self.line_bit(line);
        self.store
            .write_field(start, self.geometry.tag_bits(), u64::from(tag));
    }

    fn line_bit(&self, line: u32) -> usize {
        line as usize * self.geometry.bits_per_line()
    }

    fn data_bit(&self, line: u32, offset: u32) -> usize {
        self.line_bit(line) + usize::from(self.geometry.tag_bits()) + offset as usize * 8
    }

    fn meta(&self, line: u32) -> &Line {
        &self.lines[line as usize]
    }

    fn meta_mut(&mut self, line: u32) -> &mut Line {
        &mut self.lines[line as usize]
    }
}
