use crate::MoesiState;

/// Unpacked per-line metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Line {
    pub(super) valid: bool,
    pub(super) dirty: bool,
    pub(super) shared: bool,
    pub(super) state: MoesiState,
    pub(super) lru: u32,
}

impl Line {
    pub(super) const fn empty(lru: u32) -> Self {
        Self {
            valid: false,
            dirty: false,
            shared: false,
            state: MoesiState::Invalid,
            lru,
        }
    }
}
