/// Coherence state of one cache line.
///
/// `Invalid` is the reset state of every line. The remaining states are only
/// reached through the coherence engine's read and write paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MoesiState {
    /// Dirty and the only copy in the system.
    Modified,
    /// Up to date and responsible for the block; peers may hold `Shared`.
    Owned,
    /// Clean and the only copy in the system.
    Exclusive,
    /// Clean, possibly one of several copies.
    Shared,
    /// Holds no usable data.
    #[default]
    Invalid,
}

impl MoesiState {
    /// Every state, in protocol-name order.
    pub const ALL: [Self; 5] = [
        Self::Modified,
        Self::Owned,
        Self::Exclusive,
        Self::Shared,
        Self::Invalid,
    ];

    /// Returns `true` for states that forbid any other valid copy.
    #[must_use]
    pub const fn is_exclusive(self) -> bool {
        matches!(self, Self::Modified | Self::Exclusive)
    }

    /// Returns `true` for every state except `Invalid`.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Single-letter protocol mnemonic (`M`, `O`, `E`, `S`, `I`).
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Owned => 'O',
            Self::Exclusive => 'E',
            Self::Shared => 'S',
            Self::Invalid => 'I',
        }
    }
}
