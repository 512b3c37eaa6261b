//! Coherence state and processor identity primitives.

/// MOESI line-state machine.
pub mod moesi;

pub use moesi::MoesiState;

use std::fmt;

/// Processor identifier that selects a cache within a [`crate::CacheSystem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CacheId(pub u8);

impl fmt::Display for CacheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u8> for CacheId {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}
