//! Strongly-typed program keys.

use std::fmt;

/// 128-bit hash of the active attribute set a program was generated for.
///
/// Built by [`ShaderGenerator`](super::generator::ShaderGenerator) from the
/// (unit, type id, content hash) triples of every active attribute in
/// ascending type order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramFingerprint(pub(crate) u128);

impl ProgramFingerprint {
    #[inline]
    #[must_use]
    pub fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for ProgramFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Index of a program's shadow values in the
/// [`UniformValueCache`](crate::uniform::UniformValueCache).
///
/// Assigned monotonically the first time a program's uniforms are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformCacheSlot(pub(crate) u32);

impl UniformCacheSlot {
    /// Raw index into the cache storage array.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
