//! Shader property identifiers
//!
//! Global shader properties and temporary render targets are addressed by a
//! 64-bit FNV-1a hash of their name. Hashing is `const`, so the well-known
//! properties used by the pipeline are plain constants.

use core::fmt;

/// Identifier for a shader property or named temporary target
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u64);

impl ShaderId {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Hash a property name into an id
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Id of `name` followed by a decimal index (`_BloomPyramid3`)
    pub fn indexed(name: &str, index: usize) -> Self {
        Self::from_name(&format!("{}{}", name, index))
    }

    /// Raw hash value
    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ShaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShaderId({:#018x})", self.0)
    }
}
