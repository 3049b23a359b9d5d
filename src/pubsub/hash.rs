use std::hash::{BuildHasherDefault, Hasher};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1 (32 bit) over the UTF-8 bytes of a topic name.
///
/// Multiply first, then fold the byte in; the same values as Go's
/// `hash/fnv.New32`.
///
/// Deterministic and unseeded: the same topic hashes to the same value in
/// every process, e.g. `fnv1_32("abc") == 1134309195`.
#[inline]
pub fn fnv1_32(topic: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(topic.as_bytes());
    hasher.state
}

/// Streaming FNV-1/32 state, usable as the hasher of a `HashMap`.
#[derive(Debug, Clone, Copy)]
pub struct FnvHasher {
    state: u32,
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn write(
        &mut self,
        bytes: &[u8],
    ) {
        for &byte in bytes {
            self.state = self.state.wrapping_mul(FNV_PRIME);
            self.state ^= u32::from(byte);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// `BuildHasher` for the topic registry.
pub type FnvBuildHasher = BuildHasherDefault<FnvHasher>;
