//! Identifier newtypes. All identifiers are monotonic 64-bit integers issued
//! by the store (spec §3).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                Self(v)
            }
        }

        impl From<$name> for i64 {
            fn from(v: $name) -> Self {
                v.0
            }
        }
    };
}

id_type!(PlayerId);
id_type!(NodeId);
id_type!(TemplateId);
id_type!(HarvestLogId);

/// Chunk coordinates. Signed so the world can extend in all four directions
/// from the origin chunk (spec §3: "All coordinates are signed 64-bit
/// integers").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i64,
    pub z: i64,
}

impl ChunkCoord {
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Size of a chunk edge in local cells. Fixed per spec §3.
pub const CHUNK_SIZE: i32 = 16;

/// A position local to a chunk, always in `[0, CHUNK_SIZE)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: i32,
    pub z: i32,
}

impl LocalPos {
    pub fn new(x: i32, z: i32) -> Self {
        debug_assert!((0..CHUNK_SIZE).contains(&x));
        debug_assert!((0..CHUNK_SIZE).contains(&z));
        Self { x, z }
    }

    /// Packs the position into the `(localX<<8)|localZ` cache key described
    /// in spec §4.3. Headroom beyond the 4 bits actually needed for a 16-wide
    /// chunk is intentional per the spec's own wording.
    pub fn cache_key(&self) -> i32 {
        (self.x << 8) | self.z
    }

    pub fn from_cache_key(key: i32) -> Self {
        Self { x: (key >> 8) & 0xff, z: key & 0xff }
    }

    pub fn clamp_to_chunk(x: f64, z: f64) -> Self {
        let cx = x.round().clamp(0.0, (CHUNK_SIZE - 1) as f64) as i32;
        let cz = z.round().clamp(0.0, (CHUNK_SIZE - 1) as f64) as i32;
        Self { x: cx, z: cz }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_round_trips() {
        for x in 0..CHUNK_SIZE {
            for z in 0..CHUNK_SIZE {
                let pos = LocalPos::new(x, z);
                let key = pos.cache_key();
                assert_eq!(LocalPos::from_cache_key(key), pos);
            }
        }
    }

    #[test]
    fn clamp_to_chunk_handles_corner_overshoot() {
        let pos = LocalPos::clamp_to_chunk(-3.0, 20.0);
        assert_eq!(pos, LocalPos::new(0, 15));
    }
}
