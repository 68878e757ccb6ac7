//! Occupied-position cache: a per-chunk set of occupied local cells with a
//! short TTL, protected for concurrent use (spec §4.3).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use strata_primitives::{Clock, ChunkCoord};

const CACHE_TTL: Duration = Duration::from_secs(30);

struct Entry {
    positions: std::collections::HashSet<i32>,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Shared, lock-protected map of `(chunkX, chunkZ) -> occupied cell keys`.
/// Entries are invalidated by TTL only, never by external mutation (spec §3
/// "Ownership").
#[derive(Clone)]
pub struct OccupiedPositionCache {
    inner: Arc<RwLock<HashMap<ChunkCoord, Entry>>>,
}

impl OccupiedPositionCache {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Returns the live, mutable position set for `coord`, loading it via
    /// `loader` on miss or expiry. The Generator then mutates this same set
    /// in place as it creates nodes within one chunk pass, so later
    /// occupancy checks in the same pass see its own insertions (spec §4.3).
    pub fn load_or_refresh<F>(
        &self,
        coord: ChunkCoord,
        clock: &dyn Clock,
        loader: F,
    ) -> Result<(), strata_primitives::StorageError>
    where
        F: FnOnce() -> Result<std::collections::HashSet<i32>, strata_primitives::StorageError>,
    {
        let now = clock.now();
        {
            let guard = self.inner.read();
            if let Some(entry) = guard.get(&coord) {
                if entry.expires_at > now {
                    return Ok(());
                }
            }
        }
        let positions = loader()?;
        let mut guard = self.inner.write();
        guard.insert(coord, Entry { positions, expires_at: now + chrono::Duration::from_std(CACHE_TTL).unwrap() });
        Ok(())
    }

    pub fn is_occupied(&self, coord: ChunkCoord, key: i32) -> bool {
        let guard = self.inner.read();
        guard.get(&coord).map(|e| e.positions.contains(&key)).unwrap_or(false)
    }

    pub fn mark_occupied(&self, coord: ChunkCoord, key: i32, clock: &dyn Clock) {
        let mut guard = self.inner.write();
        guard.entry(coord).or_insert_with(|| Entry {
            positions: std::collections::HashSet::new(),
            expires_at: clock.now() + chrono::Duration::from_std(CACHE_TTL).unwrap(),
        }).positions.insert(key);
    }
}

impl Default for OccupiedPositionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_primitives::{FakeClock, LocalPos};

    #[test]
    fn refresh_only_happens_once_within_ttl() {
        let cache = OccupiedPositionCache::new();
        let clock = FakeClock::new(chrono::Utc::now());
        let coord = ChunkCoord::new(0, 0);
        let loads = std::cell::Cell::new(0);

        cache.load_or_refresh(coord, &clock, || {
            loads.set(loads.get() + 1);
            Ok(std::collections::HashSet::from([LocalPos::new(1, 1).cache_key()]))
        }).unwrap();
        cache.load_or_refresh(coord, &clock, || {
            loads.set(loads.get() + 1);
            Ok(std::collections::HashSet::new())
        }).unwrap();

        assert_eq!(loads.get(), 1);
        assert!(cache.is_occupied(coord, LocalPos::new(1, 1).cache_key()));
    }

    #[test]
    fn entry_expires_after_ttl_elapses() {
        let cache = OccupiedPositionCache::new();
        let clock = FakeClock::new(chrono::Utc::now());
        let coord = ChunkCoord::new(2, 2);

        cache.load_or_refresh(coord, &clock, || Ok(std::collections::HashSet::new())).unwrap();
        clock.advance(chrono::Duration::seconds(31));
        let loads = std::cell::Cell::new(0);
        cache.load_or_refresh(coord, &clock, || {
            loads.set(loads.get() + 1);
            Ok(std::collections::HashSet::new())
        }).unwrap();

        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn mutations_within_a_pass_are_visible_immediately() {
        let cache = OccupiedPositionCache::new();
        let clock = FakeClock::new(chrono::Utc::now());
        let coord = ChunkCoord::new(1, 1);
        let key = LocalPos::new(5, 5).cache_key();
        assert!(!cache.is_occupied(coord, key));
        cache.mark_occupied(coord, key, &clock);
        assert!(cache.is_occupied(coord, key));
    }
}
