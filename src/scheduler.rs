//! Pending-load queue and the retarget window logic around a moving target.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashMap;
use strata_geom::Vec3;
use strata_voxel::{ChunkKey, ChunkSize};

/// Min-heap entry; stale entries are skipped on pop against the live map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct HeapEntry {
    priority: i64,
    key: ChunkKey,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the nearest chunk first. Key order only
        // breaks exact ties deterministically; it carries no load-order
        // meaning.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| (other.key.x, other.key.y, other.key.z).cmp(&(self.key.x, self.key.y, self.key.z)))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Priority queue of chunks waiting to load, at most one live entry per key.
/// Priority updates push a fresh heap entry and rely on lazy deletion: a
/// popped entry counts only when it matches the key's current priority.
#[derive(Default)]
pub struct PendingQueue {
    heap: BinaryHeap<HeapEntry>,
    live: HashMap<ChunkKey, i64>,
}

impl PendingQueue {
    #[inline]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    #[inline]
    pub fn contains(&self, key: ChunkKey) -> bool {
        self.live.contains_key(&key)
    }

    #[inline]
    pub fn priority_of(&self, key: ChunkKey) -> Option<i64> {
        self.live.get(&key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.live.keys().copied()
    }

    /// Inserts or reprioritizes a key.
    pub fn upsert(&mut self, key: ChunkKey, priority: i64) {
        if self.live.insert(key, priority) == Some(priority) {
            return;
        }
        self.heap.push(HeapEntry { priority, key });
    }

    pub fn remove(&mut self, key: ChunkKey) {
        self.live.remove(&key);
    }

    /// Pops the nearest live entry, discarding stale heap residue.
    pub fn pop(&mut self) -> Option<(ChunkKey, i64)> {
        while let Some(entry) = self.heap.pop() {
            if self.live.get(&entry.key) == Some(&entry.priority) {
                self.live.remove(&entry.key);
                return Some((entry.key, entry.priority));
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}

/// Decides which chunks should be loading around the target. Owns only the
/// pending queue; the loaded-chunk map stays with the world, which queries
/// the scheduler each tick.
pub struct ChunkScheduler {
    size: ChunkSize,
    radius: [i32; 3],
    pending: PendingQueue,
    last_target: Option<ChunkKey>,
}

impl ChunkScheduler {
    pub fn new(size: ChunkSize, radius: [i32; 3]) -> Self {
        Self {
            size,
            radius,
            pending: PendingQueue::default(),
            last_target: None,
        }
    }

    #[inline]
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    #[inline]
    pub fn target_chunk(&self) -> Option<ChunkKey> {
        self.last_target
    }

    /// True when `key` lies inside the load window around `center`, extended
    /// by `margin` chunks on every axis.
    #[inline]
    pub fn in_window(&self, center: ChunkKey, key: ChunkKey, margin: i32) -> bool {
        (key.x - center.x).abs() <= self.radius[0] + margin
            && (key.y - center.y).abs() <= self.radius[1] + margin
            && (key.z - center.z).abs() <= self.radius[2] + margin
    }

    /// Chunk under a world position, by floor division per axis.
    #[inline]
    pub fn chunk_of(&self, pos: Vec3) -> ChunkKey {
        ChunkKey::containing(
            pos.x.floor() as i32,
            pos.y.floor() as i32,
            pos.z.floor() as i32,
            self.size,
        )
    }

    /// Recomputes the pending set for a new target position. A no-op unless
    /// the target crossed into a different chunk (or this is the first call).
    /// Returns true when the window was re-evaluated.
    pub fn retarget(&mut self, pos: Vec3, is_loaded: impl Fn(ChunkKey) -> bool) -> bool {
        let center = self.chunk_of(pos);
        if self.last_target == Some(center) {
            return false;
        }
        self.last_target = Some(center);

        // Drop pending entries that fell out of the window, reprioritize the
        // rest by distance to the new center.
        let stale: Vec<ChunkKey> = self
            .pending
            .keys()
            .filter(|&k| !self.in_window(center, k, 0))
            .collect();
        for key in stale {
            self.pending.remove(key);
        }
        let keep: Vec<ChunkKey> = self.pending.keys().collect();
        for key in keep {
            self.pending.upsert(key, key.distance_sq(center));
        }

        // Enqueue every window chunk that is neither loaded nor pending.
        for dy in -self.radius[1]..=self.radius[1] {
            for dz in -self.radius[2]..=self.radius[2] {
                for dx in -self.radius[0]..=self.radius[0] {
                    let key = center.offset(dx, dy, dz);
                    if is_loaded(key) || self.pending.contains(key) {
                        continue;
                    }
                    self.pending.upsert(key, key.distance_sq(center));
                }
            }
        }
        true
    }

    /// Pops up to `budget` nearest pending chunks. Keys that loaded in the
    /// meantime are skipped without consuming budget.
    pub fn process_pending(
        &mut self,
        budget: usize,
        is_loaded: impl Fn(ChunkKey) -> bool,
    ) -> Vec<ChunkKey> {
        let mut out = Vec::with_capacity(budget);
        while out.len() < budget {
            match self.pending.pop() {
                Some((key, _)) if is_loaded(key) => continue,
                Some((key, _)) => out.push(key),
                None => break,
            }
        }
        out
    }

    /// Loaded keys that drifted past the window plus the eviction margin.
    pub fn evictable<'a>(
        &'a self,
        margin: i32,
        loaded: impl Iterator<Item = ChunkKey> + 'a,
    ) -> impl Iterator<Item = ChunkKey> + 'a {
        let center = self.last_target;
        loaded.filter(move |&k| match center {
            Some(c) => !self.in_window(c, k, margin),
            None => false,
        })
    }
}
