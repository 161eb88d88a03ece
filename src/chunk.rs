//! Per-chunk lifecycle: generation, committed voxels, dirty tracking.

use std::sync::Arc;

use strata_voxel::{ChunkKey, Voxel, VoxelField};

/// Lifecycle of a loaded chunk. A chunk leaves `Generating` exactly once,
/// when its first build result commits; edits and neighbor changes afterwards
/// only toggle the dirty flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkState {
    Generating,
    Ready,
}

/// One loaded chunk. The world is the sole writer of the field; workers only
/// ever see it through the shared `Arc`, so an unload can drop the chunk
/// while a build is still reading: the field is reclaimed when the last
/// reader finishes and the stale result is discarded by its job id.
pub struct Chunk {
    pub key: ChunkKey,
    pub state: ChunkState,
    /// Bumped on every edit; build results carrying an older revision are
    /// stale and dropped.
    pub rev: u64,
    /// Id of the most recently submitted build. Revisions restart at 1 when
    /// a chunk is recreated after eviction, so a dead pre-evict job can carry
    /// a matching revision; only its job id tells it apart.
    pub job_id: u64,
    /// At most one build in flight per chunk.
    pub building: bool,
    pub dirty: bool,
    /// Dirty via a local edit: rebuild on the urgent lane, outside the
    /// per-tick mesh budget.
    pub urgent: bool,
    field: Option<Arc<VoxelField>>,
}

impl Chunk {
    pub fn generating(key: ChunkKey) -> Self {
        Self {
            key,
            state: ChunkState::Generating,
            rev: 1,
            job_id: 0,
            building: true,
            dirty: false,
            urgent: false,
            field: None,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == ChunkState::Ready
    }

    /// Committed voxels; `None` until generation lands.
    #[inline]
    pub fn field(&self) -> Option<&Arc<VoxelField>> {
        self.field.as_ref()
    }

    pub fn commit_field(&mut self, field: Arc<VoxelField>) {
        self.field = Some(field);
        self.state = ChunkState::Ready;
    }

    #[inline]
    pub fn get_world(&self, wx: i32, wy: i32, wz: i32) -> Option<Voxel> {
        self.field.as_ref().and_then(|f| f.get_world(wx, wy, wz))
    }

    /// Applies an edit to the committed field, copy-on-write if a build is
    /// still reading the old revision. Fails when the chunk has no committed
    /// data yet or the cell is outside it.
    pub fn set_world(&mut self, wx: i32, wy: i32, wz: i32, v: Voxel) -> bool {
        let Some(field) = self.field.as_mut() else {
            return false;
        };
        if !field.contains_world(wx, wy, wz) {
            return false;
        }
        let (bx, by, bz) = field.key.origin(field.size);
        let ok = Arc::make_mut(field).set(wx - bx, wy - by, wz - bz, v);
        if ok {
            self.rev += 1;
            self.dirty = true;
            self.urgent = true;
        }
        ok
    }

    /// Marks the mesh stale because an adjacent chunk's contents changed.
    pub fn neighbor_changed(&mut self) {
        if self.is_ready() {
            self.dirty = true;
        }
    }
}
